//! Registry implementations for viplink.
//!
//! [`InMemoryRegistry`] keeps links in process memory and is meant for tests
//! and single-process setups. [`MySqlRegistry`] stores them in a `links`
//! table whose DDL ships in `ddl/mysql/links.sql`.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRegistry;
pub use mysql::MySqlRegistry;
pub use viplink_core::registry::{ReadRegistry, Registry, RegistryAdmin, Result};
pub use viplink_core::{StorageError, UniqueKey};
