//! Core types and traits for the viplink URL shortener.
//!
//! This crate provides the link data model, the registry contract consumed by
//! the shortener service, and the error types shared across the workspace.

pub mod clock;
pub mod error;
pub mod link;
pub mod registry;
pub mod secret;
pub mod shortener;
pub mod suffix;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, ShortenerError, StorageError, UniqueKey};
pub use link::{Link, NewLink};
pub use registry::{ReadRegistry, Registry, RegistryAdmin};
pub use secret::SecretKey;
pub use shortener::{CreateLinkRequest, CreatedLink, Shortener};
pub use suffix::Suffix;
