//! Short link creation and resolution.
//!
//! [`ShortLinkService`] implements the `Shortener` contract from
//! `viplink_core` on top of any registry, using the identifier allocator from
//! `viplink_generator` and the [`TtlPolicy`] for VIP link lifetimes.

pub mod config;
pub mod service;
pub mod ttl;

pub use config::ShortenerSettings;
pub use service::ShortLinkService;
pub use ttl::{TtlPolicy, TtlSettings, TtlUnit};
