//! Random identifier allocation for viplink.
//!
//! Suffixes and secret keys are drawn from a cryptographically secure random
//! source, hex encoded, and checked against the registry until an unused value
//! is found or the attempt budget runs out.

pub mod allocator;
pub mod error;
pub mod random;

pub use allocator::{AllocatorSettings, IdentifierAllocator};
pub use error::AllocationError;
pub use random::{OsRandom, RandomSource};
