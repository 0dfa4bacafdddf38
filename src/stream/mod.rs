//! Canonical stream records.
//!
//! Every source adapter normalizes into [`Stream`]; classification produces
//! [`ClassifiedStream`]. Info hashes are canonicalized by [`InfoHash`].

pub mod hash;
pub mod model;

pub use hash::{InfoHash, InvalidInfoHash};
pub use model::{ClassifiedStream, MediaKind, QualityTier, SourceKind, Stream};
