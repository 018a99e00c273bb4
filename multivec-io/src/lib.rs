//! # Input/Output for multivec conversion
//!
//! Two pieces live here: [`BigWigTrack`](bigwig::BigWigTrack), which exposes a bigWig file
//! through the [`SignalTrack`](multivec_core::models::SignalTrack) trait, and the chunked
//! matrix container ([`StoreWriter`](store::StoreWriter) / [`StoreReader`](store::StoreReader))
//! that holds both the staging matrix and the final multi-resolution output.
//!
pub mod bigwig;
pub mod error;
pub mod store;

// re-expose core functions
pub use bigwig::*;
pub use error::*;
pub use store::*;
