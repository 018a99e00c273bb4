//! # Core models for bigWig to multivec conversion
//!
//! Shared building blocks used by the rest of the workspace: the interval and chromosome
//! models, the [`SignalTrack`](models::SignalTrack) abstraction over an input track, the
//! error taxonomy of a conversion run and its configuration.
//!
pub mod config;
pub mod consts;
pub mod errors;
pub mod models;
pub mod utils;

// re-expose the most used items
pub use config::*;
pub use consts::*;
pub use errors::*;
