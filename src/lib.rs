//! fitdash-core - FIT activity decoding and normalization
//!
//! fitdash turns the raw bytes of a FIT activity recording into one
//! time-ordered canonical table through a deterministic pipeline:
//! decoding → normalization → (summary, series, CSV export).
//!
//! ## Modules
//!
//! - **Pipeline**: `process_fit_bytes` and the cached `ActivityProcessor`
//! - **Consumers**: activity summary, chart series and CSV export over the table

pub mod cache;
pub mod config;
pub mod decoder;
pub mod error;
pub mod export;
pub mod normalizer;
pub mod pipeline;
pub mod series;
pub mod summary;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

#[cfg(test)]
mod fixtures;

pub use cache::{ContentHash, LruOutcomeCache, NoCache, OutcomeCache};
pub use config::{NormalizerConfig, ProcessorConfig};
pub use decoder::{ActivityDecoder, FitDecoder};
pub use error::ComputeError;
pub use normalizer::Normalizer;
pub use pipeline::{process_fit_bytes, ActivityProcessor};
pub use summary::ActivitySummary;
pub use types::{CanonicalRow, CanonicalTable, EmptyReason, Outcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
