//! Activity file decoders
//!
//! This module provides decoders that turn the raw bytes of a recording into
//! heterogeneous sample and session records, without interpreting them.

mod fit;

pub use fit::FitDecoder;

use crate::error::DecodeError;
use crate::types::DecodedActivity;

/// Trait for activity file decoders
pub trait ActivityDecoder {
    /// Decode raw file bytes into sample and session records
    fn decode(&self, bytes: &[u8]) -> Result<DecodedActivity, DecodeError>;
}
