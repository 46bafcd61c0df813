//! Pipeline orchestration
//!
//! This module provides the public entry points for fitdash. It runs raw file
//! bytes through decoding and normalization and converts decode failures into
//! a tagged empty outcome at the boundary.

use crate::cache::{ContentHash, LruOutcomeCache, NoCache, OutcomeCache};
use crate::config::ProcessorConfig;
use crate::decoder::{ActivityDecoder, FitDecoder};
use crate::error::{DecodeError, NormalizeError};
use crate::normalizer::Normalizer;
use crate::types::{EmptyReason, Outcome};
use log::{debug, warn};

/// Process one FIT file with default settings and no caching.
///
/// Decode failures come back as `Outcome::Empty { reason: DecodeFailed }`
/// carrying the cause; only structurally unusable decoder output is an error.
///
/// # Example
/// ```ignore
/// let outcome = process_fit_bytes(&std::fs::read("ride.fit")?)?;
/// match outcome.table() {
///     Some(table) => println!("{} rows", table.len()),
///     None => eprintln!("{}", outcome.user_message()),
/// }
/// ```
pub fn process_fit_bytes(bytes: &[u8]) -> Result<Outcome, NormalizeError> {
    let config = ProcessorConfig::default();
    if let Some(rejected) = reject_oversized(bytes, config.max_input_bytes) {
        return Ok(rejected);
    }
    run_stages(&FitDecoder, &Normalizer::new(config.normalizer), bytes)
}

/// Pipeline stages:
/// 1. ActivityDecoder - bytes to raw sample and session records
/// 2. Normalizer - raw records to the canonical table
fn run_stages(
    decoder: &dyn ActivityDecoder,
    normalizer: &Normalizer,
    bytes: &[u8],
) -> Result<Outcome, NormalizeError> {
    match decoder.decode(bytes) {
        Ok(decoded) => normalizer.normalize(&decoded),
        Err(e) => Ok(decode_failed(e)),
    }
}

/// Inputs over the limit are turned away before any hashing or decoding
fn reject_oversized(bytes: &[u8], max_input_bytes: usize) -> Option<Outcome> {
    if bytes.len() <= max_input_bytes {
        return None;
    }
    Some(decode_failed(DecodeError::InputTooLarge {
        size: bytes.len(),
        limit: max_input_bytes,
    }))
}

fn decode_failed(e: DecodeError) -> Outcome {
    warn!("[Pipeline] File could not be decoded: {}", e);
    Outcome::Empty {
        reason: EmptyReason::DecodeFailed,
        detail: Some(e.to_string()),
    }
}

/// Stateful processor with configuration and an injectable outcome cache.
pub struct ActivityProcessor {
    config: ProcessorConfig,
    decoder: Box<dyn ActivityDecoder>,
    normalizer: Normalizer,
    cache: Box<dyn OutcomeCache>,
}

impl Default for ActivityProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityProcessor {
    /// Create a processor with default settings and an LRU cache
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default())
    }

    /// Create a processor from config; a zero cache capacity disables caching
    pub fn with_config(config: ProcessorConfig) -> Self {
        let cache: Box<dyn OutcomeCache> = if config.cache_capacity == 0 {
            Box::new(NoCache)
        } else {
            Box::new(LruOutcomeCache::new(config.cache_capacity))
        };
        Self::with_cache(config, cache)
    }

    /// Create a processor with a caller-supplied cache
    pub fn with_cache(config: ProcessorConfig, cache: Box<dyn OutcomeCache>) -> Self {
        Self {
            normalizer: Normalizer::new(config.normalizer.clone()),
            decoder: Box::new(FitDecoder),
            config,
            cache,
        }
    }

    /// Swap the decoder (e.g. for a different file format)
    pub fn with_decoder(mut self, decoder: Box<dyn ActivityDecoder>) -> Self {
        self.decoder = decoder;
        self.cache.clear();
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Process one file's bytes, reusing a cached outcome for identical bytes
    pub fn process(&mut self, bytes: &[u8]) -> Result<Outcome, NormalizeError> {
        if let Some(rejected) = reject_oversized(bytes, self.config.max_input_bytes) {
            return Ok(rejected);
        }

        let key = ContentHash::of(bytes);

        if let Some(cached) = self.cache.get(&key) {
            debug!("[ActivityProcessor] Cache hit for {}", key);
            return Ok(cached);
        }

        let outcome = run_stages(self.decoder.as_ref(), &self.normalizer, bytes)?;
        self.cache.insert(key, outcome.clone());
        Ok(outcome)
    }

    /// Drop the cached outcome for these bytes, if any
    pub fn invalidate(&mut self, bytes: &[u8]) {
        self.cache.invalidate(&ContentHash::of(bytes));
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cached_outcomes(&self) -> usize {
        self.cache.len()
    }
}
