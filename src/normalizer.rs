//! Record normalization
//!
//! This module turns decoded sample records into the canonical table:
//! - Known FIT field names mapped to canonical columns
//! - Derived km and km/h columns (concrete 0 when the base field is absent)
//! - Rows without a valid timestamp dropped
//! - Stable sort by timestamp and elapsed seconds from the first row
//! - One activity type resolved from the session records

use crate::config::NormalizerConfig;
use crate::error::NormalizeError;
use crate::types::{
    CanonicalRow, CanonicalTable, DecodedActivity, EmptyReason, Outcome, RawSample, RawValue,
    SessionSummary, SessionTotals, UNKNOWN_ACTIVITY,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::{debug, info};

/// Degrees per FIT semicircle (180 / 2^31)
pub const SEMICIRCLE_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// m/s to km/h
pub const MPS_TO_KMH: f64 = 3.6;

/// Canonical destination of a decoded field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Timestamp,
    Latitude,
    Longitude,
    Distance,
    HeartRate,
    Cadence,
    Speed,
    Altitude,
    Power,
    Calories,
}

/// Source field → canonical column. Earlier entries win when a sample
/// carries both a base field and its `enhanced_` variant.
const FIELD_MAP: &[(&str, Target)] = &[
    ("timestamp", Target::Timestamp),
    ("position_lat", Target::Latitude),
    ("position_long", Target::Longitude),
    ("distance", Target::Distance),
    ("heart_rate", Target::HeartRate),
    ("cadence", Target::Cadence),
    ("speed", Target::Speed),
    ("enhanced_speed", Target::Speed),
    ("altitude", Target::Altitude),
    ("enhanced_altitude", Target::Altitude),
    ("power", Target::Power),
    ("calories", Target::Calories),
];

/// Sample fields after renaming, before timestamp validation
#[derive(Debug, Default)]
struct MappedSample<'a> {
    timestamp: Option<&'a RawValue>,
    latitude_deg: Option<f64>,
    longitude_deg: Option<f64>,
    distance_m: Option<f64>,
    heart_rate_bpm: Option<f64>,
    cadence_rpm: Option<f64>,
    speed_mps: Option<f64>,
    altitude_m: Option<f64>,
    power_watts: Option<f64>,
    calories: Option<f64>,
}

impl<'a> MappedSample<'a> {
    fn from_raw(sample: &'a RawSample) -> Self {
        let mut mapped = MappedSample::default();
        for (name, target) in FIELD_MAP {
            let Some(value) = sample.get(name) else {
                continue;
            };
            let slot = match target {
                Target::Timestamp => {
                    if mapped.timestamp.is_none() {
                        mapped.timestamp = Some(value);
                    }
                    continue;
                }
                Target::Latitude => &mut mapped.latitude_deg,
                Target::Longitude => &mut mapped.longitude_deg,
                Target::Distance => &mut mapped.distance_m,
                Target::HeartRate => &mut mapped.heart_rate_bpm,
                Target::Cadence => &mut mapped.cadence_rpm,
                Target::Speed => &mut mapped.speed_mps,
                Target::Altitude => &mut mapped.altitude_m,
                Target::Power => &mut mapped.power_watts,
                Target::Calories => &mut mapped.calories,
            };
            if slot.is_none() {
                *slot = value.as_f64();
            }
        }

        mapped.latitude_deg = mapped.latitude_deg.map(|s| s * SEMICIRCLE_TO_DEGREES);
        mapped.longitude_deg = mapped.longitude_deg.map(|s| s * SEMICIRCLE_TO_DEGREES);
        mapped
    }
}

/// Normalizer for converting decoded records into a canonical table
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize decoded records into a table or a tagged empty outcome
    pub fn normalize(&self, decoded: &DecodedActivity) -> Result<Outcome, NormalizeError> {
        if decoded.message_count == 0 && decoded.samples.is_empty() && decoded.sessions.is_empty()
        {
            return Err(NormalizeError::NoMessages);
        }
        if decoded.samples.len() > self.config.max_rows {
            return Err(NormalizeError::RowLimit {
                found: decoded.samples.len(),
                limit: self.config.max_rows,
            });
        }

        let mut saw_timestamp_field = false;
        let mut dropped = 0usize;
        let mut rows: Vec<CanonicalRow> = Vec::with_capacity(decoded.samples.len());

        for sample in &decoded.samples {
            let mapped = MappedSample::from_raw(sample);

            let Some(raw_ts) = mapped.timestamp else {
                dropped += 1;
                continue;
            };
            saw_timestamp_field = true;

            let Some(timestamp) = parse_timestamp(raw_ts) else {
                dropped += 1;
                continue;
            };

            rows.push(CanonicalRow {
                timestamp,
                elapsed_seconds: 0.0,
                latitude_deg: mapped.latitude_deg,
                longitude_deg: mapped.longitude_deg,
                distance_m: mapped.distance_m,
                distance_km: mapped.distance_m.map(|m| m / 1000.0).unwrap_or(0.0),
                heart_rate_bpm: mapped.heart_rate_bpm,
                cadence_rpm: mapped.cadence_rpm,
                speed_mps: mapped.speed_mps,
                speed_kmh: mapped.speed_mps.map(|v| v * MPS_TO_KMH).unwrap_or(0.0),
                altitude_m: mapped.altitude_m,
                power_watts: mapped.power_watts,
                calories: mapped.calories,
                activity_type: String::new(),
            });
        }

        if dropped > 0 {
            debug!(
                "[Normalizer] Dropped {} of {} samples without a valid timestamp",
                dropped,
                decoded.samples.len()
            );
        }

        if !saw_timestamp_field {
            return Ok(Outcome::empty(EmptyReason::NoTimestampField));
        }
        if rows.is_empty() {
            return Ok(Outcome::empty(EmptyReason::OkButEmpty));
        }

        // Stable: equal timestamps keep decode order
        rows.sort_by_key(|row| row.timestamp);

        let activity_type = resolve_activity_type(&decoded.sessions);
        let origin = rows[0].timestamp;
        for row in &mut rows {
            row.elapsed_seconds = elapsed_seconds(origin, row.timestamp);
            row.activity_type.clone_from(&activity_type);
        }

        let session = decoded
            .sessions
            .first()
            .map(SessionTotals::from_summary)
            .unwrap_or_default();

        info!(
            "[Normalizer] Built table: {} rows, activity '{}'",
            rows.len(),
            activity_type
        );

        Ok(Outcome::Ready {
            table: CanonicalTable::new(rows, activity_type, session),
        })
    }
}

/// Interpret a decoded value as a point in time
///
/// Text is read as RFC 3339 or `YYYY-MM-DD HH:MM:SS[.f]` (UTC); numbers as
/// Unix seconds.
pub fn parse_timestamp(value: &RawValue) -> Option<DateTime<Utc>> {
    match value {
        RawValue::Timestamp(ts) => Some(*ts),
        RawValue::Text(text) => {
            let text = text.trim();
            DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                        .ok()
                        .map(|naive| Utc.from_utc_datetime(&naive))
                })
        }
        RawValue::Integer(secs) => DateTime::from_timestamp(*secs, 0),
        RawValue::Real(secs) if secs.is_finite() => {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
            if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
                return None;
            }
            DateTime::from_timestamp(whole as i64, nanos)
        }
        RawValue::Real(_) | RawValue::List(_) => None,
    }
}

pub(crate) fn elapsed_seconds(origin: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
    let delta = at - origin;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}

/// First session with a sport, normalized for display; `"Unknown"` otherwise
pub fn resolve_activity_type(sessions: &[SessionSummary]) -> String {
    sessions
        .iter()
        .find_map(SessionSummary::sport)
        .map(|sport| title_case(&sport.replace('_', " ")))
        .unwrap_or_else(|| UNKNOWN_ACTIVITY.to_string())
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}
