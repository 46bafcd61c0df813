//! Core types for the fitdash pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: decoded raw records, the canonical table, and the tagged outcome
//! handed to consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel activity type used when no session record names a sport
pub const UNKNOWN_ACTIVITY: &str = "Unknown";

/// A single decoded field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Timestamp(DateTime<Utc>),
    Integer(i64),
    Real(f64),
    Text(String),
    List(Vec<RawValue>),
}

impl RawValue {
    /// Numeric view of the value. Lists yield their first numeric element.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(v) => Some(*v as f64),
            RawValue::Real(v) if v.is_finite() => Some(*v),
            RawValue::Real(_) => None,
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            RawValue::List(values) => values.iter().find_map(RawValue::as_f64),
            RawValue::Timestamp(_) => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            RawValue::Integer(v) => write!(f, "{v}"),
            RawValue::Real(v) => write!(f, "{v}"),
            RawValue::Text(s) => f.write_str(s),
            RawValue::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Open field mapping shared by samples and session records
pub type FieldMap = BTreeMap<String, RawValue>;

/// One decoded per-sample record (a FIT `record` message)
///
/// Field presence varies per file and per sample. Absent fields are omitted,
/// never defaulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawSample {
    pub fields: FieldMap,
}

impl RawSample {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly useful in tests
    pub fn with(mut self, name: &str, value: RawValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Numeric value of `name`, if present and numeric
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(RawValue::as_f64)
    }
}

/// One decoded session-level record (a FIT `session` message)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub fields: FieldMap,
}

impl SessionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: RawValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(RawValue::as_f64)
    }

    fn number_or(&self, name: &str, fallback: &str) -> Option<f64> {
        self.number(name).or_else(|| self.number(fallback))
    }

    /// Raw sport label as recorded (e.g. `trail_running`)
    pub fn sport(&self) -> Option<String> {
        self.get("sport").map(|v| v.to_string())
    }

    /// Timer time in seconds (excludes pauses)
    pub fn total_timer_time(&self) -> Option<f64> {
        self.number("total_timer_time")
    }

    /// Wall-clock elapsed time in seconds
    pub fn total_elapsed_time(&self) -> Option<f64> {
        self.number("total_elapsed_time")
    }

    pub fn total_distance(&self) -> Option<f64> {
        self.number("total_distance")
    }

    pub fn total_calories(&self) -> Option<f64> {
        self.number("total_calories")
    }

    /// Maximum speed in m/s
    pub fn max_speed(&self) -> Option<f64> {
        self.number_or("max_speed", "enhanced_max_speed")
    }

    /// Total positive elevation in meters
    pub fn total_ascent(&self) -> Option<f64> {
        self.number_or("total_ascent", "total_elevation_gain")
    }
}

/// Everything the decoder extracted from one file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodedActivity {
    /// Sample records in encounter order
    pub samples: Vec<RawSample>,
    /// Session records in encounter order
    pub sessions: Vec<SessionSummary>,
    /// Data messages of any kind seen in the stream
    pub message_count: usize,
}

/// Totals taken from the first session record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub timer_time_s: Option<f64>,
    pub elapsed_time_s: Option<f64>,
    pub distance_m: Option<f64>,
    pub calories: Option<f64>,
    pub max_speed_mps: Option<f64>,
    pub total_ascent_m: Option<f64>,
}

impl SessionTotals {
    pub fn from_summary(summary: &SessionSummary) -> Self {
        Self {
            timer_time_s: summary.total_timer_time(),
            elapsed_time_s: summary.total_elapsed_time(),
            distance_m: summary.total_distance(),
            calories: summary.total_calories(),
            max_speed_mps: summary.max_speed(),
            total_ascent_m: summary.total_ascent(),
        }
    }
}

/// One row of the canonical table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub timestamp: DateTime<Utc>,
    /// Seconds since the first row; 0 for the first row
    pub elapsed_seconds: f64,
    pub latitude_deg: Option<f64>,
    pub longitude_deg: Option<f64>,
    pub distance_m: Option<f64>,
    /// `distance_m / 1000`, or 0 when distance is absent
    pub distance_km: f64,
    pub heart_rate_bpm: Option<f64>,
    pub cadence_rpm: Option<f64>,
    pub speed_mps: Option<f64>,
    /// `speed_mps * 3.6`, or 0 when speed is absent
    pub speed_kmh: f64,
    pub altitude_m: Option<f64>,
    pub power_watts: Option<f64>,
    pub calories: Option<f64>,
    pub activity_type: String,
}

/// Time-ordered, immutable table of canonical rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalTable {
    rows: Vec<CanonicalRow>,
    activity_type: String,
    session: SessionTotals,
}

impl CanonicalTable {
    /// Rows must already be sorted and carry `activity_type`
    pub(crate) fn new(
        rows: Vec<CanonicalRow>,
        activity_type: String,
        session: SessionTotals,
    ) -> Self {
        Self {
            rows,
            activity_type,
            session,
        }
    }

    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn activity_type(&self) -> &str {
        &self.activity_type
    }

    pub fn session(&self) -> &SessionTotals {
        &self.session
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.rows.first().map(|r| r.timestamp)
    }

    /// Elapsed seconds of the last row
    pub fn span_seconds(&self) -> f64 {
        self.rows.last().map(|r| r.elapsed_seconds).unwrap_or(0.0)
    }
}

/// Why no table could be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// No sample carried a timestamp field at all
    NoTimestampField,
    /// The bytes could not be decoded
    DecodeFailed,
    /// Timestamps were present but none survived validation
    OkButEmpty,
}

impl EmptyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyReason::NoTimestampField => "no_timestamp_field",
            EmptyReason::DecodeFailed => "decode_failed",
            EmptyReason::OkButEmpty => "ok_but_empty",
        }
    }
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one file: a table or a tagged empty result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Ready {
        table: CanonicalTable,
    },
    Empty {
        reason: EmptyReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl Outcome {
    pub fn empty(reason: EmptyReason) -> Self {
        Outcome::Empty {
            reason,
            detail: None,
        }
    }

    pub fn table(&self) -> Option<&CanonicalTable> {
        match self {
            Outcome::Ready { table } => Some(table),
            Outcome::Empty { .. } => None,
        }
    }

    pub fn into_table(self) -> Option<CanonicalTable> {
        match self {
            Outcome::Ready { table } => Some(table),
            Outcome::Empty { .. } => None,
        }
    }

    pub fn empty_reason(&self) -> Option<EmptyReason> {
        match self {
            Outcome::Ready { .. } => None,
            Outcome::Empty { reason, .. } => Some(*reason),
        }
    }

    /// Message suitable for showing to the person who supplied the file
    pub fn user_message(&self) -> String {
        match self {
            Outcome::Ready { table } => format!(
                "Loaded {} samples ({})",
                table.len(),
                table.activity_type()
            ),
            Outcome::Empty {
                reason: EmptyReason::NoTimestampField,
                ..
            } => "No 'timestamp' data found in the file. Cannot generate a dashboard.".to_string(),
            Outcome::Empty {
                reason: EmptyReason::DecodeFailed,
                detail,
            } => match detail {
                Some(cause) => format!("File could not be processed: {cause}"),
                None => "File could not be processed.".to_string(),
            },
            Outcome::Empty {
                reason: EmptyReason::OkButEmpty,
                ..
            } => "No usable data found in the file.".to_string(),
        }
    }
}
