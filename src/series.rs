//! Chart series extraction
//!
//! Selects one canonical column as a time-indexed series for line plots.

use crate::types::{CanonicalRow, CanonicalTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical columns that can be charted against time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    DistanceKm,
    HeartRateBpm,
    CadenceRpm,
    SpeedKmh,
    AltitudeM,
    PowerWatts,
    Calories,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::DistanceKm,
        Column::HeartRateBpm,
        Column::CadenceRpm,
        Column::SpeedKmh,
        Column::AltitudeM,
        Column::PowerWatts,
        Column::Calories,
    ];

    /// Column name as it appears in the export header
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::DistanceKm => "distance_km",
            Column::HeartRateBpm => "heart_rate_bpm",
            Column::CadenceRpm => "cadence_rpm",
            Column::SpeedKmh => "speed_kmh",
            Column::AltitudeM => "altitude_m",
            Column::PowerWatts => "power_watts",
            Column::Calories => "calories",
        }
    }

    /// Axis label
    pub fn label(&self) -> &'static str {
        match self {
            Column::DistanceKm => "Distance (km)",
            Column::HeartRateBpm => "Heart rate (bpm)",
            Column::CadenceRpm => "Cadence (rpm)",
            Column::SpeedKmh => "Speed (km/h)",
            Column::AltitudeM => "Altitude (m)",
            Column::PowerWatts => "Power (W)",
            Column::Calories => "Calories (kcal)",
        }
    }

    pub fn value(&self, row: &CanonicalRow) -> Option<f64> {
        match self {
            Column::DistanceKm => Some(row.distance_km),
            Column::HeartRateBpm => row.heart_rate_bpm,
            Column::CadenceRpm => row.cadence_rpm,
            Column::SpeedKmh => Some(row.speed_kmh),
            Column::AltitudeM => row.altitude_m,
            Column::PowerWatts => row.power_watts,
            Column::Calories => row.calories,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Column::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Column::ALL.iter().map(Column::as_str).collect();
                format!("unknown column '{s}', expected one of: {}", known.join(", "))
            })
    }
}

/// One point of a chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub value: f64,
}

/// Time-indexed values of `column`; rows where it is absent are skipped
pub fn series(table: &CanonicalTable, column: Column) -> Vec<SeriesPoint> {
    table
        .iter()
        .filter_map(|row| {
            column.value(row).map(|value| SeriesPoint {
                timestamp: row.timestamp,
                elapsed_seconds: row.elapsed_seconds,
                value,
            })
        })
        .collect()
}

/// Columns with at least one recorded value
///
/// Derived km and km/h columns only count when their base field was recorded.
pub fn available_columns(table: &CanonicalTable) -> Vec<Column> {
    Column::ALL
        .into_iter()
        .filter(|column| {
            table.iter().any(|row| match column {
                Column::DistanceKm => row.distance_m.is_some(),
                Column::SpeedKmh => row.speed_mps.is_some(),
                other => other.value(row).is_some(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use crate::types::{DecodedActivity, RawSample, RawValue};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn table() -> CanonicalTable {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
        let at = |s: i64| {
            RawSample::new().with(
                "timestamp",
                RawValue::Timestamp(t0 + chrono::Duration::seconds(s)),
            )
        };
        let decoded = DecodedActivity {
            samples: vec![
                at(0).with("heart_rate", RawValue::Integer(120)),
                at(1),
                at(2)
                    .with("heart_rate", RawValue::Integer(130))
                    .with("altitude", RawValue::Real(12.5)),
            ],
            sessions: vec![],
            message_count: 3,
        };
        Normalizer::default()
            .normalize(&decoded)
            .unwrap()
            .into_table()
            .unwrap()
    }

    #[test]
    fn test_series_skips_absent_values() {
        let points = series(&table(), Column::HeartRateBpm);
        let pairs: Vec<(f64, f64)> = points.iter().map(|p| (p.elapsed_seconds, p.value)).collect();
        assert_eq!(pairs, vec![(0.0, 120.0), (2.0, 130.0)]);
    }

    #[test]
    fn test_derived_columns_always_have_values() {
        let points = series(&table(), Column::SpeedKmh);
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn test_available_columns() {
        assert_eq!(
            available_columns(&table()),
            vec![Column::HeartRateBpm, Column::AltitudeM]
        );
    }

    #[test]
    fn test_column_parsing() {
        assert_eq!("heart_rate_bpm".parse::<Column>(), Ok(Column::HeartRateBpm));
        assert_eq!("Speed-KMH".parse::<Column>(), Ok(Column::SpeedKmh));
        assert!("pace".parse::<Column>().unwrap_err().contains("distance_km"));

        for column in Column::ALL {
            assert_eq!(column.to_string().parse::<Column>(), Ok(column));
        }
    }
}
