//! Delimited-text export
//!
//! Serializes the canonical table to CSV (header row plus every canonical
//! column) and reads such exports back.

use crate::error::ExportError;
use crate::normalizer::{elapsed_seconds, MPS_TO_KMH};
use crate::types::{CanonicalRow, CanonicalTable, SessionTotals, UNKNOWN_ACTIVITY};
use chrono::{DateTime, Utc};
use std::io::{Read, Write};

/// Write every row of `table` as CSV with a header row
pub fn write_csv<W: Write>(table: &CanonicalTable, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if table.is_empty() {
        csv_writer.write_record(HEADER)?;
    }
    for row in table.iter() {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Render the table as a CSV string
pub fn to_csv_string(table: &CanonicalTable) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Read a CSV export back into a table
///
/// Rows must still be in timestamp order and share one activity type, and the
/// derived columns (elapsed seconds, km, km/h) must agree with their base
/// columns. Session totals are not part of the export and come back empty.
pub fn read_csv<R: Read>(reader: R) -> Result<CanonicalTable, ExportError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows: Vec<CanonicalRow> = Vec::new();

    for (index, record) in csv_reader.deserialize::<CanonicalRow>().enumerate() {
        let row = record?;
        // +2: header line and 1-based numbering
        let line = index + 2;
        if let Some(prev) = rows.last() {
            if row.timestamp < prev.timestamp {
                return Err(ExportError::Unordered(line));
            }
            if row.activity_type != prev.activity_type {
                return Err(ExportError::MixedActivityType(
                    prev.activity_type.clone(),
                    row.activity_type,
                ));
            }
        }
        let origin = rows.first().map_or(row.timestamp, |first| first.timestamp);
        check_derived(&row, origin)
            .map_err(|reason| ExportError::Inconsistent { line, reason })?;
        rows.push(row);
    }

    let activity_type = rows
        .first()
        .map(|r| r.activity_type.clone())
        .unwrap_or_else(|| UNKNOWN_ACTIVITY.to_string());

    Ok(CanonicalTable::new(rows, activity_type, SessionTotals::default()))
}

/// Derived columns must match what normalization would have produced
fn check_derived(row: &CanonicalRow, origin: DateTime<Utc>) -> Result<(), String> {
    let expected_elapsed = elapsed_seconds(origin, row.timestamp);
    if !close(row.elapsed_seconds, expected_elapsed) {
        return Err(format!(
            "elapsed_seconds is {}, timestamps give {}",
            row.elapsed_seconds, expected_elapsed
        ));
    }

    let expected_km = row.distance_m.map_or(0.0, |m| m / 1000.0);
    if !close(row.distance_km, expected_km) {
        return Err(format!(
            "distance_km is {}, distance_m gives {}",
            row.distance_km, expected_km
        ));
    }

    let expected_kmh = row.speed_mps.map_or(0.0, |v| v * MPS_TO_KMH);
    if !close(row.speed_kmh, expected_kmh) {
        return Err(format!(
            "speed_kmh is {}, speed_mps gives {}",
            row.speed_kmh, expected_kmh
        ));
    }
    Ok(())
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0)
}

/// Header used for tables without rows; matches `CanonicalRow` field order
const HEADER: [&str; 14] = [
    "timestamp",
    "elapsed_seconds",
    "latitude_deg",
    "longitude_deg",
    "distance_m",
    "distance_km",
    "heart_rate_bpm",
    "cadence_rpm",
    "speed_mps",
    "speed_kmh",
    "altitude_m",
    "power_watts",
    "calories",
    "activity_type",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use crate::types::{DecodedActivity, RawSample, RawValue, SessionSummary};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn table() -> CanonicalTable {
        let t0 = Utc.with_ymd_and_hms(2023, 10, 1, 8, 15, 0).unwrap();
        let at = |ms: i64| {
            RawSample::new().with(
                "timestamp",
                RawValue::Timestamp(t0 + chrono::Duration::milliseconds(ms)),
            )
        };
        let decoded = DecodedActivity {
            samples: vec![
                at(0)
                    .with("heart_rate", RawValue::Integer(101))
                    .with("distance", RawValue::Real(0.0))
                    .with("position_lat", RawValue::Integer(612_345_678))
                    .with("position_long", RawValue::Integer(-98_765_432)),
                at(1500)
                    .with("speed", RawValue::Real(3.141))
                    .with("altitude", RawValue::Real(42.2))
                    .with("power", RawValue::Integer(250)),
                at(4000)
                    .with("cadence", RawValue::Integer(88))
                    .with("calories", RawValue::Integer(12))
                    .with("distance", RawValue::Real(12.34)),
            ],
            sessions: vec![
                SessionSummary::new().with("sport", RawValue::Text("road_cycling".into()))
            ],
            message_count: 4,
        };
        Normalizer::default()
            .normalize(&decoded)
            .unwrap()
            .into_table()
            .unwrap()
    }

    #[test]
    fn test_header_lists_all_columns() {
        let csv = to_csv_string(&table()).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(header, HEADER.join(","));
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_round_trip_preserves_rows() {
        let original = table();
        let csv = to_csv_string(&original).unwrap();
        let parsed = read_csv(csv.as_bytes()).unwrap();

        assert_eq!(parsed.len(), original.len());
        assert_eq!(parsed.activity_type(), "Road Cycling");
        assert_eq!(parsed.rows(), original.rows());
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let empty = CanonicalTable::new(
            vec![],
            UNKNOWN_ACTIVITY.to_string(),
            SessionTotals::default(),
        );
        let csv = to_csv_string(&empty).unwrap();
        assert_eq!(csv.trim_end(), HEADER.join(","));

        let parsed = read_csv(csv.as_bytes()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_read_rejects_unordered_rows() {
        let csv = to_csv_string(&table()).unwrap();
        let mut lines: Vec<&str> = csv.lines().collect();
        lines.swap(2, 3);
        let shuffled = lines.join("\n");

        assert!(matches!(
            read_csv(shuffled.as_bytes()),
            Err(ExportError::Unordered(4))
        ));
    }

    fn csv_of(rows: &[CanonicalRow]) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_read_rejects_first_row_with_nonzero_elapsed() {
        let mut rows = table().rows().to_vec();
        rows.remove(0);

        assert!(matches!(
            read_csv(csv_of(&rows).as_bytes()),
            Err(ExportError::Inconsistent { line: 2, .. })
        ));
    }

    #[test]
    fn test_read_rejects_elapsed_out_of_step_with_timestamps() {
        let mut rows = table().rows().to_vec();
        rows[2].elapsed_seconds += 1.0;

        assert!(matches!(
            read_csv(csv_of(&rows).as_bytes()),
            Err(ExportError::Inconsistent { line: 4, .. })
        ));
    }

    #[test]
    fn test_read_rejects_derived_units_that_disagree() {
        let mut rows = table().rows().to_vec();
        rows[2].distance_km = 99.0;
        let err = read_csv(csv_of(&rows).as_bytes()).unwrap_err();
        assert!(err.to_string().contains("distance_km"));

        let mut rows = table().rows().to_vec();
        rows[0].speed_kmh = 5.0;
        let err = read_csv(csv_of(&rows).as_bytes()).unwrap_err();
        assert!(err.to_string().contains("speed_kmh"));
    }

    #[test]
    fn test_read_rejects_mixed_activity_types() {
        let csv = to_csv_string(&table()).unwrap();
        let tampered = csv.replacen("Road Cycling\n", "Running\n", 1);

        assert!(matches!(
            read_csv(tampered.as_bytes()),
            Err(ExportError::MixedActivityType(_, _))
        ));
    }
}
