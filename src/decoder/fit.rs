//! FIT decoder
//!
//! Reads Garmin FIT streams and collects `record` and `session` messages as
//! open field maps.

use crate::error::DecodeError;
use crate::types::{DecodedActivity, FieldMap, RawSample, RawValue, SessionSummary};
use chrono::Utc;
use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use log::debug;

use super::ActivityDecoder;

/// FIT file decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct FitDecoder;

impl ActivityDecoder for FitDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedActivity, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::EmptyInput);
        }

        let messages =
            fitparser::de::from_bytes(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let mut decoded = DecodedActivity {
            message_count: messages.len(),
            ..Default::default()
        };

        for message in &messages {
            match message.kind() {
                MesgNum::Record => decoded.samples.push(RawSample {
                    fields: collect_fields(message),
                }),
                MesgNum::Session => decoded.sessions.push(SessionSummary {
                    fields: collect_fields(message),
                }),
                _ => {}
            }
        }

        debug!(
            "[FitDecoder] {} messages, {} samples, {} sessions",
            decoded.message_count,
            decoded.samples.len(),
            decoded.sessions.len()
        );

        Ok(decoded)
    }
}

fn collect_fields(message: &FitDataRecord) -> FieldMap {
    message
        .fields()
        .iter()
        .filter_map(|field| convert_value(field.value()).map(|v| (field.name().to_string(), v)))
        .collect()
}

/// Map a fitparser value onto [`RawValue`]; unrepresentable values are omitted
fn convert_value(value: &Value) -> Option<RawValue> {
    let converted = match value {
        Value::Timestamp(ts) => RawValue::Timestamp(ts.with_timezone(&Utc)),
        Value::Byte(v) => RawValue::Integer(i64::from(*v)),
        Value::SInt8(v) => RawValue::Integer(i64::from(*v)),
        Value::UInt8(v) => RawValue::Integer(i64::from(*v)),
        Value::UInt8z(v) => RawValue::Integer(i64::from(*v)),
        Value::SInt16(v) => RawValue::Integer(i64::from(*v)),
        Value::UInt16(v) => RawValue::Integer(i64::from(*v)),
        Value::UInt16z(v) => RawValue::Integer(i64::from(*v)),
        Value::SInt32(v) => RawValue::Integer(i64::from(*v)),
        Value::UInt32(v) => RawValue::Integer(i64::from(*v)),
        Value::UInt32z(v) => RawValue::Integer(i64::from(*v)),
        Value::SInt64(v) => RawValue::Integer(*v),
        Value::UInt64(v) => i64::try_from(*v)
            .map(RawValue::Integer)
            .unwrap_or(RawValue::Real(*v as f64)),
        Value::UInt64z(v) => i64::try_from(*v)
            .map(RawValue::Integer)
            .unwrap_or(RawValue::Real(*v as f64)),
        Value::Float32(v) => RawValue::Real(f64::from(*v)),
        Value::Float64(v) => RawValue::Real(*v),
        Value::String(s) => RawValue::Text(s.clone()),
        Value::Array(values) => {
            let items: Vec<RawValue> = values.iter().filter_map(convert_value).collect();
            if items.is_empty() {
                return None;
            }
            RawValue::List(items)
        }
        _ => return None,
    };
    Some(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FitFixture, FixtureRecord, FIT_EPOCH_OFFSET};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_records_and_session() {
        let bytes = FitFixture::new()
            .record(FixtureRecord::at(1_000_000_000).heart_rate(120).distance(15.5))
            .record(FixtureRecord::at(1_000_000_001).heart_rate(125).distance(20.0))
            .session(Some(2), None)
            .build();

        let decoded = FitDecoder.decode(&bytes).unwrap();

        assert_eq!(decoded.samples.len(), 2);
        assert_eq!(decoded.sessions.len(), 1);
        assert!(decoded.message_count >= 3);

        let first = &decoded.samples[0];
        match first.get("timestamp") {
            Some(RawValue::Timestamp(ts)) => {
                assert_eq!(ts.timestamp(), 1_000_000_000 + FIT_EPOCH_OFFSET)
            }
            other => panic!("expected timestamp, got {other:?}"),
        }
        assert_eq!(first.number("heart_rate"), Some(120.0));
        assert!((first.number("distance").unwrap() - 15.5).abs() < 1e-9);

        assert_eq!(decoded.sessions[0].sport().as_deref(), Some("cycling"));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let bytes = FitFixture::new()
            .record(FixtureRecord::at(1_000_000_000))
            .record(FixtureRecord::untimed().heart_rate(99))
            .build();

        let decoded = FitDecoder.decode(&bytes).unwrap();

        assert_eq!(decoded.samples.len(), 2);
        assert!(!decoded.samples[0].contains("heart_rate"));
        assert!(!decoded.samples[1].contains("timestamp"));
        assert_eq!(decoded.samples[1].number("heart_rate"), Some(99.0));
    }

    #[test]
    fn test_position_cadence_and_power_fields() {
        let bytes = FitFixture::new()
            .record(
                FixtureRecord::at(1_000_000_000)
                    .position(1 << 30, -(1 << 29))
                    .cadence(90)
                    .power(250),
            )
            .build();

        let decoded = FitDecoder.decode(&bytes).unwrap();
        let sample = &decoded.samples[0];

        assert_eq!(sample.number("position_lat"), Some(1_073_741_824.0));
        assert_eq!(sample.number("position_long"), Some(-536_870_912.0));
        assert_eq!(sample.number("cadence"), Some(90.0));
        assert_eq!(sample.number("power"), Some(250.0));
    }

    #[test]
    fn test_empty_input_is_error() {
        assert_eq!(FitDecoder.decode(&[]), Err(DecodeError::EmptyInput));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let result = FitDecoder.decode(b"definitely not a fit file at all");
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_corrupted_crc_is_malformed() {
        let mut bytes = FitFixture::new()
            .record(FixtureRecord::at(1_000_000_000).heart_rate(120))
            .build();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        assert!(matches!(
            FitDecoder.decode(&bytes),
            Err(DecodeError::Malformed(_))
        ));
    }
}
