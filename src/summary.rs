//! Activity summary
//!
//! This module derives the headline figures shown for one activity:
//! - Distance, duration and average speed
//! - Heart rate, speed and power aggregates
//! - Elevation gain and calories, preferring session totals when recorded

use crate::normalizer::MPS_TO_KMH;
use crate::types::CanonicalTable;
use serde::{Deserialize, Serialize};

/// Headline figures for one canonical table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// Start date (YYYY-MM-DD, UTC)
    pub date: Option<String>,
    pub activity_type: String,
    pub sample_count: usize,
    /// Largest cumulative distance seen (km)
    pub distance_km: f64,
    /// Session timer time, or span of the samples (seconds)
    pub duration_seconds: f64,
    /// `duration_seconds` as HH:MM:SS
    pub duration_hms: String,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: Option<f64>,
    /// Mean over strictly positive readings
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
    pub avg_power_watts: Option<f64>,
    pub max_power_watts: Option<f64>,
    pub elevation_gain_m: Option<f64>,
    pub calories: Option<f64>,
}

impl ActivitySummary {
    /// Derive the summary from a canonical table
    pub fn derive(table: &CanonicalTable) -> Self {
        let session = table.session();

        let distance_km = table
            .iter()
            .map(|r| r.distance_km)
            .fold(0.0_f64, f64::max);

        let duration_seconds = session
            .timer_time_s
            .filter(|t| *t > 0.0)
            .unwrap_or_else(|| table.span_seconds());

        let heart_rates: Vec<f64> = table.iter().filter_map(|r| r.heart_rate_bpm).collect();
        let powers: Vec<f64> = table.iter().filter_map(|r| r.power_watts).collect();
        let altitudes: Vec<f64> = table.iter().filter_map(|r| r.altitude_m).collect();

        let max_speed_kmh = session
            .max_speed_mps
            .map(|v| v * MPS_TO_KMH)
            .or_else(|| max(table.iter().filter_map(|r| r.speed_mps.map(|v| v * MPS_TO_KMH))));

        let elevation_gain_m = session.total_ascent_m.or_else(|| {
            if altitudes.len() >= 2 {
                Some(elevation_gain(&altitudes))
            } else {
                None
            }
        });

        let calories = session
            .calories
            .or_else(|| max(table.iter().filter_map(|r| r.calories)));

        Self {
            date: table
                .start_time()
                .map(|ts| ts.format("%Y-%m-%d").to_string()),
            activity_type: table.activity_type().to_string(),
            sample_count: table.len(),
            distance_km,
            duration_seconds,
            duration_hms: format_duration(duration_seconds),
            avg_speed_kmh: average_speed_kmh(distance_km, duration_seconds),
            max_speed_kmh,
            avg_heart_rate: mean_positive(&heart_rates),
            max_heart_rate: max(heart_rates.iter().copied()),
            avg_power_watts: mean_positive(&powers),
            max_power_watts: max(powers.iter().copied()),
            elevation_gain_m,
            calories,
        }
    }
}

/// Sum of positive altitude differences between consecutive samples
pub fn elevation_gain(altitudes: &[f64]) -> f64 {
    altitudes
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .sum()
}

/// Mean of the strictly positive values, `None` when there are none
pub fn mean_positive(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| **v > 0.0)
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Distance over timer duration; 0 when no time was recorded
pub fn average_speed_kmh(distance_km: f64, duration_seconds: f64) -> f64 {
    if duration_seconds > 0.0 {
        distance_km / (duration_seconds / 3600.0)
    } else {
        0.0
    }
}

/// Format seconds as `HH:MM:SS`; fractional seconds are truncated
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00:00".to_string();
    }
    let total = seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

fn max(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, v| match acc {
        Some(m) if m >= v => Some(m),
        _ => Some(v),
    })
}
