//! Free-text descriptor line parser.
//!
//! Vendor responses carry an `extraInfoDescArr` of human-readable lines such as
//! `"Device Power: 20%"` or
//! `"LBS Info: ..., Signal strength - 17"`. Only battery and signal are read;
//! every other line is ignored.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use shared::validation::{validate_battery_level, validate_signal_strength};

const BATTERY_MARKER: &str = "Device Power:";
const SIGNAL_MARKER: &str = "Signal strength";

lazy_static! {
    static ref BATTERY_PATTERN: Regex =
        Regex::new(r"Device Power:\s*([+-]?\d+)\s*%?\s*$").expect("valid battery regex");
    static ref SIGNAL_PATTERN: Regex =
        Regex::new(r"Signal strength -\s*([+-]?\d+)\s*$").expect("valid signal regex");
}

/// Health readings extracted from descriptor lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescriptorReadings {
    pub battery_level: Option<i32>,
    pub signal_strength: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reading {
    Battery(i32),
    Signal(i32),
}

/// Classifies one line. Lines mentioning battery are never read as signal.
fn parse_line(line: &str) -> Option<Result<Reading, String>> {
    if line.contains(BATTERY_MARKER) {
        let parsed = BATTERY_PATTERN
            .captures(line)
            .and_then(|c| c[1].parse::<i32>().ok())
            .map(Reading::Battery)
            .ok_or_else(|| format!("unparsable battery line: {}", line));
        Some(parsed)
    } else if line.contains(SIGNAL_MARKER) {
        let parsed = SIGNAL_PATTERN
            .captures(line)
            .and_then(|c| c[1].parse::<i32>().ok())
            .map(Reading::Signal)
            .ok_or_else(|| format!("unparsable signal line: {}", line));
        Some(parsed)
    } else {
        None
    }
}

/// Extracts battery (0..=100) and signal (0..=5) readings.
///
/// Out-of-range values and unparsable lines are dropped; when several lines
/// yield an in-range value the last one wins.
pub fn parse_descriptors(lines: &[Value]) -> DescriptorReadings {
    let mut readings = DescriptorReadings::default();

    for line in lines.iter().filter_map(Value::as_str) {
        match parse_line(line) {
            Some(Ok(Reading::Battery(level))) => {
                if validate_battery_level(level).is_ok() {
                    readings.battery_level = Some(level);
                } else {
                    tracing::debug!(level, "Discarding out-of-range battery level");
                }
            }
            Some(Ok(Reading::Signal(level))) => {
                if validate_signal_strength(level).is_ok() {
                    readings.signal_strength = Some(level);
                } else {
                    tracing::debug!(level, "Discarding out-of-range signal strength");
                }
            }
            Some(Err(reason)) => tracing::warn!("{}", reason),
            None => {}
        }
    }

    readings
}
