//! Common validation utilities.
//!
//! Every check returns a `validator::ValidationError` whose `code` names the
//! violated constraint, so callers can surface it verbatim.

use validator::ValidationError;

/// Number of decimal digits in a hardware device identifier.
pub const DEVICE_ID_LENGTH: usize = 12;

/// Number of decimal digits in an ELock key.
pub const LOCK_KEY_LENGTH: usize = 6;

/// Inclusive ELock gate range.
pub const LOCK_GATE_MIN: u32 = 1;
pub const LOCK_GATE_MAX: u32 = 255;

/// Inclusive interval bounds, in seconds.
pub const LOCATION_INTERVAL_SECS: (u32, u32) = (10, 3600);
pub const ALARM_LOCATION_INTERVAL_SECS: (u32, u32) = (10, 300);
pub const SLEEP_LOCATION_INTERVAL_SECS: (u32, u32) = (30, 3600);
pub const HEARTBEAT_INTERVAL_SECS: (u32, u32) = (60, 3600);

fn error(code: &'static str, message: impl Into<String>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into().into());
    err
}

fn is_ascii_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Returns true when `device_id` is exactly 12 ASCII decimal digits.
pub fn is_valid_device_id(device_id: &str) -> bool {
    is_ascii_digits(device_id, DEVICE_ID_LENGTH)
}

/// Validates a hardware device identifier (12 decimal digits).
pub fn validate_device_id(device_id: &str) -> Result<(), ValidationError> {
    if is_valid_device_id(device_id) {
        Ok(())
    } else {
        Err(error(
            "device_id_format",
            "Device ID must be exactly 12 decimal digits",
        ))
    }
}

/// Validates an ELock key (6 decimal digits).
pub fn validate_lock_key(key: &str) -> Result<(), ValidationError> {
    if is_ascii_digits(key, LOCK_KEY_LENGTH) {
        Ok(())
    } else {
        Err(error("lock_key_format", "Lock key must be exactly 6 decimal digits"))
    }
}

/// Validates an ELock gate number (1 to 255).
pub fn validate_lock_gate(gate: u32) -> Result<(), ValidationError> {
    if (LOCK_GATE_MIN..=LOCK_GATE_MAX).contains(&gate) {
        Ok(())
    } else {
        Err(error("lock_gate_range", "Lock gate must be between 1 and 255"))
    }
}

fn validate_interval(
    secs: u32,
    (min, max): (u32, u32),
    code: &'static str,
    label: &str,
) -> Result<(), ValidationError> {
    if (min..=max).contains(&secs) {
        Ok(())
    } else {
        Err(error(
            code,
            format!("{} must be between {} and {} seconds", label, min, max),
        ))
    }
}

/// Validates the normal location report interval (10 to 3600 seconds).
pub fn validate_location_interval(secs: u32) -> Result<(), ValidationError> {
    validate_interval(
        secs,
        LOCATION_INTERVAL_SECS,
        "location_interval_range",
        "Location interval",
    )
}

/// Validates the in-alarm location report interval (10 to 300 seconds).
pub fn validate_alarm_location_interval(secs: u32) -> Result<(), ValidationError> {
    validate_interval(
        secs,
        ALARM_LOCATION_INTERVAL_SECS,
        "alarm_location_interval_range",
        "Alarm location interval",
    )
}

/// Validates the sleep-mode location report interval (30 to 3600 seconds).
pub fn validate_sleep_location_interval(secs: u32) -> Result<(), ValidationError> {
    validate_interval(
        secs,
        SLEEP_LOCATION_INTERVAL_SECS,
        "sleep_location_interval_range",
        "Sleep location interval",
    )
}

/// Validates the heartbeat interval (60 to 3600 seconds).
pub fn validate_heartbeat_interval(secs: u32) -> Result<(), ValidationError> {
    validate_interval(
        secs,
        HEARTBEAT_INTERVAL_SECS,
        "heartbeat_interval_range",
        "Heartbeat interval",
    )
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(error("latitude_range", "Latitude must be between -90 and 90"))
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(error("longitude_range", "Longitude must be between -180 and 180"))
    }
}

/// Validates that battery level is within valid range (0 to 100).
pub fn validate_battery_level(level: i32) -> Result<(), ValidationError> {
    if (0..=100).contains(&level) {
        Ok(())
    } else {
        Err(error("battery_range", "Battery level must be between 0 and 100"))
    }
}

/// Validates that signal strength is within valid range (0 to 5).
pub fn validate_signal_strength(level: i32) -> Result<(), ValidationError> {
    if (0..=5).contains(&level) {
        Ok(())
    } else {
        Err(error("signal_range", "Signal strength must be between 0 and 5"))
    }
}
