//! Device command model.
//!
//! Commands are built from typed constructors that enforce parameter ranges,
//! then rendered into the vendor wire format. The dispatcher only accepts a
//! [`ValidatedCommand`], which can only be obtained by passing the structural
//! check in [`ValidatedCommand::from_value`].

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use validator::ValidationError;

use shared::validation;

/// Fixed line code required by the vendor for ELock commands.
pub const LOCK_LINE_CODE: u32 = 1234;

/// Fixed validity window for ELock commands (0 = no expiry).
pub const LOCK_VALID_TIME: u32 = 0;

/// Gate used when a lock command does not name one.
pub const DEFAULT_LOCK_GATE: i64 = 8;

/// Wire `type` of ELock commands.
pub const ELOCK_COMMAND_TYPE: &str = "Elock";

/// Fields every `elockCommand` object must carry.
pub const REQUIRED_ELOCK_FIELDS: [&str; 6] = ["cmdType", "lockId", "bill", "lineCode", "gate", "key"];

const SEQUENCE_ALPHABET: &[u8] = b"0123456789ABCDEF";
const SEQUENCE_LENGTH: usize = 4;

/// Errors raised while building or validating a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Invalid device ID: {0}")]
    InvalidDeviceId(String),

    #[error("Invalid command structure: {0}")]
    InvalidCommand(String),

    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

impl CommandError {
    fn parameter(parameter: &'static str, err: ValidationError) -> Self {
        let reason = err
            .message
            .map(|m| m.to_string())
            .unwrap_or_else(|| err.code.to_string());
        CommandError::InvalidParameter { parameter, reason }
    }
}

/// Checks an interval supplied by a caller and narrows it to `u32`.
fn checked_interval(
    parameter: &'static str,
    secs: i64,
    check: fn(u32) -> Result<(), ValidationError>,
) -> Result<u32, CommandError> {
    let secs = u32::try_from(secs).map_err(|_| CommandError::InvalidParameter {
        parameter,
        reason: format!("{} is not a valid number of seconds", secs),
    })?;
    check(secs).map_err(|e| CommandError::parameter(parameter, e))?;
    Ok(secs)
}

/// Lock sub-protocol operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOperation {
    Seal,
    Unseal,
    CancelAlarm,
}

impl LockOperation {
    /// Vendor `cmdType` for this operation.
    pub fn cmd_type(&self) -> &'static str {
        match self {
            LockOperation::Seal => "SEAL",
            LockOperation::Unseal => "UNSEAL",
            LockOperation::CancelAlarm => "CANCEL_ALARM",
        }
    }
}

/// Payload of a seal, unseal or cancel-alarm command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockCommandPayload {
    pub lock_id: String,
    pub bill_number: String,
    pub line_code: u32,
    pub gate: u32,
    pub key: String,
    pub valid_time: u32,
    pub sequence_number: String,
}

impl LockCommandPayload {
    /// Validates the caller-supplied fields and stamps a fresh bill number
    /// and sequence number.
    pub fn new(lock_id: &str, key: &str, gate: i64) -> Result<Self, CommandError> {
        if lock_id.trim().is_empty() {
            return Err(CommandError::InvalidParameter {
                parameter: "lockId",
                reason: "Lock ID must not be empty".to_string(),
            });
        }
        validation::validate_lock_key(key).map_err(|e| CommandError::parameter("key", e))?;
        let gate = u32::try_from(gate).map_err(|_| CommandError::InvalidParameter {
            parameter: "gate",
            reason: "Lock gate must be between 1 and 255".to_string(),
        })?;
        validation::validate_lock_gate(gate).map_err(|e| CommandError::parameter("gate", e))?;

        Ok(Self {
            lock_id: lock_id.to_string(),
            bill_number: generate_bill_number(),
            line_code: LOCK_LINE_CODE,
            gate,
            key: key.to_string(),
            valid_time: LOCK_VALID_TIME,
            sequence_number: generate_sequence_number(),
        })
    }

    fn validate(&self) -> Result<(), CommandError> {
        validation::validate_lock_key(&self.key).map_err(|e| CommandError::parameter("key", e))?;
        validation::validate_lock_gate(self.gate)
            .map_err(|e| CommandError::parameter("gate", e))?;
        Ok(())
    }

    fn to_wire(&self, operation: LockOperation) -> Value {
        json!({
            "cmdType": operation.cmd_type(),
            "lockId": self.lock_id,
            "bill": self.bill_number,
            "lineCode": self.line_code,
            "gate": self.gate,
            "key": self.key,
            "validTime": self.valid_time,
            "businessDataSeqNo": self.sequence_number,
        })
    }
}

/// Command vocabulary understood by the tracker fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    RequestLocation,
    SetLocationInterval { interval_secs: u32 },
    SealLock(LockCommandPayload),
    UnsealLock(LockCommandPayload),
    CancelLockAlarm(LockCommandPayload),
    Reboot,
    FactoryReset,
    SetHeartbeatInterval { interval_secs: u32 },
    SetAlarmLocationInterval { interval_secs: u32 },
    SetSleepLocationInterval { interval_secs: u32 },
    EnableSleepMode,
    PowerOff,
}

impl Command {
    pub fn set_location_interval(secs: i64) -> Result<Self, CommandError> {
        let interval_secs =
            checked_interval("interval", secs, validation::validate_location_interval)?;
        Ok(Command::SetLocationInterval { interval_secs })
    }

    pub fn set_heartbeat_interval(secs: i64) -> Result<Self, CommandError> {
        let interval_secs =
            checked_interval("interval", secs, validation::validate_heartbeat_interval)?;
        Ok(Command::SetHeartbeatInterval { interval_secs })
    }

    pub fn set_alarm_location_interval(secs: i64) -> Result<Self, CommandError> {
        let interval_secs = checked_interval(
            "interval",
            secs,
            validation::validate_alarm_location_interval,
        )?;
        Ok(Command::SetAlarmLocationInterval { interval_secs })
    }

    pub fn set_sleep_location_interval(secs: i64) -> Result<Self, CommandError> {
        let interval_secs = checked_interval(
            "interval",
            secs,
            validation::validate_sleep_location_interval,
        )?;
        Ok(Command::SetSleepLocationInterval { interval_secs })
    }

    pub fn seal_lock(lock_id: &str, key: &str, gate: i64) -> Result<Self, CommandError> {
        Ok(Command::SealLock(LockCommandPayload::new(lock_id, key, gate)?))
    }

    pub fn unseal_lock(lock_id: &str, key: &str, gate: i64) -> Result<Self, CommandError> {
        Ok(Command::UnsealLock(LockCommandPayload::new(lock_id, key, gate)?))
    }

    pub fn cancel_lock_alarm(lock_id: &str, key: &str, gate: i64) -> Result<Self, CommandError> {
        Ok(Command::CancelLockAlarm(LockCommandPayload::new(
            lock_id, key, gate,
        )?))
    }

    /// Vendor wire `type` of this command.
    pub fn wire_type(&self) -> &'static str {
        match self {
            Command::RequestLocation => "SingleReportLocation",
            Command::SetLocationInterval { .. } => "ReportLocation",
            Command::SealLock(_) | Command::UnsealLock(_) | Command::CancelLockAlarm(_) => {
                ELOCK_COMMAND_TYPE
            }
            Command::Reboot => "RebootDevice",
            Command::FactoryReset => "ResetFactorySettings",
            Command::SetHeartbeatInterval { .. }
            | Command::SetAlarmLocationInterval { .. }
            | Command::SetSleepLocationInterval { .. } => "ParameterSettings",
            Command::EnableSleepMode => "EnableSleepMode",
            Command::PowerOff => "DevicePowerOff",
        }
    }

    /// Re-checks every range constraint carried by the variant.
    pub fn validate(&self) -> Result<(), CommandError> {
        match self {
            Command::SetLocationInterval { interval_secs } => {
                validation::validate_location_interval(*interval_secs)
                    .map_err(|e| CommandError::parameter("interval", e))
            }
            Command::SetHeartbeatInterval { interval_secs } => {
                validation::validate_heartbeat_interval(*interval_secs)
                    .map_err(|e| CommandError::parameter("interval", e))
            }
            Command::SetAlarmLocationInterval { interval_secs } => {
                validation::validate_alarm_location_interval(*interval_secs)
                    .map_err(|e| CommandError::parameter("interval", e))
            }
            Command::SetSleepLocationInterval { interval_secs } => {
                validation::validate_sleep_location_interval(*interval_secs)
                    .map_err(|e| CommandError::parameter("interval", e))
            }
            Command::SealLock(payload)
            | Command::UnsealLock(payload)
            | Command::CancelLockAlarm(payload) => payload.validate(),
            _ => Ok(()),
        }
    }

    /// Renders the command object in the vendor wire format.
    pub fn to_wire(&self) -> Value {
        let parameter = |command_id: &str, field: &str, secs: u32| {
            json!({
                "type": "ParameterSettings",
                "paramSettingList": [{ "commandId": command_id, field: secs }],
            })
        };

        match self {
            Command::SetLocationInterval { interval_secs } => json!({
                "type": self.wire_type(),
                "interval": interval_secs,
            }),
            Command::SealLock(payload) => json!({
                "type": ELOCK_COMMAND_TYPE,
                "elockCommand": payload.to_wire(LockOperation::Seal),
            }),
            Command::UnsealLock(payload) => json!({
                "type": ELOCK_COMMAND_TYPE,
                "elockCommand": payload.to_wire(LockOperation::Unseal),
            }),
            Command::CancelLockAlarm(payload) => json!({
                "type": ELOCK_COMMAND_TYPE,
                "elockCommand": payload.to_wire(LockOperation::CancelAlarm),
            }),
            Command::SetHeartbeatInterval { interval_secs } => {
                parameter("00000001", "heartbeatInterval", *interval_secs)
            }
            Command::SetAlarmLocationInterval { interval_secs } => {
                parameter("00000028", "inAlarmLocationUploadInterval", *interval_secs)
            }
            Command::SetSleepLocationInterval { interval_secs } => {
                parameter("00000027", "sleepingLocationUploadInterval", *interval_secs)
            }
            _ => json!({ "type": self.wire_type() }),
        }
    }

    /// Validates the command and converts it into a dispatchable value.
    pub fn into_validated(self) -> Result<ValidatedCommand, CommandError> {
        self.validate()?;
        ValidatedCommand::from_value(self.to_wire())
    }
}

/// A wire command that passed the structural check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCommand(Value);

impl ValidatedCommand {
    /// Structural check: the command is an object carrying `type`; ELock
    /// commands must also carry every field of [`REQUIRED_ELOCK_FIELDS`].
    pub fn from_value(value: Value) -> Result<Self, CommandError> {
        let object = value.as_object().ok_or_else(|| {
            CommandError::InvalidCommand("command must be a JSON object".to_string())
        })?;

        let command_type = object.get("type").ok_or_else(|| {
            CommandError::InvalidCommand("missing required field 'type'".to_string())
        })?;

        if command_type.as_str() == Some(ELOCK_COMMAND_TYPE) {
            let elock = object
                .get("elockCommand")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    CommandError::InvalidCommand(
                        "Elock command requires an 'elockCommand' object".to_string(),
                    )
                })?;

            let missing: Vec<&str> = REQUIRED_ELOCK_FIELDS
                .iter()
                .copied()
                .filter(|field| !elock.contains_key(*field))
                .collect();

            if !missing.is_empty() {
                return Err(CommandError::InvalidCommand(format!(
                    "elockCommand is missing required fields: {}",
                    missing.join(", ")
                )));
            }
        }

        Ok(Self(value))
    }

    /// The wire `type`, or "unknown" when it is not a string.
    pub fn command_type(&self) -> &str {
        self.0
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Typed command request accepted by the action endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CommandAction {
    RequestLocation,
    SetLocationInterval { interval: i64 },
    Seal(LockActionParams),
    Unseal(LockActionParams),
    CancelAlarm(LockActionParams),
    Reboot,
    FactoryReset,
    SetHeartbeatInterval { interval: i64 },
    SetAlarmLocationInterval { interval: i64 },
    SetSleepLocationInterval { interval: i64 },
    EnableSleepMode,
    PowerOff,
}

/// Lock parameters of a typed seal/unseal/cancel-alarm request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockActionParams {
    pub lock_id: String,
    pub key: String,
    #[serde(default = "default_gate")]
    pub gate: i64,
}

fn default_gate() -> i64 {
    DEFAULT_LOCK_GATE
}

impl CommandAction {
    /// Builds the command, enforcing every parameter range.
    pub fn into_command(self) -> Result<Command, CommandError> {
        match self {
            CommandAction::RequestLocation => Ok(Command::RequestLocation),
            CommandAction::SetLocationInterval { interval } => {
                Command::set_location_interval(interval)
            }
            CommandAction::Seal(p) => Command::seal_lock(&p.lock_id, &p.key, p.gate),
            CommandAction::Unseal(p) => Command::unseal_lock(&p.lock_id, &p.key, p.gate),
            CommandAction::CancelAlarm(p) => Command::cancel_lock_alarm(&p.lock_id, &p.key, p.gate),
            CommandAction::Reboot => Ok(Command::Reboot),
            CommandAction::FactoryReset => Ok(Command::FactoryReset),
            CommandAction::SetHeartbeatInterval { interval } => {
                Command::set_heartbeat_interval(interval)
            }
            CommandAction::SetAlarmLocationInterval { interval } => {
                Command::set_alarm_location_interval(interval)
            }
            CommandAction::SetSleepLocationInterval { interval } => {
                Command::set_sleep_location_interval(interval)
            }
            CommandAction::EnableSleepMode => Ok(Command::EnableSleepMode),
            CommandAction::PowerOff => Ok(Command::PowerOff),
        }
    }
}

static LAST_BILL_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Generates a bill number from the current millisecond timestamp.
///
/// Values are strictly increasing within the process: when two calls land in
/// the same millisecond the later one is bumped past the previous value.
pub fn generate_bill_number() -> String {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_BILL_MILLIS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(previous + 1).to_string()
}

/// Generates a 4-character uppercase hexadecimal sequence number.
pub fn generate_sequence_number() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    (0..SEQUENCE_LENGTH)
        .map(|_| SEQUENCE_ALPHABET[rng.gen_range(0..SEQUENCE_ALPHABET.len())] as char)
        .collect()
}
