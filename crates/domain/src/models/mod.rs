//! Domain models for the fleet gateway.

pub mod alert;
pub mod command;
pub mod device;
pub mod location;
pub mod telemetry;
pub mod user;

pub use alert::{AlertCategory, AlertEvent, AlertSeverity, AlertStatus};
pub use command::{Command, CommandAction, CommandError, LockCommandPayload, ValidatedCommand};
pub use device::{DeviceHealthUpdate, DeviceIdentifier, DeviceType, NewTrackerDevice, TrackerDevice};
pub use location::{GpsFix, LastFix, NewGpsFix};
pub use telemetry::{IngestError, IngestResult, TelemetryBatch, WebhookHeaders};
pub use user::UserRole;
