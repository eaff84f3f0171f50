//! Domain services for the fleet gateway.
//!
//! Services contain the protocol logic that operates on domain models.

pub mod alerting;
pub mod descriptor;
pub mod dispatch;
pub mod ingest;
pub mod memory;
pub mod normalizer;
pub mod store;

pub use alerting::{classify_cmd_type, derive_alert};
pub use descriptor::{parse_descriptors, DescriptorReadings};
pub use dispatch::{
    classify_vendor_response, vendor_envelope, CommandDispatcher, DispatchError,
    MockCommandDispatcher, SentCommand,
};
pub use ingest::TelemetryIngestor;
pub use memory::InMemoryStore;
pub use normalizer::{normalize, Normalized, NormalizedUpdate, SkipReason};
pub use store::{AlertSink, DeviceRegistry, LocationStore, SessionTracker, StoreError};
