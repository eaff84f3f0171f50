//! Outbound integrations.

pub mod vendor;

pub use vendor::VendorClient;
