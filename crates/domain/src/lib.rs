//! Domain layer for the fleet gateway.
//!
//! This crate contains:
//! - Domain models (commands, devices, fixes, alerts, telemetry payloads)
//! - The telemetry ingestion pipeline and alert derivation
//! - Collaborator traits for storage and command dispatch

pub mod models;
pub mod services;
