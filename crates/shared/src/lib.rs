//! Shared utilities and common types for the fleet gateway.
//!
//! This crate provides common functionality used across all other crates:
//! - Validation rules for device identifiers, lock parameters and intervals
//! - JWT access token validation

pub mod jwt;
pub mod validation;
