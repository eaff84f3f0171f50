//! Persistence layer for the fleet gateway.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repositories implementing the domain storage traits

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
