//! HTTP route handlers.

pub mod commands;
pub mod devices;
pub mod health;
pub mod webhooks;
