//! Repository implementations for database operations.
//!
//! Each repository implements one of the domain storage traits.

pub mod alert;
pub mod device;
pub mod location;
pub mod user;

pub use alert::AlertRepository;
pub use device::DeviceRepository;
pub use location::LocationRepository;
pub use user::UserRepository;

use domain::services::StoreError;

/// Maps a sqlx error into the storage error taxonomy.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => {
            tracing::error!(error = %err, "Database error");
            StoreError::Backend(err.to_string())
        }
    }
}
