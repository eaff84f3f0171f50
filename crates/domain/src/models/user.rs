//! Operator roles carried in access tokens.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Fisherman,
    Organization,
    Admin,
}

impl UserRole {
    /// Organization and admin operators may act on devices they do not own.
    pub fn is_privileged(&self) -> bool {
        matches!(self, UserRole::Organization | UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fisherman" => Ok(UserRole::Fisherman),
            "organization" => Ok(UserRole::Organization),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}
