//! Usage observations for a single product.

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::product::ProductName;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The number of user names does not match the in-use count.
    #[error("record claims {in_use} licenses in use but lists {users} users")]
    UserCountMismatch { in_use: u32, users: usize },
}

/// A timestamped snapshot of license grants for one product.
///
/// The user list always holds exactly `in_use` names; construction fails
/// otherwise. Names may repeat when one user holds several grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    product: ProductName,
    timestamp: NaiveDateTime,
    in_use: u32,
    users: Vec<String>,
}

impl UsageRecord {
    pub fn new(
        product: ProductName,
        timestamp: NaiveDateTime,
        in_use: u32,
        users: Vec<String>,
    ) -> Result<Self, ValidationError> {
        if usize::try_from(in_use).ok() != Some(users.len()) {
            return Err(ValidationError::UserCountMismatch {
                in_use,
                users: users.len(),
            });
        }
        Ok(Self {
            product,
            timestamp,
            in_use,
            users,
        })
    }

    pub const fn product(&self) -> &ProductName {
        &self.product
    }

    /// Local wall-clock time at which the report was collected.
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub const fn in_use(&self) -> u32 {
        self.in_use
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    /// Users joined with commas, the form used for storage.
    pub fn users_field(&self) -> String {
        self.users.join(",")
    }
}

/// Splits a stored comma-separated user field. An empty field means no users.
pub fn split_users(field: &str) -> Vec<String> {
    if field.is_empty() {
        return Vec::new();
    }
    field.split(',').map(str::to_string).collect()
}
