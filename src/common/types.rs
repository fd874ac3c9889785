//! Shared type definitions for accounts and spin history
//!
//! These are the records persisted by the store and handed back to callers.

use crate::games::SpinOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered account holding a balance in minor currency units (cents)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Unique, immutable after creation
    pub login: String,
    /// bcrypt hash, never the raw password
    pub password_hash: String,
    pub balance: i64,
}

/// Account data supplied at registration, password already hashed
#[derive(Clone, Debug)]
pub struct NewUser {
    pub login: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: i64,
}

impl NewUser {
    /// Assign a fresh identity
    pub fn into_user(self) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: self.first_name,
            last_name: self.last_name,
            login: self.login,
            password_hash: self.password_hash,
            balance: self.balance,
        }
    }
}

/// One persisted spin. Immutable once written.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpinRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Textual form `"a,b,c"`
    pub combination: String,
    pub result: SpinOutcome,
    pub bet_amount: i64,
    /// Negative when the bet was lost
    pub win_amount: i64,
    /// Assigned by the store at insert
    pub created_at: DateTime<Utc>,
}

/// Spin data before the store assigns id and timestamp
#[derive(Clone, Debug)]
pub struct NewSpin {
    pub user_id: Uuid,
    pub combination: String,
    pub result: SpinOutcome,
    pub bet_amount: i64,
    pub win_amount: i64,
}

/// Limit/offset window over newest-first history
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub const DEFAULT_LIMIT: usize = 100;
    pub const MAX_LIMIT: usize = 1_000;

    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit: limit.min(Self::MAX_LIMIT),
            offset,
        }
    }

    /// Lenient construction from query parameters: missing or non-positive
    /// values fall back to the defaults.
    pub fn from_query(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l >= 1 => l as usize,
            _ => Self::DEFAULT_LIMIT,
        };
        let offset = match offset {
            Some(o) if o >= 1 => o as usize,
            _ => 0,
        };
        Self::new(limit, offset)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}
