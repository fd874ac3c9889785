//! API request and response models

use crate::common::types::{SpinRecord, User};
use crate::services::{Registration, SpinReceipt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Initial balance in cents
    #[serde(default)]
    pub balance: i64,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            login: req.login,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            balance: req.balance,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Account as shown to its owner; never includes the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub login: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: i64,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            login: user.login,
            first_name: user.first_name,
            last_name: user.last_name,
            balance: user.balance,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletRequest {
    /// Amount in cents
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletResponse {
    pub balance: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpinRequest {
    pub bet_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinResponse {
    pub balance: i64,
    pub result: String,
    pub combination: String,
}

impl From<SpinReceipt> for SpinResponse {
    fn from(receipt: SpinReceipt) -> Self {
        Self {
            balance: receipt.balance,
            result: receipt.spin.result.to_string(),
            combination: receipt.spin.combination,
        }
    }
}

/// Raw query values; anything unparsable falls back to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub combination: String,
    pub spin_result: String,
    pub bet_amount: i64,
    pub win_amount: i64,
    pub created_at: DateTime<Utc>,
}

impl From<SpinRecord> for SpinView {
    fn from(spin: SpinRecord) -> Self {
        Self {
            id: spin.id,
            user_id: spin.user_id,
            combination: spin.combination,
            spin_result: spin.result.to_string(),
            bet_amount: spin.bet_amount,
            win_amount: spin.win_amount,
            created_at: spin.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinHistoryResponse {
    pub results: Vec<SpinView>,
}
