//! Error types for the wallet-and-spin engine
//!
//! Business outcomes (`UserNotFound`, `InsufficientFunds`, ...) are typed so
//! callers can branch on them. Everything coming out of the persistence layer
//! is a `StoreError`, wrapped with the operation name and login once it
//! crosses into the wallet layer.

use thiserror::Error;

/// Failures raised by the transactional store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rocksdb::Error,
    },

    #[error("{op} failed: {source}")]
    Backend {
        op: &'static str,
        #[source]
        source: rocksdb::Error,
    },

    #[error("failed to decode or encode {what}: {reason}")]
    Codec { what: &'static str, reason: String },

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("timed out after {waited_ms}ms waiting for row lock on {key}")]
    LockTimeout { key: String, waited_ms: u64 },

    #[error("transaction exceeded its {ms}ms deadline")]
    Deadline { ms: u64 },

    #[error("no transaction is active in this scope")]
    NoTransaction,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Timeouts are transient; the same request may succeed on retry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::LockTimeout { .. } | StoreError::Deadline { .. })
    }

    /// Attach the wallet operation and login this failure happened under.
    pub fn context(self, op: &'static str, login: &str) -> WalletError {
        WalletError::Store {
            context: format!("{} for {:?}", op, login),
            source: self,
        }
    }
}

/// Failures of wallet, account and game operations
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("user {login:?} not found")]
    UserNotFound { login: String },

    #[error("user {login:?} already exists")]
    UserAlreadyExists { login: String },

    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    #[error("invalid bet amount {0}: bet amount must be positive")]
    InvalidBetAmount(i64),

    #[error("invalid amount {0}: amount must be positive")]
    InvalidAmount(i64),

    #[error("invalid login or password")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidInput(String),

    #[error("balance of {login:?} would overflow")]
    BalanceOverflow { login: String },

    #[error("failed to generate combination: {0}")]
    Entropy(String),

    #[error("credential processing failed: {0}")]
    Auth(String),

    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },
}

impl WalletError {
    /// Business-rule outcomes the caller is expected to branch on, as
    /// opposed to infrastructure failures.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            WalletError::UserNotFound { .. }
                | WalletError::UserAlreadyExists { .. }
                | WalletError::InsufficientFunds { .. }
                | WalletError::InvalidBetAmount(_)
                | WalletError::InvalidAmount(_)
                | WalletError::InvalidCredentials
                | WalletError::InvalidInput(_)
        )
    }

    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            WalletError::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<StoreError> for WalletError {
    fn from(e: StoreError) -> Self {
        WalletError::Store {
            context: "transaction".to_string(),
            source: e,
        }
    }
}

/// Convenience type alias for Results
pub type WalletResult<T> = Result<T, WalletError>;
pub type StoreResult<T> = Result<T, StoreError>;
