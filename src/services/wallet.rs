//! Account registration, login and balance transfers

use crate::common::traits::Ledger;
use crate::common::types::{NewUser, User};
use crate::errors::{WalletError, WalletResult};
use crate::services::auth::AuthService;
use crate::transaction::{TxRunner, TxScope};
use std::sync::Arc;
use tracing::{debug, info};

/// Registration request with the raw password
#[derive(Clone, Debug, Default)]
pub struct Registration {
    pub login: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub balance: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Transfer {
    Deposit,
    Withdraw,
}

impl Transfer {
    fn as_str(self) -> &'static str {
        match self {
            Transfer::Deposit => "deposit",
            Transfer::Withdraw => "withdraw",
        }
    }
}

#[derive(Clone)]
pub struct WalletService {
    ledger: Arc<dyn Ledger>,
    auth: AuthService,
    runner: TxRunner,
}

impl WalletService {
    pub fn new(ledger: Arc<dyn Ledger>, auth: AuthService, runner: TxRunner) -> Self {
        Self { ledger, auth, runner }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub async fn register(&self, registration: Registration) -> WalletResult<User> {
        let Registration {
            login,
            password,
            first_name,
            last_name,
            balance,
        } = registration;

        if login.trim().is_empty() {
            return Err(WalletError::InvalidInput("login must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(WalletError::InvalidInput("password must not be empty".to_string()));
        }
        if balance < 0 {
            return Err(WalletError::InvalidAmount(balance));
        }

        let password_hash = self.auth.hash_password(&password).await?;
        let user = self
            .ledger
            .create_user(
                &mut TxScope::new(),
                NewUser {
                    login,
                    password_hash,
                    first_name,
                    last_name,
                    balance,
                },
            )
            .await?;

        info!(login = %user.login, user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn get_user_by_login(&self, login: &str) -> WalletResult<User> {
        self.ledger
            .find_user(&mut TxScope::new(), login)
            .await?
            .ok_or_else(|| WalletError::UserNotFound {
                login: login.to_string(),
            })
    }

    /// Check the password and issue a bearer token.
    pub async fn login(&self, login: &str, password: &str) -> WalletResult<String> {
        let user = self.get_user_by_login(login).await?;
        if !self.auth.verify_password(&user.password_hash, password).await? {
            debug!(login = %login, "password mismatch");
            return Err(WalletError::InvalidCredentials);
        }
        self.auth.issue_token(login)
    }

    /// Resolve a bearer token to its account.
    pub async fn authenticate(&self, token: &str) -> WalletResult<User> {
        let login = self.auth.login_from_token(token)?;
        self.get_user_by_login(&login).await
    }

    pub async fn deposit(&self, login: &str, amount: i64) -> WalletResult<i64> {
        self.transfer(login, amount, Transfer::Deposit).await
    }

    pub async fn withdraw(&self, login: &str, amount: i64) -> WalletResult<i64> {
        self.transfer(login, amount, Transfer::Withdraw).await
    }

    async fn transfer(&self, login: &str, amount: i64, kind: Transfer) -> WalletResult<i64> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let ledger = self.ledger.clone();
        let owned_login = login.to_string();

        let balance = self
            .runner
            .run(&mut TxScope::new(), move |scope| {
                Box::pin(async move {
                    let login = owned_login;
                    let current = ledger.get_balance(scope, &login).await?;

                    let updated = match kind {
                        Transfer::Deposit => current.checked_add(amount),
                        Transfer::Withdraw if amount > current => {
                            return Err(WalletError::InsufficientFunds {
                                balance: current,
                                requested: amount,
                            })
                        }
                        Transfer::Withdraw => current.checked_sub(amount),
                    }
                    .ok_or_else(|| WalletError::BalanceOverflow { login: login.clone() })?;

                    ledger.set_balance(scope, &login, updated).await?;
                    Ok::<_, WalletError>(updated)
                })
            })
            .await?;

        info!(login = %login, amount, balance, operation = kind.as_str(), "funds transferred");
        Ok(balance)
    }
}
