//! Password hashing and bearer tokens

use crate::config::AuthConfig;
use crate::errors::{WalletError, WalletResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    login: String,
    exp: i64,
}

#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_ttl: Duration::from_secs(config.token_ttl_secs),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    /// bcrypt is CPU-bound; run it off the async workers.
    pub async fn hash_password(&self, password: &str) -> WalletResult<String> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| WalletError::Auth(format!("hashing task failed: {}", e)))?
            .map_err(|e| WalletError::Auth(format!("failed to hash password: {}", e)))
    }

    /// A malformed hash counts as a mismatch; the cause is logged.
    pub async fn verify_password(&self, hash: &str, password: &str) -> WalletResult<bool> {
        let hash = hash.to_string();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| WalletError::Auth(format!("verification task failed: {}", e)))?;

        match verified {
            Ok(matches) => Ok(matches),
            Err(e) => {
                error!(error = %e, "failed to validate password hash");
                Ok(false)
            }
        }
    }

    pub fn issue_token(&self, login: &str) -> WalletResult<String> {
        let exp = chrono::Utc::now().timestamp() + self.token_ttl.as_secs() as i64;
        let claims = Claims {
            login: login.to_string(),
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| WalletError::Auth(format!("failed to sign token: {}", e)))
    }

    /// Login named by a valid, unexpired token
    pub fn login_from_token(&self, token: &str) -> WalletResult<String> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| WalletError::Auth(format!("invalid token: {}", e)))?;
        Ok(data.claims.login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> AuthService {
        AuthService::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            token_ttl_secs: 3600,
            bcrypt_cost: 4,
        })
    }

    #[tokio::test]
    async fn test_password_hash_verifies() {
        let auth = service("secret");
        let hash = auth.hash_password("hunter2").await.unwrap();

        assert_ne!(hash, "hunter2");
        assert!(auth.verify_password(&hash, "hunter2").await.unwrap());
        assert!(!auth.verify_password(&hash, "hunter3").await.unwrap());
        assert!(!auth.verify_password("not-a-hash", "hunter2").await.unwrap());
    }

    #[test]
    fn test_token_carries_login() {
        let auth = service("secret");
        let token = auth.issue_token("alice").unwrap();
        assert_eq!(auth.login_from_token(&token).unwrap(), "alice");
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = service("one").issue_token("alice").unwrap();
        assert!(matches!(service("two").login_from_token(&token), Err(WalletError::Auth(_))));
        assert!(service("one").login_from_token("garbage").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = service("secret");
        let claims = Claims {
            login: "alice".to_string(),
            exp: chrono::Utc::now().timestamp() - 3_600,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &auth.encoding_key).unwrap();
        assert!(auth.login_from_token(&token).is_err());
    }
}
