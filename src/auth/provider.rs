//! Email/password identity provider.

use crate::{
    auth::password::{hash_password, verify_password},
    model::credential::Credential,
    store::{Collection, DocumentStore, StoreError, to_fields},
    utils::{
        email_cache::EmailCache,
        email_filter::{EmailFilter, normalize},
    },
};
use async_trait::async_trait;
use chrono::Utc;
use derive_more::Display;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;
const RESET_CODE_TTL_SECS: i64 = 3600;
/// Credentials are keyed by email; the MySQL id column is VARCHAR(128).
const MAX_EMAIL_LEN: usize = 128;

#[derive(Debug, Display)]
pub enum AuthError {
    #[display(fmt = "Invalid credentials")]
    InvalidCredentials,
    #[display(fmt = "Email already in use")]
    EmailInUse,
    #[display(fmt = "Invalid email address")]
    InvalidEmail,
    #[display(fmt = "Password must be at least 6 characters")]
    WeakPassword,
    #[display(fmt = "Invalid or expired reset code")]
    InvalidResetCode,
    #[display(fmt = "Invalid or expired token")]
    InvalidToken,
    #[display(fmt = "Password hashing failed: {}", _0)]
    Hash(String),
    #[display(fmt = "Token signing failed: {}", _0)]
    Signing(String),
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::Store(e)
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AuthError::Hash(e.to_string())
    }
}

/// Identity returned by the provider after sign-up or sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthAccount {
    pub uid: String,
    pub email: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError>;

    /// Issues a one-time reset code. Unknown emails yield `None` so callers
    /// cannot probe which addresses are registered.
    async fn send_password_reset(&self, email: &str) -> Result<Option<String>, AuthError>;

    async fn confirm_password_reset(&self, code: &str, new_password: &str) -> Result<(), AuthError>;
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(AuthError::InvalidEmail);
    }

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.') =>
        {
            Ok(())
        }
        _ => Err(AuthError::InvalidEmail),
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// Keeps credentials in the `credentials` collection, keyed by normalized
/// email so that two sign-ups for one address cannot both succeed.
pub struct StoreAuthProvider {
    store: Arc<dyn DocumentStore>,
    filter: EmailFilter,
    cache: EmailCache,
}

impl StoreAuthProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            filter: EmailFilter::default(),
            cache: EmailCache::default(),
        }
    }

    /// true  => email AVAILABLE
    /// false => email TAKEN
    pub async fn is_email_available(&self, email: &str) -> Result<bool, AuthError> {
        let email = normalize(email);

        // 1️⃣ Cuckoo filter: fast negative
        if !self.filter.might_exist(&email) {
            return Ok(true);
        }

        // 2️⃣ Moka cache: fast positive
        if self.cache.is_taken(&email).await {
            return Ok(false);
        }

        // 3️⃣ Store fallback
        let exists = self.store.get(Collection::Credentials, &email).await?.is_some();
        if exists {
            self.cache.mark_taken(&email).await;
        }
        Ok(!exists)
    }

    /// Loads every registered email into the filter and cache.
    pub async fn warmup(&self, batch_size: usize) -> anyhow::Result<()> {
        let docs = self.store.list(Collection::Credentials).await?;
        let total = docs.len();

        for chunk in docs.chunks(batch_size.max(1)) {
            let emails: Vec<String> = chunk.iter().map(|d| normalize(&d.id)).collect();
            self.filter.insert_batch(&emails);
            self.cache.batch_mark(&emails).await;
        }

        log::info!("Email filter warmup complete: {} credentials", total);
        Ok(())
    }

    async fn credential(&self, email: &str) -> Result<Option<Credential>, AuthError> {
        match self.store.get(Collection::Credentials, email).await? {
            Some(doc) => Ok(Some(doc.into_model("email")?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuthProvider for StoreAuthProvider {
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        let email = normalize(email);
        validate_email(&email)?;
        validate_password(password)?;

        if !self.is_email_available(&email).await? {
            return Err(AuthError::EmailInUse);
        }

        let credential = Credential {
            uid: Uuid::new_v4().to_simple().to_string(),
            email: email.clone(),
            password_hash: hash_password(password)?,
            created_at: Utc::now().to_rfc3339(),
            reset_code: None,
            reset_expires: None,
        };

        // the id doubles as the uniqueness constraint on the email
        match self
            .store
            .create(
                Collection::Credentials,
                &email,
                to_fields(&credential, "email")?,
            )
            .await
        {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => return Err(AuthError::EmailInUse),
            Err(e) => return Err(e.into()),
        }

        self.filter.insert(&email);
        self.cache.mark_taken(&email).await;

        debug!(uid = %credential.uid, "Credential created");

        Ok(AuthAccount {
            uid: credential.uid,
            email,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        let email = normalize(email);

        let credential = match self.credential(&email).await? {
            Some(c) => c,
            None => {
                info!("Invalid credentials: email not registered");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if let Err(e) = verify_password(password, &credential.password_hash) {
            info!(error = %e, "Invalid credentials: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(AuthAccount {
            uid: credential.uid,
            email,
        })
    }

    async fn send_password_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        let email = normalize(email);

        if self.credential(&email).await?.is_none() {
            debug!("Password reset requested for unknown email");
            return Ok(None);
        }

        let code = Uuid::new_v4().to_simple().to_string();
        let expires = Utc::now().timestamp() + RESET_CODE_TTL_SECS;

        let mut patch = serde_json::Map::new();
        patch.insert("resetCode".to_string(), json!(code));
        patch.insert("resetExpires".to_string(), json!(expires));
        self.store
            .update(Collection::Credentials, &email, patch)
            .await?;

        // no mail transport; the code is delivered through the log
        info!(email = %email, reset_code = %code, "Password reset code issued");

        Ok(Some(code))
    }

    async fn confirm_password_reset(&self, code: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;

        let doc = self
            .store
            .query(Collection::Credentials, "resetCode", &Value::String(code.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or(AuthError::InvalidResetCode)?;

        let email = doc.id.clone();
        let credential: Credential = doc.into_model("email")?;

        let expired = credential
            .reset_expires
            .map_or(true, |exp| exp < Utc::now().timestamp());
        if expired {
            warn!(email = %email, "Expired password reset code used");
            return Err(AuthError::InvalidResetCode);
        }

        let mut patch = serde_json::Map::new();
        patch.insert("passwordHash".to_string(), json!(hash_password(new_password)?));
        patch.insert("resetCode".to_string(), Value::Null);
        patch.insert("resetExpires".to_string(), Value::Null);
        self.store
            .update(Collection::Credentials, &email, patch)
            .await?;

        info!(email = %email, "Password reset completed");
        Ok(())
    }
}
