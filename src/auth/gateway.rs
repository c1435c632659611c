//! Auth gateway: wraps the provider and turns accounts into sessions.

use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        provider::{AuthAccount, AuthError, AuthProvider},
        session::SessionRegistry,
    },
    config::Config,
    model::role::Role,
    models::TokenType,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

/// Tokens of one login. Every token carries the same session id.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Session {
    #[serde(skip)]
    pub sid: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthGateway {
    provider: Arc<dyn AuthProvider>,
    sessions: SessionRegistry,
    jwt_secret: String,
    access_token_ttl: usize,
    refresh_token_ttl: usize,
}

impl AuthGateway {
    pub fn new(provider: Arc<dyn AuthProvider>, config: &Config) -> Self {
        Self {
            provider,
            sessions: SessionRegistry::new(config.refresh_token_ttl as u64),
            jwt_secret: config.jwt_secret.clone(),
            access_token_ttl: config.access_token_ttl,
            refresh_token_ttl: config.refresh_token_ttl,
        }
    }

    pub fn provider(&self) -> &dyn AuthProvider {
        self.provider.as_ref()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub async fn create_account(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        self.provider.create_user(email, password).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthAccount, AuthError> {
        self.provider.sign_in(email, password).await
    }

    /// Starts a new session for an authenticated account.
    pub fn open_session(&self, account: &AuthAccount, role: Role) -> Result<Session, AuthError> {
        let sid = Uuid::new_v4().to_string();
        self.issue(&account.uid, &account.email, role.id(), &sid)
    }

    fn issue(&self, uid: &str, email: &str, role: u8, sid: &str) -> Result<Session, AuthError> {
        let access_token = generate_access_token(
            uid,
            email,
            role,
            sid,
            &self.jwt_secret,
            self.access_token_ttl,
        )
        .map_err(|e| AuthError::Signing(e.to_string()))?;

        let (refresh_token, _) = generate_refresh_token(
            uid,
            email,
            role,
            sid,
            &self.jwt_secret,
            self.refresh_token_ttl,
        )
        .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(Session {
            sid: sid.to_string(),
            access_token,
            refresh_token,
        })
    }

    /// Trades a refresh token for a new pair in the same session. The old
    /// refresh token is revoked.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let claims =
            verify_token(refresh_token, &self.jwt_secret).map_err(|_| AuthError::InvalidToken)?;

        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidToken);
        }

        if self.sessions.is_revoked(&claims.sid).await || self.sessions.is_revoked(&claims.jti).await {
            debug!(sid = %claims.sid, "Refresh with revoked token");
            return Err(AuthError::InvalidToken);
        }

        // 🔥 revoke old refresh token
        self.sessions.revoke(&claims.jti).await;

        self.issue(&claims.sub, &claims.email, claims.role, &claims.sid)
    }

    /// Session id of any valid token, access or refresh.
    pub fn session_id(&self, token: &str) -> Option<String> {
        verify_token(token, &self.jwt_secret).ok().map(|claims| claims.sid)
    }

    /// Ends the session: its tokens stop passing [`Self::current_user`].
    pub async fn sign_out(&self, sid: &str) {
        self.sessions.revoke(sid).await;
        self.sessions.detach(sid).await;
        info!(sid = %sid, "Session signed out");
    }

    /// Auth state for an access token, evaluated fresh on every call.
    pub async fn current_user(&self, access_token: &str) -> Result<AuthUser, String> {
        let claims = verify_token(access_token, &self.jwt_secret)?;

        if claims.token_type != TokenType::Access {
            return Err("Access token required".to_string());
        }

        if self.sessions.is_revoked(&claims.sid).await {
            return Err("Session has been signed out".to_string());
        }

        let role = Role::from_id(claims.role).ok_or_else(|| "Invalid role".to_string())?;

        Ok(AuthUser {
            uid: claims.sub,
            email: claims.email,
            role,
            sid: claims.sid,
        })
    }
}
