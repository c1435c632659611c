//! Shared application backend: the document store, the auth gateway and
//! the clock, plus access to per-session state.

use crate::{
    auth::{auth::AuthUser, gateway::AuthGateway, provider::AuthProvider},
    clock::Clock,
    config::Config,
    model::role::Role,
    state::{Actions, StateContainer},
    store::DocumentStore,
    utils::email_filter::normalize,
};
use std::sync::Arc;
use tracing::warn;

pub struct Backend {
    pub store: Arc<dyn DocumentStore>,
    pub auth: AuthGateway,
    pub clock: Arc<dyn Clock>,
    admin_emails: Vec<String>,
}

impl Backend {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn AuthProvider>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            auth: AuthGateway::new(provider, config),
            clock,
            admin_emails: config.admin_emails.clone(),
        }
    }

    pub fn role_for(&self, email: &str) -> Role {
        if self.admin_emails.contains(&normalize(email)) {
            Role::Admin
        } else {
            Role::Employee
        }
    }

    pub fn actions<'a>(&'a self, state: &'a StateContainer) -> Actions<'a> {
        Actions::new(self, state)
    }

    /// State container of the caller's session, rebuilt from the user
    /// document when the session has none in memory. If the document cannot
    /// be loaded, an empty container is returned for this request only and
    /// the next request loads again.
    pub async fn session_state(&self, user: &AuthUser) -> Arc<StateContainer> {
        let cached = self
            .auth
            .sessions()
            .state_or_init(&user.sid, async {
                let state = Arc::new(StateContainer::default());
                self.actions(&state).fetch_user_data(&user.uid).await?;
                Some(state)
            })
            .await;

        cached.unwrap_or_else(|| {
            warn!(uid = %user.uid, sid = %user.sid, "Session state not rebuilt; will retry");
            Arc::new(StateContainer::default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::provider::StoreAuthProvider,
        clock::FixedClock,
        models::SignupReq,
        store::{Collection, Document, MemoryStore, StoreError, WriteOp},
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose next `get` fails once when armed.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_next_get: AtomicBool,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
            if self.fail_next_get.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            self.inner.get(collection, id).await
        }

        async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
            self.inner.list(collection).await
        }

        async fn query(
            &self,
            collection: Collection,
            field: &str,
            value: &Value,
        ) -> Result<Vec<Document>, StoreError> {
            self.inner.query(collection, field, value).await
        }

        async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
            self.inner.commit(ops).await
        }
    }

    #[actix_web::test]
    async fn store_hiccup_does_not_stick_to_the_session() {
        let flaky = Arc::new(FlakyStore::default());
        let store: Arc<dyn DocumentStore> = flaky.clone();
        let provider = Arc::new(StoreAuthProvider::new(store.clone()));
        let clock = Arc::new(FixedClock::at("2026-03-02T09:00:00+01:00"));
        let backend = Backend::new(store, provider, clock, &Config::for_tests());

        let signup_state = StateContainer::default();
        let signed = backend
            .actions(&signup_state)
            .signup(&SignupReq {
                name: "Ada Lovelace".to_string(),
                department: "Engineering".to_string(),
                email: "ada@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .await
            .unwrap();

        // a session whose container is not in memory, as after a restart
        let caller = AuthUser {
            uid: signed.user.uid.clone(),
            email: signed.user.email.clone(),
            role: signed.user.role,
            sid: "restarted-session".to_string(),
        };

        flaky.fail_next_get.store(true, Ordering::SeqCst);
        let first = backend.session_state(&caller).await;
        assert!(first.user().is_none());

        let second = backend.session_state(&caller).await;
        assert_eq!(second.user().map(|u| u.uid), Some(signed.user.uid.clone()));
        assert!(backend.actions(&second).record_in_time().await.is_ok());

        let third = backend.session_state(&caller).await;
        assert!(Arc::ptr_eq(&second, &third));
    }
}
