use crate::state::StateContainer;
use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// In-memory side of the auth state: revoked session/token ids and the
/// state container of every live session.
pub struct SessionRegistry {
    /// sid or refresh-token jti => revoked
    revoked: Cache<String, ()>,
    states: Cache<String, Arc<StateContainer>>,
}

impl SessionRegistry {
    /// `ttl_secs` must outlive the longest token so a revocation cannot
    /// expire before the token it revokes.
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            revoked: Cache::builder()
                .max_capacity(1_000_000)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
            states: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(Duration::from_secs(ttl_secs))
                .build(),
        }
    }

    pub async fn revoke(&self, id: &str) {
        self.revoked.insert(id.to_string(), ()).await;
    }

    pub async fn is_revoked(&self, id: &str) -> bool {
        self.revoked.contains_key(id)
    }

    pub async fn attach(&self, sid: &str, state: Arc<StateContainer>) {
        self.states.insert(sid.to_string(), state).await;
    }

    pub async fn state(&self, sid: &str) -> Option<Arc<StateContainer>> {
        self.states.get(sid).await
    }

    /// Returns the session's container, building it with `init` when the
    /// session has none yet (e.g. after a restart). A `None` from `init` is
    /// not cached, so the next call tries again.
    pub async fn state_or_init(
        &self,
        sid: &str,
        init: impl Future<Output = Option<Arc<StateContainer>>>,
    ) -> Option<Arc<StateContainer>> {
        self.states.optionally_get_with(sid.to_string(), init).await
    }

    pub async fn detach(&self, sid: &str) {
        self.states.invalidate(sid).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn init_runs_only_for_unknown_sessions() {
        let registry = SessionRegistry::new(60);
        let known = Arc::new(StateContainer::default());
        registry.attach("s1", known.clone()).await;

        let got = registry
            .state_or_init("s1", async { Some(Arc::new(StateContainer::default())) })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&got, &known));

        registry.detach("s1").await;
        let rebuilt = registry
            .state_or_init("s1", async { Some(Arc::new(StateContainer::default())) })
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&rebuilt, &known));
    }

    #[actix_web::test]
    async fn failed_init_is_retried() {
        let registry = SessionRegistry::new(60);

        let missed = registry.state_or_init("s1", async { None }).await;
        assert!(missed.is_none());
        assert!(registry.state("s1").await.is_none());

        let built = registry
            .state_or_init("s1", async { Some(Arc::new(StateContainer::default())) })
            .await;
        assert!(built.is_some());
        assert!(registry.state("s1").await.is_some());
    }

    #[actix_web::test]
    async fn revocation_is_remembered() {
        let registry = SessionRegistry::new(60);
        assert!(!registry.is_revoked("s1").await);
        registry.revoke("s1").await;
        assert!(registry.is_revoked("s1").await);
    }
}
