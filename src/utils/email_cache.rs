use moka::future::Cache;
use std::time::Duration;

/// true  => email is TAKEN
/// false => email is AVAILABLE (usually we store only taken)
pub struct EmailCache {
    cache: Cache<String, bool>,
}

impl Default for EmailCache {
    fn default() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(500_000) // tune based on memory
                .time_to_live(Duration::from_secs(86400)) // 24h TTL
                .build(),
        }
    }
}

impl EmailCache {
    /// Mark a single email as taken
    pub async fn mark_taken(&self, email: &str) {
        self.cache.insert(email.to_lowercase(), true).await;
    }

    /// Check if email is taken
    pub async fn is_taken(&self, email: &str) -> bool {
        self.cache
            .get(&email.to_lowercase())
            .await
            .unwrap_or(false)
    }

    /// Batch mark emails as taken
    pub async fn batch_mark(&self, emails: &[String]) {
        let futures: Vec<_> = emails
            .iter()
            .map(|e| self.cache.insert(e.to_lowercase(), true))
            .collect();

        // Await all insertions concurrently
        futures::future::join_all(futures).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn batch_marked_emails_are_taken() {
        let cache = EmailCache::default();
        cache
            .batch_mark(&["a@x.io".to_string(), "B@x.io".to_string()])
            .await;

        assert!(cache.is_taken("a@x.io").await);
        assert!(cache.is_taken("b@x.io").await);
        assert!(!cache.is_taken("c@x.io").await);
    }
}
