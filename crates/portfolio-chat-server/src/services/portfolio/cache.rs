use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::extractor::MarkupExtractor;
use super::snapshot::PortfolioSnapshot;
use super::source::{DocumentSource, FetchOutcome};
use crate::config::PortfolioConfig;
use crate::utils::error::FetchError;

/// Lazily refreshed snapshot of the remote portfolio page.
///
/// Refreshes are single-flight: callers that find the snapshot stale while
/// a refresh is running wait for it instead of fetching again. Fetch
/// failures never escape; the previous snapshot (or the fixed fallback)
/// stays in place.
pub struct PortfolioCache {
    source: Arc<dyn DocumentSource>,
    extractor: Arc<dyn MarkupExtractor>,
    config: PortfolioConfig,
    ttl: Duration,
    current: RwLock<Option<Arc<PortfolioSnapshot>>>,
    refresh_gate: Mutex<()>,
    refreshes: AtomicU64,
}

enum RefreshResult {
    Updated(PortfolioSnapshot),
    NotModified,
}

impl PortfolioCache {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        extractor: Arc<dyn MarkupExtractor>,
        config: PortfolioConfig,
    ) -> Self {
        let ttl = config.ttl();
        Self {
            source,
            extractor,
            config,
            ttl,
            current: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Current snapshot, or the fallback if nothing was ever installed.
    pub fn snapshot(&self) -> Arc<PortfolioSnapshot> {
        match self.current.read().as_ref() {
            Some(snapshot) => snapshot.clone(),
            None => Arc::new(PortfolioSnapshot::fallback(&self.config, Utc::now())),
        }
    }

    pub fn current(&self) -> Option<Arc<PortfolioSnapshot>> {
        self.current.read().clone()
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.current.read().as_ref() {
            Some(snapshot) => snapshot.is_stale(now, self.ttl),
            None => true,
        }
    }

    pub async fn ensure_fresh(&self) -> Arc<PortfolioSnapshot> {
        self.ensure_fresh_at(Utc::now()).await
    }

    pub async fn ensure_fresh_at(&self, now: DateTime<Utc>) -> Arc<PortfolioSnapshot> {
        let observed = self.refreshes.load(Ordering::Acquire);
        if !self.needs_refresh(now) {
            return self.snapshot();
        }

        let _gate = self.refresh_gate.lock().await;
        if self.refreshes.load(Ordering::Acquire) != observed {
            debug!("Portfolio refresh completed while waiting, reusing result");
            return self.snapshot();
        }

        self.refresh(now).await;
        self.refreshes.fetch_add(1, Ordering::Release);
        self.snapshot()
    }

    async fn refresh(&self, now: DateTime<Utc>) {
        let previous = self.current();
        let validator = previous.as_ref().and_then(|s| s.validator.clone());

        let next = match self.fetch(validator.as_deref(), now).await {
            Ok(RefreshResult::Updated(snapshot)) => {
                info!(
                    "Portfolio snapshot refreshed ({} skills, {} projects)",
                    snapshot.skills.len(),
                    snapshot.projects.len()
                );
                snapshot
            }
            Ok(RefreshResult::NotModified) => match previous {
                Some(prev) => PortfolioSnapshot {
                    fetched_at: now,
                    ..(*prev).clone()
                },
                None => PortfolioSnapshot::fallback(&self.config, now),
            },
            Err(e) => match previous {
                // fetched_at stays put, so the next stale caller retries.
                Some(_) => {
                    warn!("Portfolio refresh failed, keeping previous snapshot: {}", e);
                    return;
                }
                None => {
                    warn!("Portfolio refresh failed, installing fallback snapshot: {}", e);
                    PortfolioSnapshot::fallback(&self.config, now)
                }
            },
        };

        *self.current.write() = Some(Arc::new(next));
    }

    async fn fetch(&self, validator: Option<&str>, now: DateTime<Utc>) -> Result<RefreshResult, FetchError> {
        match self.source.fetch(validator).await? {
            FetchOutcome::NotModified => Ok(RefreshResult::NotModified),
            FetchOutcome::Modified { body, validator } => {
                let fields = self.extractor.extract(&body)?;
                Ok(RefreshResult::Updated(PortfolioSnapshot::from_extracted(
                    &self.config,
                    fields,
                    validator,
                    now,
                )))
            }
        }
    }

    pub fn stats(&self) -> PortfolioCacheStats {
        let current = self.current();
        PortfolioCacheStats {
            loaded: current.is_some(),
            fetched_at: current.as_ref().map(|s| s.fetched_at),
            has_validator: current.as_ref().is_some_and(|s| s.validator.is_some()),
            refresh_count: self.refreshes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioCacheStats {
    pub loaded: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub has_validator: bool,
    pub refresh_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::portfolio::extractor::HtmlExtractor;
    use chrono::Duration as ChronoDuration;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    const PAGE_V1: &str = "<html><body><span>Flutter</span><span>Dart</span><h3>Chat App</h3></body></html>";
    const PAGE_V2: &str = "<html><body><span>Python</span><h3>Weather project</h3></body></html>";

    /// Replays scripted outcomes and records the validators it was given.
    #[derive(Default)]
    struct ScriptedSource {
        outcomes: parking_lot::Mutex<VecDeque<Result<FetchOutcome, FetchError>>>,
        validators: parking_lot::Mutex<Vec<Option<String>>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(outcomes: Vec<Result<FetchOutcome, FetchError>>) -> Self {
            Self {
                outcomes: parking_lot::Mutex::new(outcomes.into()),
                ..Default::default()
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl DocumentSource for ScriptedSource {
        async fn fetch(&self, validator: Option<&str>) -> Result<FetchOutcome, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.validators.lock().push(validator.map(str::to_string));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or(Err(FetchError::Network("script exhausted".into())))
        }
    }

    fn modified(body: &str, etag: Option<&str>) -> Result<FetchOutcome, FetchError> {
        Ok(FetchOutcome::Modified {
            body: body.to_string(),
            validator: etag.map(str::to_string),
        })
    }

    fn cache_with(source: Arc<ScriptedSource>) -> PortfolioCache {
        let config = PortfolioConfig::default();
        PortfolioCache::new(source, Arc::new(HtmlExtractor::from_config(&config)), config)
    }

    #[tokio::test]
    async fn test_first_use_fetches_and_extracts() {
        let source = Arc::new(ScriptedSource::new(vec![modified(PAGE_V1, Some("\"v1\""))]));
        let cache = cache_with(source.clone());
        let t0 = Utc::now();

        let snapshot = cache.ensure_fresh_at(t0).await;
        assert_eq!(snapshot.skills, vec!["Flutter", "Dart"]);
        assert_eq!(snapshot.projects, vec!["Chat App"]);
        assert_eq!(snapshot.validator.as_deref(), Some("\"v1\""));
        assert_eq!(snapshot.fetched_at, t0);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_not_refetched() {
        let source = Arc::new(ScriptedSource::new(vec![modified(PAGE_V1, None)]));
        let cache = cache_with(source.clone());
        let t0 = Utc::now();

        cache.ensure_fresh_at(t0).await;
        cache.ensure_fresh_at(t0 + ChronoDuration::seconds(60)).await;
        cache.ensure_fresh_at(t0 + ChronoDuration::seconds(900)).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_replaced() {
        let source = Arc::new(ScriptedSource::new(vec![
            modified(PAGE_V1, Some("\"v1\"")),
            modified(PAGE_V2, Some("\"v2\"")),
        ]));
        let cache = cache_with(source.clone());
        let t0 = Utc::now();

        cache.ensure_fresh_at(t0).await;
        let later = t0 + ChronoDuration::seconds(901);
        let snapshot = cache.ensure_fresh_at(later).await;

        assert_eq!(snapshot.skills, vec!["Python"]);
        assert_eq!(snapshot.projects, vec!["Weather project"]);
        assert_eq!(snapshot.validator.as_deref(), Some("\"v2\""));
        assert_eq!(source.validators.lock()[1].as_deref(), Some("\"v1\""));
    }

    #[tokio::test]
    async fn test_not_modified_keeps_fields_and_advances_clock() {
        let source = Arc::new(ScriptedSource::new(vec![
            modified(PAGE_V1, Some("\"v1\"")),
            Ok(FetchOutcome::NotModified),
        ]));
        let cache = cache_with(source.clone());
        let t0 = Utc::now();

        let before = cache.ensure_fresh_at(t0).await;
        let t1 = t0 + ChronoDuration::seconds(1000);
        let after = cache.ensure_fresh_at(t1).await;

        assert_eq!(after.skills, before.skills);
        assert_eq!(after.projects, before.projects);
        assert_eq!(after.validator, before.validator);
        assert_eq!(after.fetched_at, t1);

        // Clock advanced, so no refetch right after the 304.
        cache.ensure_fresh_at(t1 + ChronoDuration::seconds(10)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_prior_snapshot_unchanged() {
        let source = Arc::new(ScriptedSource::new(vec![
            modified(PAGE_V1, Some("\"v1\"")),
            Err(FetchError::Timeout),
        ]));
        let cache = cache_with(source.clone());
        let t0 = Utc::now();

        let before = cache.ensure_fresh_at(t0).await;
        let after = cache.ensure_fresh_at(t0 + ChronoDuration::seconds(901)).await;

        assert_eq!(*after, *before);
    }

    #[tokio::test]
    async fn test_failed_refresh_is_retried_by_next_caller() {
        let source = Arc::new(ScriptedSource::new(vec![
            modified(PAGE_V1, Some("\"v1\"")),
            Err(FetchError::Timeout),
            modified(PAGE_V2, Some("\"v2\"")),
        ]));
        let cache = cache_with(source.clone());
        let t0 = Utc::now();

        cache.ensure_fresh_at(t0).await;
        let t1 = t0 + ChronoDuration::seconds(901);
        let kept = cache.ensure_fresh_at(t1).await;
        assert_eq!(kept.fetched_at, t0);

        let retried = cache.ensure_fresh_at(t1 + ChronoDuration::seconds(1)).await;
        assert_eq!(source.calls(), 3);
        assert_eq!(retried.skills, vec!["Python"]);
        assert_eq!(source.validators.lock()[2].as_deref(), Some("\"v1\""));
    }

    #[tokio::test]
    async fn test_failure_without_prior_installs_fallback() {
        let source = Arc::new(ScriptedSource::new(vec![Err(FetchError::Network("dns".into()))]));
        let cache = cache_with(source.clone());
        let t0 = Utc::now();

        let snapshot = cache.ensure_fresh_at(t0).await;
        assert_eq!(*snapshot, PortfolioSnapshot::fallback(&PortfolioConfig::default(), t0));
        assert!(cache.current().is_some());
    }

    #[tokio::test]
    async fn test_malformed_content_degrades() {
        let source = Arc::new(ScriptedSource::new(vec![modified("   ", Some("\"v1\""))]));
        let cache = cache_with(source.clone());
        let t0 = Utc::now();

        let snapshot = cache.ensure_fresh_at(t0).await;
        assert_eq!(snapshot.validator, None);
        assert_eq!(snapshot.skills, PortfolioConfig::default().fallback_skills);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let source = Arc::new(
            ScriptedSource::new(vec![modified(PAGE_V1, None), modified(PAGE_V2, None)])
                .with_delay(Duration::from_millis(50)),
        );
        let cache = Arc::new(cache_with(source.clone()));
        let t0 = Utc::now();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.ensure_fresh_at(t0).await })
            })
            .collect();

        for task in tasks {
            let snapshot = task.await.unwrap();
            assert_eq!(snapshot.skills, vec!["Flutter", "Dart"]);
        }
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.stats().refresh_count, 1);
    }

    #[test]
    fn test_snapshot_before_first_refresh_is_fallback() {
        let source = Arc::new(ScriptedSource::default());
        let cache = cache_with(source.clone());
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.name, "Mohamed Aarif A");
        assert!(cache.current().is_none());
        assert!(cache.needs_refresh(Utc::now()));
        assert_eq!(source.calls(), 0);
    }
}
