//! Sweep orchestration: cache consultation, concurrent checks, history
//! logging, and alert recording.

use std::time::Duration;

use crate::cache::SlotCache;
use crate::check::{self, CheckOutcome, ServiceStatus};
use crate::db::Store;
use crate::gpu::{self, GpuSweep};
use crate::registry::Registry;

/// TTL for the service and GPU result caches, tracked independently.
pub const SWEEP_CACHE_TTL: Duration = Duration::from_secs(30);

/// Owns the target registry, the shared HTTP client, the two single-slot
/// caches, and the store. Sweeps always run to completion once started;
/// there is no cancellation from a disconnecting client.
pub struct Monitor {
    registry: Registry,
    client: reqwest::Client,
    store: Store,
    services_cache: SlotCache<Vec<CheckOutcome>>,
    gpu_cache: SlotCache<GpuSweep>,
}

impl Monitor {
    pub fn new(registry: Registry, store: Store) -> Self {
        Self::with_ttl(registry, store, SWEEP_CACHE_TTL)
    }

    pub fn with_ttl(registry: Registry, store: Store, ttl: Duration) -> Self {
        Self {
            registry,
            client: reqwest::Client::new(),
            store,
            services_cache: SlotCache::new(ttl),
            gpu_cache: SlotCache::new(ttl),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Current outcomes for all targets plus whether they came from cache.
    ///
    /// A cache miss triggers a full concurrent sweep; its outcomes are
    /// logged to history, checked for down transitions, cached, and
    /// returned.
    pub async fn services(&self) -> (Vec<CheckOutcome>, bool) {
        if let Some(cached) = self.services_cache.get().await {
            return (cached, true);
        }

        let results = check::check_all(&self.client, &self.registry).await;
        self.record_outcomes(&results);
        self.services_cache.put(results.clone()).await;
        (results, false)
    }

    /// Check a single target by id, bypassing the cache.
    pub async fn check_one(&self, id: &str) -> Option<CheckOutcome> {
        let target = self.registry.get(id)?;
        Some(check::check_target(&self.client, target).await)
    }

    /// Current GPU readings plus whether they came from cache.
    pub async fn gpu(&self) -> (GpuSweep, bool) {
        if let Some(cached) = self.gpu_cache.get().await {
            return (cached, true);
        }

        let sweep = gpu::read_gpu_readings().await;
        self.gpu_cache.put(sweep.clone()).await;
        (sweep, false)
    }

    /// History and alert writes are best-effort: a storage failure is
    /// logged and never aborts the sweep.
    fn record_outcomes(&self, results: &[CheckOutcome]) {
        for outcome in results {
            let previous = match self.store.last_status(&outcome.target_id) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("Failed to read last status for {}: {}", outcome.target_id, e);
                    None
                }
            };

            if let Err(e) = self.store.record_check(
                &outcome.target_id,
                outcome.status,
                outcome.response_time_ms,
            ) {
                tracing::warn!("Failed to log history for {}: {}", outcome.target_id, e);
            }

            // Alerts fire on the transition into down, not on every
            // down observation.
            if outcome.status == ServiceStatus::Down && previous != Some(ServiceStatus::Down) {
                let message = format!(
                    "{} is down: {}",
                    outcome.target_name,
                    outcome.error_detail.as_deref().unwrap_or("no response")
                );
                if let Err(e) = self.store.record_alert(
                    &outcome.target_id,
                    &outcome.target_name,
                    outcome.status,
                    &message,
                ) {
                    tracing::warn!("Failed to record alert for {}: {}", outcome.target_id, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::NamedTempFile;

    fn monitor() -> (NamedTempFile, Monitor) {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        (tmp, Monitor::new(Registry::new(vec![]), store))
    }

    fn outcome(status: ServiceStatus) -> CheckOutcome {
        CheckOutcome {
            target_id: "svc".to_string(),
            target_name: "Svc".to_string(),
            host: "10.0.0.1".to_string(),
            status,
            response_time_ms: 3,
            checked_at: Utc::now(),
            error_detail: None,
            status_code: None,
            extra: None,
        }
    }

    #[tokio::test]
    async fn sweep_is_cached_within_ttl() {
        let (_tmp, monitor) = monitor();

        let (first, cached) = monitor.services().await;
        assert!(first.is_empty());
        assert!(!cached);

        let (_, cached) = monitor.services().await;
        assert!(cached);
    }

    #[tokio::test]
    async fn expired_cache_triggers_a_fresh_sweep() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let monitor =
            Monitor::with_ttl(Registry::new(vec![]), store, Duration::from_millis(20));

        let (_, cached) = monitor.services().await;
        assert!(!cached);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let (_, cached) = monitor.services().await;
        assert!(!cached);
    }

    #[tokio::test]
    async fn alerts_fire_only_on_down_transition() {
        let (_tmp, monitor) = monitor();

        monitor.record_outcomes(&[outcome(ServiceStatus::Up)]);
        monitor.record_outcomes(&[outcome(ServiceStatus::Down)]);
        monitor.record_outcomes(&[outcome(ServiceStatus::Down)]);
        monitor.record_outcomes(&[outcome(ServiceStatus::Up)]);
        monitor.record_outcomes(&[outcome(ServiceStatus::Down)]);

        let alerts = monitor.store().recent_alerts(10).unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(monitor.store().history("svc", 24).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn first_down_observation_alerts_with_no_history() {
        let (_tmp, monitor) = monitor();
        monitor.record_outcomes(&[outcome(ServiceStatus::Down)]);
        assert_eq!(monitor.store().recent_alerts(10).unwrap().len(), 1);
    }
}
