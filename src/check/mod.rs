//! Service checkers for the monitored targets.
//!
//! Each checker turns a [`Target`] into a [`CheckOutcome`] within a bounded
//! time and never errors past this boundary: every failure mode is captured
//! as `status = down` with an error detail.

mod http;
mod inference;
mod ping;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::{ProtocolKind, Registry, Target};

/// Hard timeout for HTTP checks.
pub const HTTP_TIMEOUT: Duration = Duration::from_millis(5000);
/// Timeout for a single ICMP echo.
pub const PING_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) const USER_AGENT: &str = concat!("lanwatch/", env!("CARGO_PKG_VERSION"));

/// Status of a service as observed by one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
    Warning,
    Unknown,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Up => "up",
            ServiceStatus::Down => "down",
            ServiceStatus::Warning => "warning",
            ServiceStatus::Unknown => "unknown",
        }
    }

    /// Parse a stored status string. Unrecognized values map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "up" => ServiceStatus::Up,
            "down" => ServiceStatus::Down,
            "warning" => ServiceStatus::Warning,
            _ => ServiceStatus::Unknown,
        }
    }
}

/// A model loaded on an inference server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub size_bytes: u64,
    /// Size in decimal gigabytes, rounded to two decimals.
    pub size_gb: f64,
}

impl ModelInfo {
    pub fn new(name: String, size_bytes: u64) -> Self {
        let size_gb = (size_bytes as f64 / 1_000_000_000.0 * 100.0).round() / 100.0;
        Self {
            name,
            size_bytes,
            size_gb,
        }
    }
}

/// Protocol-specific payload attached to an outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckExtra {
    pub models: Vec<ModelInfo>,
}

/// The normalized result of checking one target once.
///
/// Created fresh on every check and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub target_id: String,
    pub target_name: String,
    pub host: String,
    pub status: ServiceStatus,
    pub response_time_ms: u64,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<CheckExtra>,
}

impl CheckOutcome {
    fn base(target: &Target, status: ServiceStatus, response_time_ms: u64) -> Self {
        Self {
            target_id: target.id.clone(),
            target_name: target.display_name.clone(),
            host: target.host.clone(),
            status,
            response_time_ms,
            checked_at: Utc::now(),
            error_detail: None,
            status_code: None,
            extra: None,
        }
    }
}

/// Check a single target with the checker matching its protocol kind.
pub async fn check_target(client: &reqwest::Client, target: &Target) -> CheckOutcome {
    match target.kind {
        ProtocolKind::Http => http::check(client, target).await,
        ProtocolKind::Ping => ping::check(target).await,
        ProtocolKind::Inference => inference::check(client, target).await,
        ProtocolKind::Unknown => CheckOutcome::base(target, ServiceStatus::Unknown, 0),
    }
}

/// Run one full sweep: all targets checked concurrently, results in
/// registry order. One slow target never delays another's check, so the
/// sweep completes within the slowest single timeout.
pub async fn check_all(client: &reqwest::Client, registry: &Registry) -> Vec<CheckOutcome> {
    let handles: Vec<_> = registry
        .targets()
        .iter()
        .map(|target| {
            let client = client.clone();
            let target = target.clone();
            tokio::spawn(async move { check_target(&client, &target).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (handle, target) in handles.into_iter().zip(registry.targets()) {
        match handle.await {
            Ok(outcome) => results.push(outcome),
            Err(e) => {
                tracing::error!("Check task for {} panicked: {}", target.id, e);
                let mut outcome = CheckOutcome::base(target, ServiceStatus::Down, 0);
                outcome.error_detail = Some("check task failed".to_string());
                results.push(outcome);
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn target(kind: ProtocolKind) -> Target {
        Target {
            id: "t1".to_string(),
            display_name: "Test".to_string(),
            host: "203.0.113.1".to_string(),
            kind,
            url: Some("http://203.0.113.1:1/".to_string()),
        }
    }

    #[tokio::test]
    async fn unknown_kind_yields_unknown_status() {
        let client = reqwest::Client::new();
        let outcome = check_target(&client, &target(ProtocolKind::Unknown)).await;
        assert_eq!(outcome.status, ServiceStatus::Unknown);
        assert!(outcome.error_detail.is_none());
        assert!(outcome.status_code.is_none());
        assert!(outcome.extra.is_none());
    }

    #[tokio::test]
    async fn empty_registry_sweep_is_empty() {
        let client = reqwest::Client::new();
        let registry = Registry::new(vec![]);
        let results = check_all(&client, &registry).await;
        assert!(results.is_empty());
    }

    #[test]
    fn model_size_rounds_to_two_decimals() {
        let model = ModelInfo::new("llama3:8b".to_string(), 4_661_224_676);
        assert_eq!(model.size_bytes, 4_661_224_676);
        assert_eq!(model.size_gb, 4.66);
    }

    #[test]
    fn status_parse_roundtrip() {
        for s in [
            ServiceStatus::Up,
            ServiceStatus::Down,
            ServiceStatus::Warning,
            ServiceStatus::Unknown,
        ] {
            assert_eq!(ServiceStatus::parse(s.as_str()), s);
        }
        assert_eq!(ServiceStatus::parse("bogus"), ServiceStatus::Unknown);
    }
}
