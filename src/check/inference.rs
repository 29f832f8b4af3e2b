//! Inference-server checker: HTTP health plus loaded-model introspection.

use std::time::Duration;

use serde::Deserialize;

use super::{http, CheckExtra, CheckOutcome, ModelInfo, ServiceStatus, USER_AGENT};
use crate::registry::Target;

const MODEL_LIST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct LoadedModels {
    #[serde(default)]
    models: Vec<LoadedModel>,
}

#[derive(Debug, Deserialize)]
struct LoadedModel {
    name: String,
    #[serde(default)]
    size: u64,
}

/// Check an inference server.
///
/// Health is the HTTP check against the server's tag listing; only when
/// that reports up is a second, best-effort call made for the currently
/// loaded models. The secondary call can never take the outcome down.
pub(super) async fn check(client: &reqwest::Client, target: &Target) -> CheckOutcome {
    let base = target
        .url
        .clone()
        .unwrap_or_else(|| format!("http://{}", target.host));
    let base = base.trim_end_matches('/');

    let health_url = format!("{}/api/tags", base);
    let mut outcome = http::check_url(client, target, &health_url).await;

    if outcome.status == ServiceStatus::Up {
        let models = list_loaded_models(client, base).await.unwrap_or_else(|e| {
            tracing::debug!("Model listing failed for {}: {}", target.id, e);
            Vec::new()
        });
        outcome.extra = Some(CheckExtra { models });
    }

    outcome
}

async fn list_loaded_models(
    client: &reqwest::Client,
    base: &str,
) -> Result<Vec<ModelInfo>, reqwest::Error> {
    let listed: LoadedModels = client
        .get(format!("{}/api/ps", base))
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .timeout(MODEL_LIST_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(listed
        .models
        .into_iter()
        .map(|m| ModelInfo::new(m.name, m.size))
        .collect())
}
