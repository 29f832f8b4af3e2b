//! HTTP reachability checker.

use std::time::Instant;

use reqwest::header;

use super::{CheckOutcome, ServiceStatus, HTTP_TIMEOUT, USER_AGENT};
use crate::registry::Target;

/// Check a target over HTTP using its configured URL.
pub(super) async fn check(client: &reqwest::Client, target: &Target) -> CheckOutcome {
    let url = target
        .url
        .clone()
        .unwrap_or_else(|| format!("http://{}", target.host));
    check_url(client, target, &url).await
}

/// Issue a single GET and normalize the response into an outcome.
///
/// The request is aborted by the per-request timeout; elapsed wall-clock
/// time is recorded whether the check succeeds, fails, or times out.
pub(super) async fn check_url(
    client: &reqwest::Client,
    target: &Target,
    url: &str,
) -> CheckOutcome {
    let start = Instant::now();

    let result = client
        .get(url)
        .header(header::USER_AGENT, USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .send()
        .await;

    let elapsed_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(response) => {
            let code = response.status().as_u16();
            // A non-2xx response is reachable but down; keep the code.
            let status = if response.status().is_success() {
                ServiceStatus::Up
            } else {
                ServiceStatus::Down
            };
            let mut outcome = CheckOutcome::base(target, status, elapsed_ms);
            outcome.status_code = Some(code);
            outcome
        }
        Err(e) => {
            let mut outcome = CheckOutcome::base(target, ServiceStatus::Down, elapsed_ms);
            outcome.error_detail = Some(e.to_string());
            outcome
        }
    }
}
