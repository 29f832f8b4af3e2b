//! ICMP ping checker via the platform ping utility.

use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

use super::{CheckOutcome, ServiceStatus, PING_TIMEOUT};
use crate::registry::Target;

/// Check a target with a single ICMP echo.
///
/// Any process failure or non-zero exit is reported as a generic
/// "ping failed"; the utility's own error taxonomy is not parsed.
pub(super) async fn check(target: &Target) -> CheckOutcome {
    let start = Instant::now();
    let up = run_ping(&target.host).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if up {
        CheckOutcome::base(target, ServiceStatus::Up, elapsed_ms)
    } else {
        let mut outcome = CheckOutcome::base(target, ServiceStatus::Down, elapsed_ms);
        outcome.error_detail = Some("Ping failed".to_string());
        outcome
    }
}

async fn run_ping(host: &str) -> bool {
    let timeout_secs = PING_TIMEOUT.as_secs().max(1);

    let mut command = Command::new("ping");
    command
        .args(["-c", "1", "-W", &timeout_secs.to_string(), host])
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // -W bounds the echo wait; the outer timeout covers a hung binary.
    let grace = PING_TIMEOUT + std::time::Duration::from_secs(1);
    match tokio::time::timeout(grace, command.output()).await {
        Ok(Ok(output)) => output.status.success(),
        Ok(Err(e)) => {
            tracing::warn!("Failed to execute ping for {}: {}", host, e);
            false
        }
        Err(_elapsed) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProtocolKind;

    #[tokio::test]
    async fn unreachable_host_is_down_within_bound() {
        let target = Target {
            // TEST-NET-1, guaranteed unrouted
            id: "dead".to_string(),
            display_name: "Dead".to_string(),
            host: "192.0.2.1".to_string(),
            kind: ProtocolKind::Ping,
            url: None,
        };

        let start = Instant::now();
        let outcome = check(&target).await;
        assert_eq!(outcome.status, ServiceStatus::Down);
        assert_eq!(outcome.error_detail.as_deref(), Some("Ping failed"));
        // Bounded by the ping timeout plus the hung-binary grace.
        assert!(start.elapsed() < PING_TIMEOUT + std::time::Duration::from_secs(2));
    }
}
