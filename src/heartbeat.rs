//! Periodic heartbeat probing of auxiliary agent machines.
//!
//! Runs on its own fixed interval, independent of the service sweep and
//! its cache TTL. Fire-and-forget: failures are logged, never fatal.

use std::time::Duration;

use crate::db::Store;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct AgentTarget {
    pub name: String,
    pub url: String,
}

impl AgentTarget {
    fn new(name: &str, ip: &str, gateway_port: u16) -> Self {
        Self {
            name: name.to_string(),
            url: format!("http://{}:{}/status", ip, gateway_port),
        }
    }
}

/// The fixed set of agent machines probed by the heartbeat loop.
pub fn builtin_agents() -> Vec<AgentTarget> {
    vec![
        AgentTarget::new("siegbert", "192.168.27.155", 18789),
        AgentTarget::new("eugene", "192.168.27.149", 18789),
        AgentTarget::new("bubblebass", "192.168.27.64", 18789),
        AgentTarget::new("byte", "192.168.27.79", 18789),
    ]
}

/// Spawn the heartbeat loop. The first probe runs immediately, then every
/// interval tick.
pub fn spawn(store: Store) {
    tokio::spawn(run(store, builtin_agents()));
}

async fn run(store: Store, agents: Vec<AgentTarget>) {
    tracing::info!(
        "Heartbeat prober started ({} agents, every {:?})",
        agents.len(),
        HEARTBEAT_INTERVAL
    );
    let client = reqwest::Client::new();
    let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);

    loop {
        interval.tick().await;
        sweep_agents(&store, &client, &agents).await;
    }
}

async fn sweep_agents(store: &Store, client: &reqwest::Client, agents: &[AgentTarget]) {
    for agent in agents {
        let reachable = probe(client, &agent.url).await;
        let (status, task) = if reachable {
            ("online", Some("standby"))
        } else {
            ("offline", None)
        };

        if let Err(e) = store.upsert_agent(&agent.name, status, task) {
            tracing::warn!("Failed to update agent {}: {}", agent.name, e);
        } else {
            tracing::debug!("Agent {} -> {}", agent.name, status);
        }
    }
}

async fn probe(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).timeout(PROBE_TIMEOUT).send().await {
        // Any response short of a server error counts as online.
        Ok(response) => response.status().as_u16() < 500,
        Err(_) => false,
    }
}
