//! Static registry of monitored targets.
//!
//! The target set is fixed configuration: loaded once at startup and
//! immutable for the lifetime of the process.

use serde::{Deserialize, Serialize};

/// Protocol used to check a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    Http,
    Ping,
    /// HTTP health check plus loaded-model introspection.
    Inference,
    #[serde(other)]
    Unknown,
}

/// A monitored endpoint or machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub display_name: String,
    pub host: String,
    pub kind: ProtocolKind,
    /// Endpoint URL for HTTP-based checks. For inference targets this is
    /// the server base URL; the checker derives its paths from it.
    pub url: Option<String>,
}

/// The fixed set of targets monitored by this process.
#[derive(Debug, Clone)]
pub struct Registry {
    targets: Vec<Target>,
}

impl Registry {
    pub fn new(targets: Vec<Target>) -> Self {
        Self { targets }
    }

    /// The built-in LAN target set.
    pub fn builtin() -> Self {
        Self::new(vec![
            Target {
                id: "conduit".to_string(),
                display_name: "Conduit (Matrix)".to_string(),
                host: "192.168.27.30:6167".to_string(),
                kind: ProtocolKind::Http,
                url: Some("http://192.168.27.30:6167/_matrix/client/versions".to_string()),
            },
            Target {
                id: "ollama".to_string(),
                display_name: "Ollama".to_string(),
                host: "192.168.27.30:11434".to_string(),
                kind: ProtocolKind::Inference,
                url: Some("http://192.168.27.30:11434".to_string()),
            },
            Target {
                id: "mac-aithree".to_string(),
                display_name: "Mac mini (aithree)".to_string(),
                host: "192.168.27.155".to_string(),
                kind: ProtocolKind::Ping,
                url: None,
            },
            Target {
                id: "mac-eugene".to_string(),
                display_name: "Mac mini (eugene)".to_string(),
                host: "192.168.27.149".to_string(),
                kind: ProtocolKind::Ping,
                url: None,
            },
        ])
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn get(&self, id: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = Registry::builtin();
        assert!(registry.get("ollama").is_some());
        assert_eq!(registry.get("ollama").unwrap().kind, ProtocolKind::Inference);
        assert!(registry.get("nope").is_none());
    }
}
