//! Configuration loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the API server (default: 3000)
    pub http_port: u16,
    /// Directory for durable state: SQLite database (default: "./data")
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 3000,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: HTTP port (default: 3000)
    /// - `DATA_DIR`: durable state directory (default: "./data")
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(data_dir) = env::var("DATA_DIR") {
            cfg.data_dir = PathBuf::from(data_dir);
        }

        cfg
    }

    /// Path of the SQLite database inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("lanwatch.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.http_port, 3000);
        assert_eq!(cfg.db_path(), PathBuf::from("./data/lanwatch.db"));
    }
}
