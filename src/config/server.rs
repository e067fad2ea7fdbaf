use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("quill.db")
    }

    /// Loads a config from a TOML file. Missing keys fall back to the
    /// defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("invalid config file: {e}")))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_with_partial_keys() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("quill.toml");
        std::fs::write(&path, "port = 9090\n").unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.db_path(), PathBuf::from("./data/quill.db"));
    }

    #[test]
    fn test_from_file_rejects_unknown_keys() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("quill.toml");
        std::fs::write(&path, "prot = 9090\n").unwrap();

        assert!(ServerConfig::from_file(&path).is_err());
    }
}
