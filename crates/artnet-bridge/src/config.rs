//! Bridge configuration.
//!
//! Settings come from an optional TOML file; command-line flags override
//! whatever the file says.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use dmx_protocol::{DEFAULT_ARTNET_PORT, DEFAULT_HTTP_PORT};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
    /// Log every forwarded request and return transport errors to clients
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub artnet: ArtnetSection,
    #[serde(default)]
    pub http: HttpSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtnetSection {
    /// Destination node; no default, a lighting target must be named
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_artnet_port")]
    pub port: u16,
}

impl Default for ArtnetSection {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_ARTNET_PORT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

fn default_artnet_port() -> u16 { DEFAULT_ARTNET_PORT }
fn default_bind() -> String { "0.0.0.0".to_string() }
fn default_http_port() -> u16 { DEFAULT_HTTP_PORT }

/// Values given on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub artnet_host: Option<String>,
    pub artnet_port: Option<u16>,
    pub bind: Option<String>,
    pub listen_port: Option<u16>,
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("no ArtNet host configured (use --artnet-host or [artnet] host)")]
    MissingHost,
}

/// Fully merged settings the bridge runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub artnet_host: String,
    pub artnet_port: u16,
    pub listen: String,
    pub verbose: bool,
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.artnet_host {
            self.artnet.host = Some(host);
        }
        if let Some(port) = overrides.artnet_port {
            self.artnet.port = port;
        }
        if let Some(bind) = overrides.bind {
            self.http.bind = bind;
        }
        if let Some(port) = overrides.listen_port {
            self.http.port = port;
        }
        // A flag can only turn verbose mode on
        self.verbose |= overrides.verbose;
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let host = self
            .artnet
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingHost)?;

        Ok(Settings {
            artnet_host: host.to_string(),
            artnet_port: self.artnet.port,
            listen: format!("{}:{}", self.http.bind, self.http.port),
            verbose: self.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert!(!config.verbose);
        assert_eq!(config.artnet.host, None);
        assert_eq!(config.artnet.port, 6454);
        assert_eq!(config.http.bind, "0.0.0.0");
        assert_eq!(config.http.port, 8000);
        assert!(matches!(config.settings(), Err(ConfigError::MissingHost)));
    }

    #[test]
    fn test_full_file() {
        let config: BridgeConfig = toml::from_str(
            r#"
            verbose = true

            [artnet]
            host = "10.0.1.17"
            port = 6455

            [http]
            bind = "127.0.0.1"
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(
            config.settings().unwrap(),
            Settings {
                artnet_host: "10.0.1.17".to_string(),
                artnet_port: 6455,
                listen: "127.0.0.1:9000".to_string(),
                verbose: true,
            }
        );
    }

    #[test]
    fn test_overrides_win() {
        let mut config: BridgeConfig = toml::from_str(
            r#"
            [artnet]
            host = "10.0.0.1"
            "#,
        )
        .unwrap();

        config.apply(Overrides {
            artnet_host: Some("2.255.255.255".to_string()),
            listen_port: Some(9000),
            verbose: true,
            ..Default::default()
        });

        let settings = config.settings().unwrap();
        assert_eq!(settings.artnet_host, "2.255.255.255");
        assert_eq!(settings.artnet_port, 6454);
        assert_eq!(settings.listen, "0.0.0.0:9000");
        assert!(settings.verbose);
    }

    #[test]
    fn test_blank_host_is_missing() {
        let mut config = BridgeConfig::default();
        config.apply(Overrides {
            artnet_host: Some("  ".to_string()),
            ..Default::default()
        });
        assert!(matches!(config.settings(), Err(ConfigError::MissingHost)));
    }

    #[test]
    fn test_load_reports_path() {
        let err = BridgeConfig::load(Path::new("/nonexistent/artnet-bridge.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/artnet-bridge.toml"));
    }

    #[test]
    fn test_bad_types_fail_to_parse() {
        let err = toml::from_str::<BridgeConfig>("[artnet]\nport = \"abc\"").unwrap_err();
        assert!(err.to_string().contains("port"));
    }
}
