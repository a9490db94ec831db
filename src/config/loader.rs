//! Configuration loading from disk.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Replaces `backend.endpoint`; a bare `host:port` gets an `http://` scheme.
    pub faiss_endpoint: Option<String>,

    /// Replaces the port of `listener.bind_address`.
    pub http_port: Option<u16>,
}

impl Overrides {
    /// Apply to `config` in place.
    pub fn apply(&self, config: &mut GatewayConfig) {
        if let Some(endpoint) = &self.faiss_endpoint {
            config.backend.endpoint = if endpoint.contains("://") {
                endpoint.clone()
            } else {
                format!("http://{endpoint}")
            };
        }
        if let Some(port) = self.http_port {
            config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>()
            {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                }
                Err(_) => format!("0.0.0.0:{port}"),
            };
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    resolve_config(Some(path), &Overrides::default())
}

/// Build the effective configuration: file (or defaults) plus overrides,
/// validated as a whole.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &Overrides,
) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str::<GatewayConfig>(&content)?
        }
        None => GatewayConfig::default(),
    };

    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{name}-{}.toml", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_file() {
        let path = write_temp(
            "gateway",
            r#"
            [listener]
            bind_address = "127.0.0.1:8080"

            [gateway]
            namespace = "vectors"
            "#,
        );
        let config = load_config(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert_eq!(config.gateway.namespace, "vectors");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let path = write_temp("broken", "[listener\nbind_address = ");
        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let path = write_temp("invalid", "[backend]\npool_size = 0\n");
        let err = load_config(&path).unwrap_err();
        fs::remove_file(&path).ok();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "backend.pool_size");
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_overrides_without_file() {
        let overrides = Overrides {
            faiss_endpoint: Some("10.1.34.159:3838".into()),
            http_port: Some(4000),
        };
        let config = resolve_config(None, &overrides).unwrap();
        assert_eq!(config.backend.endpoint, "http://10.1.34.159:3838");
        assert_eq!(config.listener.bind_address, "0.0.0.0:4000");
    }

    #[test]
    fn test_endpoint_override_keeps_scheme() {
        let mut config = GatewayConfig::default();
        Overrides {
            faiss_endpoint: Some("https://faiss.internal:443".into()),
            http_port: None,
        }
        .apply(&mut config);
        assert_eq!(config.backend.endpoint, "https://faiss.internal:443");
        assert_eq!(config.listener.bind_address, "0.0.0.0:3839");
    }
}
