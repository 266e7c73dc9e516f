//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ServerConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document into a configuration without validating it.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Overlay the deployment environment variables onto `config`.
///
/// - `PORT` replaces the port of `listener.bind_address`
/// - `AUTH0_DOMAIN` sets the issuer to `https://<domain>/`
/// - `AUTH0_AUDIENCE` sets the expected audience
/// - `CLIENT_ORIGIN_URL` sets the allowed CORS origin
pub fn apply_env_overrides<F>(config: &mut ServerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = non_empty("PORT") {
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port.trim());
    }

    if let Some(domain) = non_empty("AUTH0_DOMAIN") {
        let domain = domain
            .trim()
            .trim_start_matches("https://")
            .trim_end_matches('/');
        config.auth.issuer = format!("https://{}/", domain);
    }

    if let Some(audience) = non_empty("AUTH0_AUDIENCE") {
        config.auth.audience = audience;
    }

    if let Some(origin) = non_empty("CLIENT_ORIGIN_URL") {
        config.cors.allowed_origin = origin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            [auth]
            issuer = "https://tenant.example.com/"
            audience = "https://api.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.auth.issuer, "https://tenant.example.com/");
        assert_eq!(config.auth.algorithms, vec!["RS256".to_string()]);
        assert_eq!(config.listener.bind_address, "0.0.0.0:6060");
        assert_eq!(config.auth.key_fetch_timeout_secs, 5);
    }

    #[test]
    fn test_parse_rejects_malformed_toml() {
        let err = parse_config("[auth\nissuer = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "7070"),
            ("AUTH0_DOMAIN", "tenant.example.com"),
            ("AUTH0_AUDIENCE", "https://api.example.com"),
            ("CLIENT_ORIGIN_URL", "http://localhost:4040"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.listener.bind_address, "0.0.0.0:7070");
        assert_eq!(config.auth.issuer, "https://tenant.example.com/");
        assert_eq!(config.auth.audience, "https://api.example.com");
        assert_eq!(config.cors.allowed_origin, "http://localhost:4040");
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = ServerConfig::default();
        config.auth.audience = "from-file".into();
        apply_env_overrides(&mut config, |k| {
            (k == "AUTH0_AUDIENCE").then(|| "  ".to_string())
        });
        assert_eq!(config.auth.audience, "from-file");
    }

    #[test]
    fn test_parse_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [listener]
            bind_address = "127.0.0.1:0"

            [auth]
            issuer = "https://tenant.example.com/"
            audience = "https://api.example.com"

            [cors]
            allowed_origin = "http://localhost:4040"
            "#
        )
        .unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        let config = parse_config(&content).unwrap();
        assert!(validate_config(&config).is_ok());
    }
}
