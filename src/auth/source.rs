//! Key set retrieval from the issuer.
//!
//! # Responsibilities
//! - Discover the JWKS endpoint from the issuer's discovery document
//! - Fetch the published key set over HTTP
//! - Bound every fetch with a deadline
//!
//! # Design Decisions
//! - The JWKS URI is resolved once and remembered for the process lifetime
//! - The discovery document must name the configured issuer
//! - Timeouts are distinct from other fetch errors

use std::time::Duration;

use futures_util::future::BoxFuture;
use jsonwebtoken::jwk::JwkSet;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::AuthConfig;

/// Errors raised while fetching the issuer's key material.
#[derive(Debug, Error)]
pub enum KeyFetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("key fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("discovery failed: {0}")]
    Discovery(String),
}

/// Anything able to produce the issuer's current key set.
pub trait KeySource: Send + Sync {
    fn fetch_keys(&self) -> BoxFuture<'_, Result<JwkSet, KeyFetchError>>;
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    issuer: String,
    #[serde(default)]
    jwks_uri: Option<String>,
}

/// Fetches keys from the issuer over HTTP, discovering the JWKS URI when
/// it is not configured.
pub struct RemoteKeySource {
    client: reqwest::Client,
    issuer: String,
    jwks_uri: OnceCell<String>,
    timeout: Duration,
}

impl RemoteKeySource {
    pub fn new(config: &AuthConfig) -> Result<Self, KeyFetchError> {
        let timeout = Duration::from_secs(config.key_fetch_timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        let jwks_uri = match &config.jwks_uri {
            Some(uri) => OnceCell::new_with(Some(uri.clone())),
            None => OnceCell::new(),
        };

        Ok(Self {
            client,
            issuer: config.issuer.clone(),
            jwks_uri,
            timeout,
        })
    }

    /// Location of the OpenID discovery document for the issuer.
    pub fn discovery_url(&self) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            self.issuer.trim_end_matches('/')
        )
    }

    async fn discover_jwks_uri(&self) -> Result<String, KeyFetchError> {
        let url = self.discovery_url();
        tracing::info!(url = %url, "Resolving JWKS URI from issuer discovery document");

        let document: DiscoveryDocument = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if document.issuer != self.issuer {
            return Err(KeyFetchError::Discovery(format!(
                "discovery document names issuer '{}', expected '{}'",
                document.issuer, self.issuer
            )));
        }

        document
            .jwks_uri
            .ok_or_else(|| KeyFetchError::Discovery("discovery document has no jwks_uri".into()))
    }

    async fn fetch(&self) -> Result<JwkSet, KeyFetchError> {
        let jwks_uri = self
            .jwks_uri
            .get_or_try_init(|| self.discover_jwks_uri())
            .await?;

        tracing::debug!(jwks_uri = %jwks_uri, "Fetching issuer key set");

        let keys = self
            .client
            .get(jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(keys)
    }
}

impl KeySource for RemoteKeySource {
    fn fetch_keys(&self) -> BoxFuture<'_, Result<JwkSet, KeyFetchError>> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, self.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(KeyFetchError::Timeout(self.timeout)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(issuer: &str) -> AuthConfig {
        AuthConfig {
            issuer: issuer.to_string(),
            audience: "api".to_string(),
            key_fetch_timeout_secs: 1,
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_discovery_url_ignores_trailing_slash() {
        let with_slash = RemoteKeySource::new(&config("https://tenant.example.com/")).unwrap();
        let without = RemoteKeySource::new(&config("https://tenant.example.com")).unwrap();
        assert_eq!(
            with_slash.discovery_url(),
            "https://tenant.example.com/.well-known/openid-configuration"
        );
        assert_eq!(with_slash.discovery_url(), without.discovery_url());
    }

    #[tokio::test]
    async fn test_unreachable_issuer_is_an_error() {
        let mut cfg = config("http://127.0.0.1:1/");
        cfg.jwks_uri = Some("http://127.0.0.1:1/jwks.json".into());
        let source = RemoteKeySource::new(&cfg).unwrap();
        assert!(source.fetch_keys().await.is_err());
    }
}
