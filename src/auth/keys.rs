//! Process-wide cache of the issuer's signing keys.
//!
//! Keys live in an immutable [`KeySet`] snapshot behind an [`ArcSwap`].
//! Lookups load the snapshot without locking; a refresh builds a new
//! snapshot and swaps it in, so a key is replaced but never mutated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use jsonwebtoken::jwk::{Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::auth::source::{KeyFetchError, KeySource};
use crate::observability::metrics;

/// Errors returned by [`KeyCache`] lookups.
#[derive(Debug, Error)]
pub enum KeyCacheError {
    #[error("key set fetch failed: {0}")]
    Fetch(#[from] KeyFetchError),

    #[error("no signing key found for key id {0:?}")]
    UnknownKeyId(Option<String>),
}

/// A public verification key published by the issuer.
#[derive(Clone)]
pub struct SigningKey {
    pub key_id: String,
    /// Algorithm pinned by the JWK's `alg`, if any.
    pub algorithm: Option<Algorithm>,
    key: DecodingKey,
}

impl SigningKey {
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            key_id: jwk.common.key_id.clone().unwrap_or_default(),
            algorithm: jwk.common.key_algorithm.as_ref().and_then(signing_algorithm),
            key: DecodingKey::from_jwk(jwk)?,
        })
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

fn signing_algorithm(alg: &KeyAlgorithm) -> Option<Algorithm> {
    match alg {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}

/// Immutable snapshot of the issuer's keys.
#[derive(Debug, Default)]
struct KeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    fetched_at: Option<Instant>,
    generation: u64,
}

impl KeySet {
    fn from_jwks(jwks: &JwkSet, generation: u64) -> Self {
        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                tracing::debug!(kid = ?jwk.common.key_id, "Skipping encryption key");
                continue;
            }
            match SigningKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(key.key_id.clone(), Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(kid = ?jwk.common.key_id, error = %e, "Skipping unusable JWK");
                }
            }
        }
        Self {
            keys,
            fetched_at: Some(Instant::now()),
            generation,
        }
    }

    /// A key by id; without an id, the key set must hold exactly one key.
    fn find(&self, key_id: Option<&str>) -> Option<Arc<SigningKey>> {
        match key_id {
            Some(kid) => self.keys.get(kid).cloned(),
            None if self.keys.len() == 1 => self.keys.values().next().cloned(),
            None => None,
        }
    }

    fn is_stale(&self, ttl: Option<Duration>) -> bool {
        match (ttl, self.fetched_at) {
            (Some(ttl), Some(fetched_at)) => fetched_at.elapsed() > ttl,
            _ => false,
        }
    }
}

/// Shared cache of signing keys, fetched on miss and on TTL expiry.
pub struct KeyCache {
    source: Arc<dyn KeySource>,
    current: ArcSwap<KeySet>,
    ttl: Option<Duration>,
    min_refetch_interval: Duration,
    refresh_lock: Mutex<()>,
}

impl KeyCache {
    /// Create an empty cache. A `ttl` of `None` keeps keys until a key-id miss.
    pub fn new(source: Arc<dyn KeySource>, ttl: Option<Duration>) -> Self {
        Self {
            source,
            current: ArcSwap::from_pointee(KeySet::default()),
            ttl,
            min_refetch_interval: Duration::ZERO,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Minimum time between a successful fetch and a refetch triggered by an
    /// unknown key id. Expired snapshots are always refetched.
    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    /// Resolve a signing key by key id.
    pub async fn get(&self, key_id: &str) -> Result<Arc<SigningKey>, KeyCacheError> {
        self.resolve(Some(key_id)).await
    }

    /// Resolve a signing key, fetching the key set once on miss or expiry.
    ///
    /// A `None` key id resolves only when the issuer publishes a single key.
    pub async fn resolve(&self, key_id: Option<&str>) -> Result<Arc<SigningKey>, KeyCacheError> {
        let snapshot = self.current.load_full();
        let cached = snapshot.find(key_id);

        if !snapshot.is_stale(self.ttl) {
            if let Some(key) = cached {
                return Ok(key);
            }
        }

        if !snapshot.is_stale(self.ttl) && self.recently_fetched(&snapshot) {
            tracing::debug!(kid = ?key_id, "Unknown key id; refetch throttled");
            metrics::record_key_fetch("throttled");
            return Err(KeyCacheError::UnknownKeyId(key_id.map(str::to_string)));
        }

        if let Err(e) = self.refresh_after(snapshot.generation).await {
            return match cached {
                Some(key) => {
                    tracing::warn!(error = %e, kid = ?key_id, "Key refresh failed; serving stale key");
                    Ok(key)
                }
                None => Err(e),
            };
        }

        self.current
            .load()
            .find(key_id)
            .ok_or_else(|| KeyCacheError::UnknownKeyId(key_id.map(str::to_string)))
    }

    /// Fetch the issuer's key set and replace the cached snapshot.
    pub async fn refresh(&self) -> Result<(), KeyCacheError> {
        let generation = self.current.load().generation;
        self.refresh_after(generation).await
    }

    /// Number of keys currently cached.
    pub fn len(&self) -> usize {
        self.current.load().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn recently_fetched(&self, snapshot: &KeySet) -> bool {
        snapshot
            .fetched_at
            .is_some_and(|at| at.elapsed() < self.min_refetch_interval)
    }

    /// Single-flight refresh: callers that queued behind a refresh which
    /// already replaced generation `seen` reuse its result.
    async fn refresh_after(&self, seen: u64) -> Result<(), KeyCacheError> {
        let _guard = self.refresh_lock.lock().await;
        if self.current.load().generation != seen {
            return Ok(());
        }

        let jwks = match self.source.fetch_keys().await {
            Ok(jwks) => jwks,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch issuer key set");
                metrics::record_key_fetch("error");
                return Err(e.into());
            }
        };

        let set = KeySet::from_jwks(&jwks, seen + 1);
        tracing::info!(keys = set.keys.len(), generation = set.generation, "Signing keys refreshed");
        metrics::record_key_fetch("ok");
        metrics::record_cached_keys(set.keys.len());
        self.current.store(Arc::new(set));
        Ok(())
    }
}
