//! Shared utilities for integration testing: a mock token issuer, token
//! minting, and a running resource server.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{extract::State, routing::get, Json, Router};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use resource_server::config::ServerConfig;
use resource_server::{HttpServer, Shutdown};

pub const AUDIENCE: &str = "https://api.example.com";
pub const ALLOWED_ORIGIN: &str = "http://localhost:4040";

pub const PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/rsa_private.pem");
pub const ROGUE_PEM: &[u8] = include_bytes!("../fixtures/rogue_private.pem");
const PUBLIC_JWK: &str = include_str!("../fixtures/rsa_public.jwk.json");

/// The public half of the fixture key, published under `kid`.
pub fn jwks(kid: &str) -> Value {
    let mut jwk: Value = serde_json::from_str(PUBLIC_JWK).unwrap();
    jwk["kid"] = json!(kid);
    json!({ "keys": [jwk] })
}

#[derive(Clone)]
struct IssuerState {
    issuer: String,
    jwks: Arc<RwLock<Value>>,
    fetches: Arc<AtomicUsize>,
}

/// An OpenID issuer serving a discovery document and a JWKS.
pub struct MockIssuer {
    pub issuer: String,
    jwks: Arc<RwLock<Value>>,
    fetches: Arc<AtomicUsize>,
}

impl MockIssuer {
    /// Start the issuer on an ephemeral port, publishing one key under `kid`.
    pub async fn start(kid: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let issuer = format!("http://{}/", listener.local_addr().unwrap());

        let state = IssuerState {
            issuer: issuer.clone(),
            jwks: Arc::new(RwLock::new(jwks(kid))),
            fetches: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/.well-known/openid-configuration", get(discovery))
            .route("/.well-known/jwks.json", get(key_set))
            .with_state(state.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            issuer,
            jwks: state.jwks,
            fetches: state.fetches,
        }
    }

    /// Replace the published key set with one key under `kid`.
    pub fn rotate(&self, kid: &str) {
        *self.jwks.write().unwrap() = jwks(kid);
    }

    pub fn jwks_fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Mint a token from this issuer.
    pub fn token(&self, kid: &str) -> String {
        mint(&claims(&self.issuer, AUDIENCE, 600), kid, PRIVATE_PEM)
    }
}

async fn discovery(State(state): State<IssuerState>) -> Json<Value> {
    Json(json!({
        "issuer": state.issuer,
        "jwks_uri": format!("{}.well-known/jwks.json", state.issuer),
    }))
}

async fn key_set(State(state): State<IssuerState>) -> Json<Value> {
    state.fetches.fetch_add(1, Ordering::SeqCst);
    Json(state.jwks.read().unwrap().clone())
}

pub fn now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
}

/// Claims expiring `expires_in` seconds from now (negative for the past).
pub fn claims(issuer: &str, audience: &str, expires_in: i64) -> Value {
    json!({
        "iss": issuer,
        "sub": "auth0|user-1",
        "aud": audience,
        "iat": now(),
        "exp": now() + expires_in,
    })
}

/// Sign `claims` with RS256 under `kid`.
pub fn mint(claims: &Value, kid: &str, pem: &[u8]) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_rsa_pem(pem).unwrap()).unwrap()
}

/// A resource server running on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn config_for(issuer: &MockIssuer) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.auth.issuer = issuer.issuer.clone();
    config.auth.audience = AUDIENCE.into();
    config.cors.allowed_origin = ALLOWED_ORIGIN.into();
    config.auth.key_refetch_min_interval_secs = 0;
    config
}

/// Start a resource server trusting `issuer`.
pub async fn start_server(issuer: &MockIssuer) -> TestServer {
    let config = config_for(issuer);
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer { base_url, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
