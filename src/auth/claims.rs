//! Structural parsing of compact-serialized JWTs.
//!
//! Parsing never trusts anything: it only splits the token, decodes the
//! segments and deserializes the header and payload. Signature and claim
//! checks happen in [`crate::auth::validator`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Why a token could not be parsed.
#[derive(Debug, Error)]
pub enum MalformedToken {
    #[error("expected 3 dot-separated segments, found {0}")]
    SegmentCount(usize),

    #[error("segment is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("segment is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required claim '{0}'")]
    MissingClaim(&'static str),
}

/// Audience claim value, which can be a single string or array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

/// JSON number of seconds since the epoch. Fractional values are allowed
/// and truncated; negative ones saturate to zero.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum NumericDate {
    Integer(u64),
    Fractional(f64),
}

impl NumericDate {
    fn seconds(self) -> u64 {
        match self {
            NumericDate::Integer(secs) => secs,
            NumericDate::Fractional(secs) => secs as u64,
        }
    }
}

fn numeric_date<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<NumericDate>::deserialize(deserializer)?.map(NumericDate::seconds))
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default, deserialize_with = "numeric_date")]
    exp: Option<u64>,
    #[serde(default, deserialize_with = "numeric_date")]
    nbf: Option<u64>,
}

/// Header and payload of a bearer token, parsed but not yet verified.
///
/// Owned by exactly one validation call and never mutated after parsing.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    /// `iss` claim.
    pub issuer: Option<String>,
    /// `sub` claim.
    pub subject: Option<String>,
    /// `aud` claim, normalized to a list.
    pub audience: Vec<String>,
    /// `exp` claim (seconds since epoch).
    pub expiry: u64,
    /// `nbf` claim (seconds since epoch).
    pub not_before: Option<u64>,
    /// `kid` header parameter.
    pub key_id: Option<String>,
    /// `alg` header parameter, as presented.
    pub algorithm: String,
    /// Decoded signature bytes.
    pub signature: Vec<u8>,
    signing_input: String,
}

impl TokenClaims {
    /// Parse a compact JWT (`header.payload.signature`).
    pub fn parse(token: &str) -> Result<Self, MalformedToken> {
        let segments: Vec<&str> = token.split('.').collect();
        let &[header, payload, signature] = segments.as_slice() else {
            return Err(MalformedToken::SegmentCount(segments.len()));
        };

        let raw_header: RawHeader = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header)?)?;
        let raw_claims: RawClaims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload)?)?;
        let signature = URL_SAFE_NO_PAD.decode(signature)?;

        let expiry = raw_claims.exp.ok_or(MalformedToken::MissingClaim("exp"))?;
        let audience = match raw_claims.aud {
            Some(Audience::Single(aud)) => vec![aud],
            Some(Audience::Multiple(auds)) => auds,
            None => Vec::new(),
        };

        Ok(Self {
            issuer: raw_claims.iss,
            subject: raw_claims.sub,
            audience,
            expiry,
            not_before: raw_claims.nbf,
            key_id: raw_header.kid,
            algorithm: raw_header.alg,
            signature,
            signing_input: format!("{header}.{payload}"),
        })
    }

    /// The bytes covered by the signature (`header.payload`).
    pub fn signing_input(&self) -> &[u8] {
        self.signing_input.as_bytes()
    }

    /// The signature re-encoded as base64url, as the verifier expects it.
    pub fn encoded_signature(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.signature)
    }

    pub fn has_audience(&self, audience: &str) -> bool {
        self.audience.iter().any(|a| a == audience)
    }
}
