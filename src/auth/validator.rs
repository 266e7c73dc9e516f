//! Bearer token validation.
//!
//! # Responsibilities
//! - Parse the token structure
//! - Resolve the signing key through the [`KeyCache`]
//! - Verify the signature before any claim is trusted
//! - Run the ordered claim checks (expiry, issuer, audience)
//!
//! # Design Decisions
//! - Validation returns a typed [`ValidationOutcome`], never an error
//! - Claim checks short-circuit; only the first failure is reported
//! - Key fetch failures are reported as `InvalidSignature`

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::Algorithm;

use crate::auth::claims::TokenClaims;
use crate::auth::keys::{KeyCache, KeyCacheError};
use crate::config::AuthConfig;

/// Result of validating one bearer token. Exactly one variant holds.
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    Valid(TokenClaims),
    InvalidSignature,
    InvalidIssuer,
    InvalidAudience,
    Expired,
    Malformed,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    /// Short label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::Valid(_) => "valid",
            ValidationOutcome::InvalidSignature => "invalid_signature",
            ValidationOutcome::InvalidIssuer => "invalid_issuer",
            ValidationOutcome::InvalidAudience => "invalid_audience",
            ValidationOutcome::Expired => "expired",
            ValidationOutcome::Malformed => "malformed",
        }
    }
}

/// A check over signature-verified claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimCheck {
    /// `exp` (and `nbf`, when present) against the current time.
    Expiry,
    /// `iss` equals the configured issuer.
    Issuer,
    /// The configured audience is a member of `aud`.
    Audience,
}

impl ClaimCheck {
    /// Default order in which claim checks run.
    pub const ORDER: [ClaimCheck; 3] = [ClaimCheck::Expiry, ClaimCheck::Issuer, ClaimCheck::Audience];

    fn evaluate(
        &self,
        policy: &ClaimPolicy,
        claims: &TokenClaims,
        now: u64,
    ) -> Result<(), ValidationOutcome> {
        match self {
            ClaimCheck::Expiry => {
                if claims.expiry.saturating_add(policy.leeway) <= now {
                    return Err(ValidationOutcome::Expired);
                }
                match claims.not_before {
                    Some(nbf) if nbf > now.saturating_add(policy.leeway) => {
                        Err(ValidationOutcome::Expired)
                    }
                    _ => Ok(()),
                }
            }
            ClaimCheck::Issuer => match &claims.issuer {
                Some(iss) if *iss == policy.issuer => Ok(()),
                _ => Err(ValidationOutcome::InvalidIssuer),
            },
            ClaimCheck::Audience => {
                if claims.has_audience(&policy.audience) {
                    Ok(())
                } else {
                    Err(ValidationOutcome::InvalidAudience)
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ClaimPolicy {
    issuer: String,
    audience: String,
    leeway: u64,
}

/// Verifies bearer tokens against the issuer's keys and the configured
/// issuer and audience.
pub struct TokenValidator {
    keys: Arc<KeyCache>,
    algorithms: Vec<Algorithm>,
    policy: ClaimPolicy,
    checks: Vec<ClaimCheck>,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig, keys: Arc<KeyCache>) -> Self {
        let algorithms = config
            .algorithms
            .iter()
            .filter_map(|alg| Algorithm::from_str(alg).ok())
            .collect();

        Self {
            keys,
            algorithms,
            policy: ClaimPolicy {
                issuer: config.issuer.clone(),
                audience: config.audience.clone(),
                leeway: config.leeway_secs,
            },
            checks: ClaimCheck::ORDER.to_vec(),
        }
    }

    /// Validate a raw bearer token against the current time.
    pub async fn validate(&self, raw_token: &str) -> ValidationOutcome {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        self.validate_at(raw_token, now).await
    }

    /// Validate a raw bearer token as of `now` (seconds since epoch).
    pub async fn validate_at(&self, raw_token: &str, now: u64) -> ValidationOutcome {
        let claims = match TokenClaims::parse(raw_token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Malformed bearer token");
                return ValidationOutcome::Malformed;
            }
        };

        if let Err(outcome) = self.verify_signature(&claims).await {
            return outcome;
        }

        for check in &self.checks {
            if let Err(outcome) = check.evaluate(&self.policy, &claims, now) {
                return outcome;
            }
        }

        ValidationOutcome::Valid(claims)
    }

    async fn verify_signature(&self, claims: &TokenClaims) -> Result<(), ValidationOutcome> {
        let algorithm = Algorithm::from_str(&claims.algorithm)
            .ok()
            .filter(|alg| self.algorithms.contains(alg))
            .ok_or_else(|| {
                tracing::debug!(alg = %claims.algorithm, "Token algorithm not accepted");
                ValidationOutcome::InvalidSignature
            })?;

        let key = match self.keys.resolve(claims.key_id.as_deref()).await {
            Ok(key) => key,
            Err(KeyCacheError::UnknownKeyId(kid)) => {
                tracing::debug!(kid = ?kid, "No signing key for token");
                return Err(ValidationOutcome::InvalidSignature);
            }
            Err(e @ KeyCacheError::Fetch(_)) => {
                tracing::error!(error = %e, "Signing keys unavailable");
                return Err(ValidationOutcome::InvalidSignature);
            }
        };

        if key.algorithm.is_some_and(|pinned| pinned != algorithm) {
            tracing::debug!(kid = %key.key_id, alg = ?algorithm, "Token algorithm does not match key");
            return Err(ValidationOutcome::InvalidSignature);
        }

        match jsonwebtoken::crypto::verify(
            &claims.encoded_signature(),
            claims.signing_input(),
            key.decoding_key(),
            algorithm,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ValidationOutcome::InvalidSignature),
            Err(e) => {
                tracing::debug!(error = %e, "Signature verification error");
                Err(ValidationOutcome::InvalidSignature)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::tests::{test_jwks, StaticSource};
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    const PRIVATE_PEM: &[u8] = include_bytes!("../../tests/fixtures/rsa_private.pem");
    const ROGUE_PEM: &[u8] = include_bytes!("../../tests/fixtures/rogue_private.pem");
    const ISSUER: &str = "https://issuer.example.com/";
    const AUDIENCE: &str = "https://api.example.com";
    const NOW: u64 = 1_700_000_000;

    fn config() -> AuthConfig {
        AuthConfig {
            issuer: ISSUER.into(),
            audience: AUDIENCE.into(),
            leeway_secs: 0,
            ..AuthConfig::default()
        }
    }

    fn validator() -> (TokenValidator, Arc<StaticSource>) {
        let source = StaticSource::new(test_jwks("k1"));
        let keys = Arc::new(KeyCache::new(source.clone(), None));
        (TokenValidator::new(&config(), keys), source)
    }

    fn sign(claims: serde_json::Value, kid: Option<&str>, pem: &[u8]) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(String::from);
        jsonwebtoken::encode(&header, &claims, &EncodingKey::from_rsa_pem(pem).unwrap()).unwrap()
    }

    fn good_claims() -> serde_json::Value {
        json!({ "iss": ISSUER, "aud": [AUDIENCE, "other"], "exp": NOW + 600, "sub": "user-1" })
    }

    #[tokio::test]
    async fn test_valid_token() {
        let (validator, _) = validator();
        let token = sign(good_claims(), Some("k1"), PRIVATE_PEM);
        match validator.validate_at(&token, NOW).await {
            ValidationOutcome::Valid(claims) => {
                assert_eq!(claims.subject.as_deref(), Some("user-1"));
            }
            other => panic!("expected valid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_token_without_kid_uses_sole_key() {
        let (validator, _) = validator();
        let token = sign(good_claims(), None, PRIVATE_PEM);
        assert!(validator.validate_at(&token, NOW).await.is_valid());
    }

    #[tokio::test]
    async fn test_garbage_is_malformed() {
        let (validator, source) = validator();
        assert!(matches!(
            validator.validate_at("not-a-token", NOW).await,
            ValidationOutcome::Malformed
        ));
        assert_eq!(source.fetches(), 0);
    }

    #[tokio::test]
    async fn test_wrong_key_is_invalid_signature() {
        let (validator, _) = validator();
        let token = sign(good_claims(), Some("k1"), ROGUE_PEM);
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::InvalidSignature
        ));
    }

    #[tokio::test]
    async fn test_bad_signature_hides_claim_failures() {
        let (validator, _) = validator();
        let claims = json!({ "iss": "https://evil/", "aud": "x", "exp": 1 });
        let token = sign(claims, Some("k1"), ROGUE_PEM);
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::InvalidSignature
        ));
    }

    #[tokio::test]
    async fn test_unknown_kid_is_invalid_signature() {
        let (validator, _) = validator();
        let token = sign(good_claims(), Some("unknown"), PRIVATE_PEM);
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::InvalidSignature
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_invalid_signature() {
        let (validator, source) = validator();
        source.fail.store(true, Ordering::SeqCst);
        let token = sign(good_claims(), Some("k1"), PRIVATE_PEM);
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::InvalidSignature
        ));
    }

    #[tokio::test]
    async fn test_unaccepted_algorithm_is_invalid_signature() {
        let (validator, _) = validator();
        let header = Header::new(Algorithm::HS256);
        let token = jsonwebtoken::encode(
            &header,
            &good_claims(),
            &EncodingKey::from_secret(b"shared-secret"),
        )
        .unwrap();
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::InvalidSignature
        ));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let (validator, _) = validator();
        let mut claims = good_claims();
        claims["exp"] = json!(NOW - 1);
        let token = sign(claims, Some("k1"), PRIVATE_PEM);
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::Expired
        ));
    }

    #[tokio::test]
    async fn test_expiry_equal_to_now_is_expired() {
        let (validator, _) = validator();
        let mut claims = good_claims();
        claims["exp"] = json!(NOW);
        let token = sign(claims, Some("k1"), PRIVATE_PEM);
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::Expired
        ));
    }

    #[tokio::test]
    async fn test_leeway_tolerates_clock_skew() {
        let source = StaticSource::new(test_jwks("k1"));
        let keys = Arc::new(KeyCache::new(source, None));
        let mut cfg = config();
        cfg.leeway_secs = 60;
        let validator = TokenValidator::new(&cfg, keys);

        let mut claims = good_claims();
        claims["exp"] = json!(NOW - 30);
        let token = sign(claims, Some("k1"), PRIVATE_PEM);
        assert!(validator.validate_at(&token, NOW).await.is_valid());
    }

    #[tokio::test]
    async fn test_not_yet_valid_token() {
        let (validator, _) = validator();
        let mut claims = good_claims();
        claims["nbf"] = json!(NOW + 300);
        let token = sign(claims, Some("k1"), PRIVATE_PEM);
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::Expired
        ));
    }

    #[tokio::test]
    async fn test_wrong_issuer() {
        let (validator, _) = validator();
        let mut claims = good_claims();
        claims["iss"] = json!("https://issuer.example.com");
        let token = sign(claims, Some("k1"), PRIVATE_PEM);
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::InvalidIssuer
        ));
    }

    #[tokio::test]
    async fn test_wrong_audience() {
        let (validator, _) = validator();
        let mut claims = good_claims();
        claims["aud"] = json!("https://someone-else.example.com");
        let token = sign(claims, Some("k1"), PRIVATE_PEM);
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::InvalidAudience
        ));
    }

    #[tokio::test]
    async fn test_first_failing_check_wins() {
        let (validator, _) = validator();
        let claims = json!({ "iss": "https://evil/", "aud": "x", "exp": NOW - 10 });
        let token = sign(claims, Some("k1"), PRIVATE_PEM);
        assert!(matches!(
            validator.validate_at(&token, NOW).await,
            ValidationOutcome::Expired
        ));
    }

    #[tokio::test]
    async fn test_repeated_validation_is_idempotent() {
        let (validator, source) = validator();
        let token = sign(good_claims(), Some("k1"), PRIVATE_PEM);
        for _ in 0..3 {
            assert!(validator.validate_at(&token, NOW).await.is_valid());
        }
        assert_eq!(source.fetches(), 1);
    }
}
