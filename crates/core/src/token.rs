//! HS256 session tokens.
//!
//! A token is a compact JWT carrying the username (`sub`), the account id
//! (`userId`), a unique `jti`, and `iat`/`exp` timestamps. Lifetime is fixed
//! at [`TOKEN_LIFETIME_DAYS`]. Revocation is not implemented: [`TokenCodec::revoke`]
//! is a no-op and a token stays valid until it expires.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Token lifetime in days.
pub const TOKEN_LIFETIME_DAYS: i64 = 30;

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject -- the account's username.
    pub sub: String,
    /// The account's numeric id, in string form.
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Unique token identifier (UUID v4).
    pub jti: String,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

impl TokenClaims {
    pub fn issued_at(&self) -> Option<Timestamp> {
        Timestamp::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        Timestamp::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Token signature does not verify")]
    BadSignature,

    #[error("Token cannot be parsed")]
    Malformed,

    #[error("Token uses an unsupported algorithm")]
    UnsupportedVariant,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => TokenError::UnsupportedVariant,
            _ => TokenError::Malformed,
        }
    }
}

/// Signing configuration, built once at startup.
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub lifetime: chrono::Duration,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenConfig {
    /// Build a config with the standard 30-day lifetime.
    ///
    /// Rejects secrets shorter than [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: impl Into<String>) -> Result<Self, CoreError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(CoreError::Validation(format!(
                "Token secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        Ok(Self {
            secret,
            lifetime: chrono::Duration::days(TOKEN_LIFETIME_DAYS),
        })
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            lifetime: config.lifetime,
            clock,
        }
    }

    /// Issue a signed token for `subject` owned by account `owner_id`.
    pub fn issue(&self, subject: &str, owner_id: &str) -> Result<String, TokenError> {
        let now = self.clock.utc();
        let claims = TokenClaims {
            sub: subject.to_string(),
            user_id: owner_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify the signature and expiry of `token` and return its claims.
    ///
    /// A header naming an algorithm outside the JWS set (such as `none`) is
    /// unsupported. Otherwise the signature is checked first; a token is
    /// expired once the current time is strictly past `exp`.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        if let Err(err) = decode_header(token) {
            return Err(match declared_algorithm(token) {
                Some(alg) if alg.parse::<Algorithm>().is_err() => {
                    tracing::debug!(alg = %alg, "Token declares an unknown algorithm");
                    TokenError::UnsupportedVariant
                }
                _ => err.into(),
            });
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["sub", "exp"]);

        let claims = decode::<TokenClaims>(token, &self.decoding, &validation)?.claims;
        if self.clock.utc().timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// The username carried by a valid token.
    pub fn subject_of(&self, token: &str) -> Result<String, TokenError> {
        self.validate(token).map(|claims| claims.sub)
    }

    /// Declared for callers that want logout semantics; tokens cannot be
    /// revoked before expiry, so this does nothing.
    pub fn revoke(&self, _token: &str) {
        tracing::debug!("Token revocation requested; tokens remain valid until expiry");
    }
}

/// The raw `alg` of a token header, read without interpreting it.
fn declared_algorithm(token: &str) -> Option<String> {
    let header = token.split('.').next()?;
    let raw = URL_SAFE_NO_PAD.decode(header.trim_end_matches('=')).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&raw).ok()?;
    value.get("alg")?.as_str().map(str::to_string)
}
