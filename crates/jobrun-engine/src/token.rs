//! Scoped public access tokens.
//!
//! Tokens grant read access to the progress of runs carrying specific
//! tags. They are signed JWTs, so a holder cannot widen its tag scope or
//! push out its expiry without the signature failing verification.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::duration::parse_duration;

/// Fallback lifetime for tokens created with an unparseable duration.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(15 * 60);

/// Errors from token creation.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Read scope: the tags a token may query progress for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadScope {
    /// Tags the holder may read.
    pub tags: Vec<String>,
}

/// Scopes embedded in a public token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenScopes {
    /// Read scope.
    pub read: ReadScope,
}

impl TokenScopes {
    /// Scopes granting read access to the given tags.
    pub fn read_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            read: ReadScope {
                tags: tags.into_iter().map(Into::into).collect(),
            },
        }
    }
}

/// Result of verifying a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Tags the token grants read access to.
    pub tags: Vec<String>,

    /// Whether the token's expiration time has passed. Expiry is reported
    /// rather than enforced; callers decide how to treat stale tokens.
    pub expired: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    tags: Vec<String>,
    exp: i64,
    jti: String,
}

/// Issues and verifies the signed tokens that guard public progress reads.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    /// Create an issuer from an HS256 secret.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Create a public token scoped to `scopes`.
    ///
    /// `expiration_time` is a compact duration string (`"30s"`, `"15m"`,
    /// `"2h"`); anything unparseable silently falls back to 15 minutes.
    pub fn create_public_token(
        &self,
        scopes: TokenScopes,
        expiration_time: &str,
    ) -> Result<String, TokenError> {
        let lifetime = match parse_duration(expiration_time) {
            Some(lifetime) => lifetime,
            None => {
                debug!(
                    expiration_time = %expiration_time,
                    "Unparseable token lifetime, using default"
                );
                DEFAULT_TOKEN_LIFETIME
            }
        };
        let claims = TokenClaims {
            tags: scopes.read.tags,
            exp: Utc::now().timestamp() + lifetime.as_secs() as i64,
            jti: Uuid::new_v4().to_string(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify a token's signature and decode its scopes.
    ///
    /// Returns `None` when the token is malformed or was not signed with
    /// this issuer's secret. An expired token still verifies; the result
    /// carries an `expired` flag instead.
    pub fn verify(&self, token: &str) -> Option<VerifiedToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation).ok()?;
        Some(VerifiedToken {
            expired: data.claims.exp < Utc::now().timestamp(),
            tags: data.claims.tags,
        })
    }
}
