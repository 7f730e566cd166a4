use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::{Clock, Identity};
use crate::config::AuthConfig;
use crate::error::{AppError, TokenRejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed payload of every token this crate issues.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub kind: TokenKind,
    pub exp: i64,     // Expiration time
    pub iat: i64,     // Issued at
    pub jti: String,  // Token ID
}

// Decoding is lenient about `sub` and `kind` so that their absence maps to
// its own rejection instead of collapsing into `Malformed`.
#[derive(Debug, Deserialize)]
struct PresentedClaims {
    sub: Option<String>,
    kind: Option<String>,
    exp: i64,
    iat: i64,
    jti: Option<String>,
}

/// What a successfully validated token attests to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken {
    pub subject: Identity,
    pub kind: TokenKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_id: Option<String>,
}

/// Access/refresh pair handed to a caller after login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenPair {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Short, non-reversible handle for a token, safe to put in logs.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Issues and validates HMAC-signed JWTs. Holds no mutable state; share it
/// behind an `Arc`.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        secret: &[u8],
        algorithm: Algorithm,
        access_ttl: Duration,
        refresh_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            access_ttl,
            refresh_ttl,
            clock,
        }
    }

    pub fn from_config(config: &AuthConfig, clock: Arc<dyn Clock>) -> crate::Result<Self> {
        let algorithm = config.algorithm()?;
        let access_ttl = Duration::try_minutes(config.access_token_expire_minutes)
            .ok_or_else(|| AppError::ConfigError("access token lifetime out of range".into()))?;
        let refresh_ttl = Duration::try_days(config.refresh_token_expire_days)
            .ok_or_else(|| AppError::ConfigError("refresh token lifetime out of range".into()))?;
        Ok(Self::new(
            config.jwt_secret.as_bytes(),
            algorithm,
            access_ttl,
            refresh_ttl,
            clock,
        ))
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access(&self, subject: &Identity) -> crate::Result<String> {
        self.issue(subject, TokenKind::Access)
    }

    pub fn issue_refresh(&self, subject: &Identity) -> crate::Result<String> {
        self.issue(subject, TokenKind::Refresh)
    }

    pub fn issue_pair(&self, subject: &Identity) -> crate::Result<TokenPair> {
        Ok(TokenPair::bearer(
            self.issue_access(subject)?,
            self.issue_refresh(subject)?,
        ))
    }

    fn issue(&self, subject: &Identity, kind: TokenKind) -> crate::Result<String> {
        let now = self.clock.now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            AppError::InternalError(format!("{} token expiry out of range", kind))
        })?;
        let claims = Claims {
            sub: subject.to_string(),
            kind,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("failed to sign {} token: {}", kind, e)))
    }

    /// Subject of a valid token of the expected kind.
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Identity, TokenRejection> {
        self.verify(token, expected).map(|t| t.subject)
    }

    /// Full validation. Checks run in order: signature and structure,
    /// expiry (`now >= exp` is expired, no leeway), kind, subject.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<ValidatedToken, TokenRejection> {
        let result = self.check(token, expected);
        if let Err(reason) = &result {
            debug!(
                token = %token_fingerprint(token),
                expected = %expected,
                "token rejected: {}",
                reason
            );
        }
        result
    }

    fn check(&self, token: &str, expected: TokenKind) -> Result<ValidatedToken, TokenRejection> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        let claims = decode::<PresentedClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenRejection::Malformed)?
            .claims;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenRejection::Expired);
        }

        let kind = match claims.kind.as_deref() {
            Some(k) if k == expected.as_str() => expected,
            _ => return Err(TokenRejection::WrongKind),
        };

        let subject = match claims.sub {
            Some(sub) if !sub.is_empty() => Identity::from(sub),
            _ => return Err(TokenRejection::MissingSubject),
        };

        Ok(ValidatedToken {
            subject,
            kind,
            issued_at: timestamp(claims.iat)?,
            expires_at: timestamp(claims.exp)?,
            token_id: claims.jti,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TokenRejection> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(TokenRejection::Malformed)
}
