use std::sync::Arc;
use tracing::{error, info, warn};

use super::{token_fingerprint, CredentialHasher, TokenKind, TokenPair, TokenService};
use crate::directory::UserDirectory;
use crate::error::{AppError, AuthError, DirectoryError};

/// Turns an email/password pair, or a refresh token, into a fresh token pair.
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    tokens: Arc<TokenService>,
    hasher: CredentialHasher,
    // Verified against when the email is unknown, so both rejections cost
    // the same hashing work.
    decoy_digest: String,
}

impl AuthService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        tokens: Arc<TokenService>,
        hasher: CredentialHasher,
    ) -> crate::Result<Self> {
        let decoy_digest = hasher.hash(&uuid::Uuid::new_v4().to_string())?;
        Ok(Self {
            directory,
            tokens,
            hasher,
            decoy_digest,
        })
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    pub async fn login(&self, email: &str, password: &str) -> crate::Result<TokenPair> {
        let email_tag = email_fingerprint(email);
        info!(email = %email_tag, "Login attempt");

        let record = self
            .directory
            .find_by_email(email)
            .await
            .map_err(directory_fault)?;

        let record = match record {
            Some(record) => record,
            None => {
                // Result ignored: this call only equalizes timing with the known-email path.
                let _ = self
                    .hasher
                    .verify_blocking(password.to_string(), self.decoy_digest.clone())
                    .await;
                warn!(email = %email_tag, "Login attempt with non-existent email");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let digest = match record.password_hash {
            Some(digest) if !digest.is_empty() => digest,
            _ => {
                error!("User {} has no password stored", record.identity);
                return Err(AuthError::ConfigurationError(format!(
                    "no stored password digest for user {}",
                    record.identity
                ))
                .into());
            }
        };

        if !self.hasher.verify_blocking(password.to_string(), digest).await? {
            warn!("Invalid password attempt for user: {}", record.identity);
            return Err(AuthError::InvalidCredentials.into());
        }

        let pair = self.tokens.issue_pair(&record.identity)?;
        info!("User {} logged in successfully", record.identity);
        Ok(pair)
    }

    /// Rotate: a valid refresh token for a still-existing user buys a new
    /// access token and a new refresh token. The old one is not revoked.
    pub async fn refresh(&self, refresh_token: &str) -> crate::Result<TokenPair> {
        let subject = self
            .tokens
            .validate(refresh_token, TokenKind::Refresh)
            .map_err(|reason| {
                warn!(
                    token = %token_fingerprint(refresh_token),
                    "Refresh rejected: {}",
                    reason
                );
                AuthError::InvalidToken(reason)
            })?;

        let exists = self.directory.exists(&subject).await.map_err(directory_fault)?;
        if !exists {
            warn!("Refresh token for non-existent user: {}", subject);
            return Err(AuthError::UserGone.into());
        }

        let pair = self.tokens.issue_pair(&subject)?;
        info!("Token refreshed for user: {}", subject);
        Ok(pair)
    }
}

/// Emails never reach the logs in clear; this stable tag lets attempts on
/// one address be correlated.
fn email_fingerprint(email: &str) -> String {
    token_fingerprint(&email.trim().to_lowercase())
}

fn directory_fault(err: DirectoryError) -> AppError {
    error!("User directory call failed: {}", err);
    AuthError::DirectoryUnavailable(err.to_string()).into()
}
