pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod telemetry;

use std::sync::Arc;

pub use error::{AppError, AuthError, DirectoryError, TokenRejection, UnauthenticatedReason};
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthService, AuthenticatedUser, Identity, TokenKind, TokenPair, TokenService};
pub use directory::{InMemoryDirectory, ResourceOwnerCheck, StoredCredential, UserDirectory};

use auth::{Clock, CredentialHasher, IdentityResolver, PasswordPolicy, SystemClock};

/// Everything the auth core needs, built once at startup and shared by
/// every request handler.
#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<Settings>,
    pub hasher: CredentialHasher,
    pub policy: PasswordPolicy,
    pub tokens: Arc<TokenService>,
    pub resolver: IdentityResolver,
    pub auth_service: Arc<AuthService>,
}

impl AuthState {
    pub fn new(config: Settings, directory: Arc<dyn UserDirectory>) -> Result<Self> {
        Self::with_clock(config, directory, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: Settings,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let hasher = CredentialHasher::new(&config.password)?;
        let policy = PasswordPolicy::from(&config.password);
        let tokens = Arc::new(TokenService::from_config(&config.auth, clock)?);
        let resolver = IdentityResolver::new(tokens.clone());
        let auth_service = Arc::new(AuthService::new(directory, tokens.clone(), hasher.clone())?);

        Ok(Self {
            config: Arc::new(config),
            hasher,
            policy,
            tokens,
            resolver,
            auth_service,
        })
    }
}
