//! Password hashing, verification and the registration password policy.
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use super::Identity;
use crate::config::PasswordConfig;
use crate::error::AppError;

/// Symbols a password may use besides ASCII letters and digits.
pub const SPECIAL_CHARACTERS: &str = "@$!%*#?&";

/// One-way, self-salted password digests (argon2id, PHC string format).
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(config: &PasswordConfig) -> crate::Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AppError::ConfigError(format!("invalid argon2 parameters: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash with a fresh random salt. Failure here means the entropy source
    /// or the parameters are broken, so it surfaces as a configuration error.
    pub fn hash(&self, plain: &str) -> crate::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Password hashing failed: {}", e);
                AppError::ConfigError(format!("password hashing failed: {}", e))
            })
    }

    /// `false` for a wrong password and for a digest that does not parse.
    /// The parameters embedded in the digest are the ones used to check it.
    pub fn verify(&self, plain: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(h) => h,
            Err(_) => return false,
        };
        self.argon2.verify_password(plain.as_bytes(), &parsed).is_ok()
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_blocking(&self, plain: String) -> crate::Result<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| AppError::InternalError(format!("hashing task failed: {}", e)))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_blocking(&self, plain: String, digest: String) -> crate::Result<bool> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &digest))
            .await
            .map_err(|e| AppError::InternalError(format!("verification task failed: {}", e)))
    }
}

/// Rules a new password must satisfy.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl From<&PasswordConfig> for PasswordPolicy {
    fn from(config: &PasswordConfig) -> Self {
        Self {
            min_length: config.min_length,
        }
    }
}

/// At least `min_length` characters drawn from letters, digits and
/// [`SPECIAL_CHARACTERS`], with at least one of each class.
pub fn validate_password_strength(password: &str, policy: &PasswordPolicy) -> crate::Result<()> {
    let is_special = |c: char| SPECIAL_CHARACTERS.contains(c);

    if password.chars().count() < policy.min_length {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters long",
            policy.min_length
        )));
    }
    if !password.chars().all(|c| c.is_ascii_alphanumeric() || is_special(c)) {
        return Err(AppError::ValidationError(format!(
            "Password may only contain letters, digits and {}",
            SPECIAL_CHARACTERS
        )));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(is_special);
    if !(has_letter && has_digit && has_special) {
        return Err(AppError::ValidationError(
            "Password must contain at least one letter, one number, and one special character"
                .to_string(),
        ));
    }
    Ok(())
}

/// The stored secret for one principal. Replaced wholesale on password change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub identity: Identity,
    pub password_hash: String,
}

impl Credential {
    /// Check the policy, then hash. Used for registration and for password
    /// change alike.
    pub fn register(
        identity: Identity,
        password: &str,
        hasher: &CredentialHasher,
        policy: &PasswordPolicy,
    ) -> crate::Result<Self> {
        validate_password_strength(password, policy)?;
        Ok(Self {
            identity,
            password_hash: hasher.hash(password)?,
        })
    }
}
