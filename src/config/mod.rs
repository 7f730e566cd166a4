use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Secret shipped in the default layer so a fresh checkout starts. Refused
/// outside development and test.
pub const DEVELOPMENT_SECRET: &str = "development_secret";

/// Upper bound on `auth.access_token_expire_minutes` (one year).
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 60 * 24 * 365;
/// Upper bound on `auth.refresh_token_expire_days` (ten years).
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365 * 10;

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
}

impl AuthConfig {
    /// Parses `jwt_algorithm`, accepting only the shared-secret HMAC family.
    pub fn algorithm(&self) -> Result<Algorithm, ConfigError> {
        let alg = Algorithm::from_str(&self.jwt_algorithm).map_err(|_| {
            ConfigError::Message(format!("unknown JWT algorithm '{}'", self.jwt_algorithm))
        })?;
        match alg {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(alg),
            other => Err(ConfigError::Message(format!(
                "JWT algorithm {:?} needs a key pair; only HS256, HS384 and HS512 are supported",
                other
            ))),
        }
    }
}

/// Argon2 work factor and registration password policy.
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub min_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub auth: AuthConfig,
    pub password: PasswordConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::defaults()?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_AUTH__JWT_SECRET=...` sets `Settings.auth.jwt_secret`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Deterministic settings with a cheap hashing work factor.
    pub fn new_for_test() -> Result<Self, ConfigError> {
        Self::defaults()?
            .set_override("environment", "test")?
            .set_override("auth.jwt_secret", "test_secret")?
            .set_override("password.memory_kib", 64)?
            .set_override("password.iterations", 1)?
            .set_override("logging.level", "debug")?
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults every other layer overrides.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", "development")?
            .set_default("auth.jwt_secret", DEVELOPMENT_SECRET)?
            .set_default("auth.jwt_algorithm", "HS256")?
            .set_default("auth.access_token_expire_minutes", 30)?
            .set_default("auth.refresh_token_expire_days", 7)?
            .set_default("password.memory_kib", 19_456)?
            .set_default("password.iterations", 2)?
            .set_default("password.parallelism", 1)?
            .set_default("password.min_length", 8)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = &self.auth;
        if auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret must not be empty".into()));
        }
        let relaxed = matches!(self.environment.as_str(), "development" | "test");
        if !relaxed && auth.jwt_secret == DEVELOPMENT_SECRET {
            return Err(ConfigError::Message(format!(
                "auth.jwt_secret still has the development default in '{}'",
                self.environment
            )));
        }
        auth.algorithm()?;
        if auth.access_token_expire_minutes <= 0 || auth.refresh_token_expire_days <= 0 {
            return Err(ConfigError::Message("token lifetimes must be positive".into()));
        }
        if auth.access_token_expire_minutes > MAX_ACCESS_TOKEN_MINUTES {
            return Err(ConfigError::Message(format!(
                "auth.access_token_expire_minutes must be at most {}",
                MAX_ACCESS_TOKEN_MINUTES
            )));
        }
        if auth.refresh_token_expire_days > MAX_REFRESH_TOKEN_DAYS {
            return Err(ConfigError::Message(format!(
                "auth.refresh_token_expire_days must be at most {}",
                MAX_REFRESH_TOKEN_DAYS
            )));
        }
        let refresh_minutes = auth
            .refresh_token_expire_days
            .checked_mul(24 * 60)
            .ok_or_else(|| ConfigError::Message("refresh token lifetime overflows".into()))?;
        if refresh_minutes <= auth.access_token_expire_minutes {
            return Err(ConfigError::Message(
                "refresh tokens must outlive access tokens".into(),
            ));
        }

        let pw = &self.password;
        if pw.memory_kib == 0 || pw.iterations == 0 || pw.parallelism == 0 {
            return Err(ConfigError::Message("argon2 parameters must be non-zero".into()));
        }
        if pw.min_length == 0 {
            return Err(ConfigError::Message("password.min_length must be non-zero".into()));
        }
        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => Ok(()),
            other => Err(ConfigError::Message(format!("unknown log format '{}'", other))),
        }
    }
}
