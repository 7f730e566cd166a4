//! Authentication and authorization core.
//!
//! Credential hashing, signed token issuance and validation, per-request
//! identity resolution, the self-ownership guard, and the login/refresh
//! orchestration that ties them to the User Directory.

mod clock;
mod identity;
mod password;
mod token;
pub mod guard;
pub mod middleware;
mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{authorize, Decision};
pub use identity::Identity;
pub use middleware::{bearer_token, AuthenticatedUser, IdentityResolver};
pub use password::{
    validate_password_strength, Credential, CredentialHasher, PasswordPolicy, SPECIAL_CHARACTERS,
};
pub use service::AuthService;
pub use token::{token_fingerprint, Claims, TokenKind, TokenPair, TokenService, ValidatedToken};
