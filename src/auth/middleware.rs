//! Bearer-token identity resolution for inbound requests.
//!
//! [`IdentityResolver`] is transport-agnostic: it takes the raw
//! `Authorization` header value. [`AuthenticatedUser`] wires it into
//! actix-web as an extractor, so a handler that names it in its signature
//! only runs for a caller holding a valid access token.

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{guard, Identity, TokenKind, TokenService};
use crate::error::{AppError, AuthError, UnauthenticatedReason};
use crate::AuthState;

/// Extracts the credential from a `Bearer <token>` header value. The scheme
/// is case-insensitive; the token must be a single non-empty word.
pub fn bearer_token(header_value: Option<&str>) -> Option<&str> {
    let (scheme, credentials) = header_value?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let credentials = credentials.trim();
    if credentials.is_empty() || credentials.contains(char::is_whitespace) {
        return None;
    }
    Some(credentials)
}

/// Resolves an `Authorization` header to the caller's identity. Pure CPU
/// work; the User Directory is not consulted.
#[derive(Clone)]
pub struct IdentityResolver {
    tokens: Arc<TokenService>,
}

impl IdentityResolver {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    pub fn resolve(&self, header_value: Option<&str>) -> Result<Identity, UnauthenticatedReason> {
        let token = bearer_token(header_value).ok_or(UnauthenticatedReason::Missing)?;
        self.tokens
            .validate(token, TokenKind::Access)
            .map_err(UnauthenticatedReason::Token)
    }
}

/// The resolved caller, scoped to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub subject: Identity,
}

impl AuthenticatedUser {
    /// Guard a per-user operation: succeed only if the caller owns it.
    pub fn authorize(&self, owner: &Identity) -> crate::Result<()> {
        let decision = guard::authorize(&self.subject, owner);
        if !decision.is_allowed() {
            warn!("User {} denied access to resource owned by {}", self.subject, owner);
        }
        decision.into_result()
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> crate::Result<AuthenticatedUser> {
    if let Some(user) = req.extensions().get::<AuthenticatedUser>() {
        return Ok(user.clone());
    }

    let state = req.app_data::<web::Data<AuthState>>().ok_or_else(|| {
        AppError::InternalError("AuthState is not registered as app data".to_string())
    })?;

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match state.resolver.resolve(header_value) {
        Ok(subject) => {
            debug!("User {} authenticated successfully", subject);
            let user = AuthenticatedUser { subject };
            req.extensions_mut().insert(user.clone());
            Ok(user)
        }
        Err(reason) => {
            warn!("Authentication failed for {}: {}", req.path(), reason);
            Err(AuthError::Unauthenticated(reason).into())
        }
    }
}
