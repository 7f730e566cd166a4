use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<TokenRejection> for AppError {
    fn from(reason: TokenRejection) -> Self {
        AppError::Auth(AuthError::InvalidToken(reason))
    }
}

impl AppError {
    /// Stable error code for clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(e) => e.error_code(),
            AppError::Directory(_) => "DIR_001",
            AppError::ConfigError(_) => "CFG_001",
            AppError::InternalError(_) => "INT_001",
            AppError::ValidationError(_) => "VAL_001",
        }
    }

    /// Message shown to the end user. Server-side faults never expose
    /// their detail, and every "who are you" failure reads the same.
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(e) => e.public_message().to_string(),
            AppError::ValidationError(msg) => msg.clone(),
            _ => "An internal server error occurred".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "code": self.error_code(),
                "message": self.sanitized_message()
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials
                | AuthError::UserGone
                | AuthError::InvalidToken(_)
                | AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                AuthError::Denied => StatusCode::FORBIDDEN,
                AuthError::ConfigurationError(_) | AuthError::DirectoryUnavailable(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Why a presented token was not accepted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    #[error("token is malformed or its signature does not verify")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token kind does not match")]
    WrongKind,

    #[error("token carries no subject")]
    MissingSubject,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    #[error("missing or malformed bearer credential")]
    Missing,

    #[error("{0}")]
    Token(TokenRejection),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Stored credential is unusable: {0}")]
    ConfigurationError(String),

    #[error("Invalid token: {0}")]
    InvalidToken(TokenRejection),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(UnauthenticatedReason),

    #[error("User no longer exists")]
    UserGone,

    #[error("Forbidden")]
    Denied,

    #[error("User directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

impl AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials | AuthError::UserGone => "AUTH_001",
            AuthError::InvalidToken(_) | AuthError::Unauthenticated(_) => "AUTH_002",
            AuthError::Denied => "AUTH_003",
            AuthError::ConfigurationError(_) | AuthError::DirectoryUnavailable(_) => "AUTH_500",
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials | AuthError::UserGone => "Invalid credentials",
            AuthError::InvalidToken(_) | AuthError::Unauthenticated(_) => {
                "Invalid authentication credentials"
            }
            AuthError::Denied => "Forbidden",
            AuthError::ConfigurationError(_) | AuthError::DirectoryUnavailable(_) => {
                "Error during authentication"
            }
        }
    }
}

/// Failures reported by the external User Directory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use std::io;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::InternalError(_)));

        let config_err = config::ConfigError::NotFound(String::from("key not found"));
        let app_err: AppError = config_err.into();
        assert!(matches!(app_err, AppError::ConfigError(_)));

        let app_err: AppError = TokenRejection::Expired.into();
        assert!(matches!(
            app_err,
            AppError::Auth(AuthError::InvalidToken(TokenRejection::Expired))
        ));
    }

    #[test]
    fn test_error_status_codes() {
        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = AppError::Auth(AuthError::UserGone);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = AppError::Auth(AuthError::Unauthenticated(UnauthenticatedReason::Missing));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = AppError::Auth(AuthError::Denied);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = AppError::Auth(AuthError::ConfigurationError("no digest".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::ValidationError("weak password".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = AppError::Directory(DirectoryError::Unavailable("timeout".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_display() {
        let err = AppError::ValidationError("test error".to_string());
        assert_eq!(err.to_string(), "Validation error: test error");

        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(err.to_string(), "Authentication error: Invalid credentials");

        let err = AppError::Auth(AuthError::InvalidToken(TokenRejection::WrongKind));
        assert_eq!(
            err.to_string(),
            "Authentication error: Invalid token: token kind does not match"
        );
    }

    #[actix_web::test]
    async fn test_invalid_credentials_and_user_gone_are_indistinguishable() {
        let a = AppError::Auth(AuthError::InvalidCredentials).error_response();
        let b = AppError::Auth(AuthError::UserGone).error_response();
        assert_eq!(a.status(), b.status());

        let a = to_bytes(a.into_body()).await.unwrap();
        let b = to_bytes(b.into_body()).await.unwrap();
        assert_eq!(a, b);
    }

    #[actix_web::test]
    async fn test_internal_detail_is_not_leaked() {
        let resp = AppError::Auth(AuthError::ConfigurationError(
            "user u1 has no password stored".into(),
        ))
        .error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["message"], "Error during authentication");
        assert_eq!(body["error"]["status"], 500);
    }
}
