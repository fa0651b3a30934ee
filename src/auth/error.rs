use rocket::http::Status;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failure taxonomy for the credential and session subsystem.
///
/// `TokenExpired` and `TokenInvalid` are internal verifier signals; the
/// refresh flow and the request guard collapse both into `Unauthorized`
/// before anything reaches a client, so callers cannot distinguish an
/// expired token from a rotated or forged one.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("token expired")]
    TokenExpired,
    #[error("token invalid")]
    TokenInvalid,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Sqlx(#[from] rocket_db_pools::sqlx::Error),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("argon2 parameter error: {0}")]
    Argon2(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("asset upload error: {0}")]
    Asset(String),
    #[error("unexpected error: {0}")]
    Other(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::InvalidInput(_) => Status::BadRequest,
            AuthError::Conflict(_) => Status::Conflict,
            AuthError::NotFound(_) => Status::NotFound,
            AuthError::Unauthorized | AuthError::TokenExpired | AuthError::TokenInvalid => {
                Status::Unauthorized
            }
            AuthError::Config(_)
            | AuthError::Sqlx(_)
            | AuthError::Jwt(_)
            | AuthError::Argon2(_)
            | AuthError::PasswordHash(_)
            | AuthError::Asset(_)
            | AuthError::Other(_) => Status::InternalServerError,
        }
    }

    /// Collapse credential and verifier failures into the blanket 401.
    /// Internal-class errors pass through so they still surface as 500.
    pub fn into_unauthorized(self) -> Self {
        match self {
            AuthError::Unauthorized
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::InvalidInput(_)
            | AuthError::NotFound(_) => AuthError::Unauthorized,
            other => other,
        }
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::Argon2(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}
