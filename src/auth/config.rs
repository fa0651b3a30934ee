use crate::auth::{AuthError, AuthResult};

/// Authentication configuration loaded from environment variables.
///
/// Signing secrets are read once at startup and injected into the token
/// service at construction; request-handling code never touches the
/// environment. Access and refresh tokens each carry their own secret so a
/// token of one class can never be replayed as the other.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub access_cookie_name: String,
    pub refresh_cookie_name: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let access_token_secret = std::env::var("VIDTUBE_ACCESS_TOKEN_SECRET")
            .map_err(|_| AuthError::Config("VIDTUBE_ACCESS_TOKEN_SECRET is required".into()))?;
        let refresh_token_secret = std::env::var("VIDTUBE_REFRESH_TOKEN_SECRET")
            .map_err(|_| AuthError::Config("VIDTUBE_REFRESH_TOKEN_SECRET is required".into()))?;

        if access_token_secret == refresh_token_secret {
            return Err(AuthError::Config(
                "access and refresh token secrets must differ".into(),
            ));
        }

        let access_token_ttl_secs = std::env::var("VIDTUBE_ACCESS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(60 * 60);
        let refresh_token_ttl_secs = std::env::var("VIDTUBE_REFRESH_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(10 * 24 * 60 * 60);
        let access_cookie_name = std::env::var("VIDTUBE_ACCESS_COOKIE_NAME")
            .unwrap_or_else(|_| "access_token".into());
        let refresh_cookie_name = std::env::var("VIDTUBE_REFRESH_COOKIE_NAME")
            .unwrap_or_else(|_| "refresh_token".into());
        let cookie_domain = std::env::var("VIDTUBE_COOKIE_DOMAIN").ok();
        let cookie_secure = std::env::var("VIDTUBE_COOKIE_SECURE")
            .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "on"))
            .unwrap_or(true);

        Ok(Self {
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            access_cookie_name,
            refresh_cookie_name,
            cookie_domain,
            cookie_secure,
        })
    }
}
