use rocket::Request;
use rocket::State;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::request::OpenApiFromRequest;
use uuid::Uuid;

use crate::auth::responses::AccountView;
use crate::auth::tokens::TokenKind;
use crate::auth::{AuthConfig, AuthError, AuthResult, AuthState};

/// Authenticated identity attached to a request once the bearer token checks
/// out. Carries the stripped account view only; downstream handlers never
/// see the password hash or the stored refresh token.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct AuthUser {
    pub id: Uuid,
    pub account: AccountView,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match extract_identity(request).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

async fn extract_identity(request: &Request<'_>) -> AuthResult<AuthUser> {
    let state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    let token = bearer_token_from_request(request, &state.config)?;

    let verified = state
        .tokens
        .verify(&token, TokenKind::Access)
        .map_err(AuthError::into_unauthorized)?;

    let account = state
        .accounts
        .find_by_id(verified.account_id)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    Ok(AuthUser {
        id: account.id,
        account: AccountView::from(&account),
    })
}

/// Token extraction order: the access-token cookie first, then the
/// `Authorization: Bearer` header.
fn bearer_token_from_request(request: &Request<'_>, config: &AuthConfig) -> AuthResult<String> {
    if let Some(cookie) = request.cookies().get(&config.access_cookie_name) {
        let value = cookie.value();
        if !value.is_empty() {
            return Ok(value.to_string());
        }
    }

    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::Unauthorized)?;
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Ok(token.to_string())
    } else {
        Err(AuthError::Unauthorized)
    }
}
