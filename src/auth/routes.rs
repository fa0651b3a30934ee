use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use time::Duration as TimeDuration;

use crate::auth::guards::AuthUser;
use crate::auth::responses::{
    AccountView, ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest,
    RefreshResponse, RegisterRequest,
};
use crate::auth::sessions::Registration;
use crate::auth::tokens::SignedToken;
use crate::auth::{AuthError, AuthState};
use crate::models::{ApiResponse, EmptyResponse};

type AuthRouteResult<T> = Result<Json<ApiResponse<T>>, status::Custom<Json<AuthErrorResponse>>>;

#[derive(Debug, serde::Serialize, JsonSchema)]
pub struct AuthErrorResponse {
    pub status: u16,
    pub message: String,
}

#[openapi(tag = "Users")]
#[post("/users/register", data = "<payload>")]
pub async fn register(
    state: &State<AuthState>,
    payload: Json<RegisterRequest>,
) -> AuthRouteResult<AccountView> {
    let payload = payload.into_inner();

    let account = state
        .sessions
        .register(Registration {
            full_name: payload.full_name,
            username: payload.username,
            password: payload.password,
            email: payload.email,
            avatar_path: payload.avatar,
            cover_image_path: payload.cover_image,
        })
        .await
        .map_err(respond_error)?;

    Ok(Json(ApiResponse::new(
        account,
        "account registered successfully",
    )))
}

#[openapi(tag = "Users")]
#[post("/users/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    payload: Json<LoginRequest>,
) -> AuthRouteResult<LoginResponse> {
    let payload = payload.into_inner();

    let session = state
        .sessions
        .login(
            payload.username.as_deref(),
            payload.email.as_deref(),
            &payload.password,
        )
        .await
        .map_err(respond_error)?;

    set_token_cookie(cookies, state, &state.config.access_cookie_name, &session.access);
    set_token_cookie(cookies, state, &state.config.refresh_cookie_name, &session.refresh);

    Ok(Json(ApiResponse::new(
        LoginResponse {
            access_token: session.access.token,
            refresh_token: session.refresh.token,
            account: session.account,
        },
        "logged in successfully",
    )))
}

#[openapi(tag = "Users")]
#[post("/users/refresh", data = "<payload>")]
pub async fn refresh(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    payload: Option<Json<RefreshRequest>>,
) -> AuthRouteResult<RefreshResponse> {
    // Cookie first, JSON body as the fallback for non-browser clients.
    let presented = cookies
        .get(&state.config.refresh_cookie_name)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| payload.and_then(|body| body.into_inner().refresh_token));

    let rotated = state
        .sessions
        .refresh(presented.as_deref())
        .await
        .map_err(respond_error)?;

    set_token_cookie(cookies, state, &state.config.access_cookie_name, &rotated.access);
    set_token_cookie(cookies, state, &state.config.refresh_cookie_name, &rotated.refresh);

    Ok(Json(ApiResponse::new(
        RefreshResponse {
            access_token: rotated.access.token,
            refresh_token: rotated.refresh.token,
        },
        "session refreshed",
    )))
}

#[openapi(tag = "Users")]
#[post("/users/logout")]
pub async fn logout(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    user: AuthUser,
) -> AuthRouteResult<EmptyResponse> {
    state
        .sessions
        .logout(user.id)
        .await
        .map_err(respond_error)?;

    clear_token_cookies(cookies, state);

    Ok(Json(ApiResponse::new(EmptyResponse {}, "logged out")))
}

#[openapi(tag = "Users")]
#[get("/users/me")]
pub async fn current_account(user: AuthUser) -> AuthRouteResult<AccountView> {
    Ok(Json(ApiResponse::new(user.account, "current account")))
}

#[openapi(tag = "Users")]
#[post("/users/password", data = "<payload>")]
pub async fn change_password(
    state: &State<AuthState>,
    user: AuthUser,
    payload: Json<ChangePasswordRequest>,
) -> AuthRouteResult<EmptyResponse> {
    let payload = payload.into_inner();

    state
        .sessions
        .change_password(user.id, &payload.current_password, &payload.new_password)
        .await
        .map_err(respond_error)?;

    Ok(Json(ApiResponse::new(EmptyResponse {}, "password changed")))
}

fn respond_error(err: AuthError) -> status::Custom<Json<AuthErrorResponse>> {
    let status = err.status();
    if status == Status::InternalServerError {
        log::error!("auth request failed: {}", err);
    }
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: err.to_string(),
        }),
    )
}

fn set_token_cookie(
    cookies: &CookieJar<'_>,
    state: &State<AuthState>,
    name: &str,
    token: &SignedToken,
) {
    let max_age_secs = (token.expires_at - chrono::Utc::now()).num_seconds().max(0);
    let mut cookie = Cookie::build((name.to_string(), token.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .max_age(TimeDuration::seconds(max_age_secs))
        .build();

    if let Some(domain) = &state.config.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookies.add(cookie);
}

fn clear_token_cookies(cookies: &CookieJar<'_>, state: &State<AuthState>) {
    for name in [
        &state.config.access_cookie_name,
        &state.config.refresh_cookie_name,
    ] {
        let mut cookie = Cookie::build((name.clone(), String::new()))
            .path("/")
            .removal()
            .build();

        if let Some(domain) = &state.config.cookie_domain {
            cookie.set_domain(domain.clone());
        }
        cookies.add(cookie);
    }
}
