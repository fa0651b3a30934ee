use rocket::http::{ContentType, Cookie, Header, Status};
use rocket::local::blocking::Client;
use rocket::routes;
use serde_json::{Value, json};
use vidtube_api::auth::routes::{
    change_password, current_account, login, logout, refresh, register,
};
use vidtube_api::test_support::{MemoryAuthHarness, TestRocketBuilder, memory_auth_state};

fn auth_client() -> (Client, MemoryAuthHarness) {
    let harness = memory_auth_state();
    let client = TestRocketBuilder::new()
        .mount_api_routes(routes![
            register,
            login,
            refresh,
            logout,
            current_account,
            change_password
        ])
        .manage_auth_state(harness.state.clone())
        .untracked_blocking_client();
    (client, harness)
}

fn register_ana(client: &Client) -> Value {
    let response = client
        .post("/api/v1/users/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "fullName": "Ana Example",
                "username": "ana",
                "password": "p1",
                "email": "ana@x.com",
                "avatar": "/tmp/ana-avatar.png"
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    response.into_json().expect("valid JSON payload")
}

fn login_ana(client: &Client) -> (String, String) {
    let response = client
        .post("/api/v1/users/login")
        .header(ContentType::JSON)
        .body(json!({ "username": "ana", "password": "p1" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    assert!(response.cookies().get("access_token").is_some());
    assert!(response.cookies().get("refresh_token").is_some());

    let payload: Value = response.into_json().expect("valid JSON payload");
    let access = payload["data"]["accessToken"].as_str().expect("access token");
    let refresh = payload["data"]["refreshToken"]
        .as_str()
        .expect("refresh token");
    (access.to_string(), refresh.to_string())
}

#[test]
fn register_strips_credentials_from_the_response() {
    let (client, _harness) = auth_client();
    let payload = register_ana(&client);

    let account = &payload["data"];
    assert_eq!(account["username"], "ana");
    assert_eq!(account["email"], "ana@x.com");
    assert_eq!(account["avatar"], "https://assets.test/ana-avatar.png");
    assert!(account.get("password").is_none());
    assert!(account.get("passwordHash").is_none());
    assert!(account.get("refreshToken").is_none());
}

#[test]
fn register_validates_input_and_uniqueness() {
    let (client, harness) = auth_client();

    // Empty required field.
    let response = client
        .post("/api/v1/users/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "fullName": "",
                "username": "ana",
                "password": "p1",
                "email": "ana@x.com",
                "avatar": "/tmp/ana-avatar.png"
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    // Failed avatar upload is a 400 as well.
    harness.assets.fail_path("/tmp/broken.png");
    let response = client
        .post("/api/v1/users/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "fullName": "Ana Example",
                "username": "ana",
                "password": "p1",
                "email": "ana@x.com",
                "avatar": "/tmp/broken.png"
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    // Duplicate username/email.
    register_ana(&client);
    let response = client
        .post("/api/v1/users/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "fullName": "Ana Clone",
                "username": "ANA",
                "password": "p9",
                "email": "other@x.com",
                "avatar": "/tmp/clone.png"
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Conflict);
}

#[test]
fn login_failure_modes_map_to_status_codes() {
    let (client, _harness) = auth_client();
    register_ana(&client);

    // Neither identifier supplied.
    let response = client
        .post("/api/v1/users/login")
        .header(ContentType::JSON)
        .body(json!({ "password": "p1" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    // Unknown account.
    let response = client
        .post("/api/v1/users/login")
        .header(ContentType::JSON)
        .body(json!({ "username": "nobody", "password": "p1" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);

    // Wrong password.
    let response = client
        .post("/api/v1/users/login")
        .header(ContentType::JSON)
        .body(json!({ "username": "ana", "password": "wrong" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let payload: Value = response.into_json().expect("valid JSON payload");
    assert_eq!(payload["status"], 401);
    assert_eq!(payload["message"], "unauthorized");
}

#[test]
fn full_session_lifecycle() {
    let (client, _harness) = auth_client();
    register_ana(&client);
    let (access, first_refresh) = login_ana(&client);

    // The access token authenticates via the Authorization header.
    let response = client
        .get("/api/v1/users/me")
        .header(Header::new("Authorization", format!("Bearer {access}")))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let payload: Value = response.into_json().expect("valid JSON payload");
    assert_eq!(payload["data"]["username"], "ana");

    // Rotate: the refresh cookie yields a fresh pair.
    let response = client
        .post("/api/v1/users/refresh")
        .cookie(Cookie::new("refresh_token", first_refresh.clone()))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let payload: Value = response.into_json().expect("valid JSON payload");
    let second_refresh = payload["data"]["refreshToken"]
        .as_str()
        .expect("rotated refresh token")
        .to_string();
    assert_ne!(second_refresh, first_refresh);

    // The superseded token is permanently unusable.
    let response = client
        .post("/api/v1/users/refresh")
        .cookie(Cookie::new("refresh_token", first_refresh))
        .dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    // Logout clears both cookies and revokes the stored token.
    let response = client
        .post("/api/v1/users/logout")
        .cookie(Cookie::new("access_token", access.clone()))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    // Replaying the last valid refresh token now fails.
    let response = client
        .post("/api/v1/users/refresh")
        .cookie(Cookie::new("refresh_token", second_refresh))
        .dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    // Logout is idempotent; the stateless access token still authenticates it.
    let response = client
        .post("/api/v1/users/logout")
        .cookie(Cookie::new("access_token", access))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
}

#[test]
fn refresh_accepts_a_json_body_fallback() {
    let (client, _harness) = auth_client();
    register_ana(&client);
    let (_, refresh_token) = login_ana(&client);

    let response = client
        .post("/api/v1/users/refresh")
        .header(ContentType::JSON)
        .body(json!({ "refreshToken": refresh_token }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    // Missing everywhere: 401.
    let response = client.post("/api/v1/users/refresh").dispatch();
    assert_eq!(response.status(), Status::Unauthorized);
}

#[test]
fn guard_prefers_cookie_and_rejects_bad_tokens() {
    let (client, _harness) = auth_client();
    register_ana(&client);
    let (access, _) = login_ana(&client);

    // No token at all.
    let response = client.get("/api/v1/users/me").dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    // Valid cookie wins even with a garbage header present.
    let response = client
        .get("/api/v1/users/me")
        .cookie(Cookie::new("access_token", access.clone()))
        .header(Header::new("Authorization", "Bearer garbage"))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    // A bad cookie is not rescued by a valid header; the cookie is
    // authoritative once present.
    let response = client
        .get("/api/v1/users/me")
        .cookie(Cookie::new("access_token", "garbage"))
        .header(Header::new("Authorization", format!("Bearer {access}")))
        .dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    // A refresh token is not an access token.
    let (_, refresh_token) = login_ana(&client);
    let response = client
        .get("/api/v1/users/me")
        .header(Header::new("Authorization", format!("Bearer {refresh_token}")))
        .dispatch();
    assert_eq!(response.status(), Status::Unauthorized);
}

#[test]
fn change_password_requires_the_current_one() {
    let (client, _harness) = auth_client();
    register_ana(&client);
    let (access, _) = login_ana(&client);
    let bearer = Header::new("Authorization", format!("Bearer {access}"));

    let response = client
        .post("/api/v1/users/password")
        .header(bearer.clone())
        .header(ContentType::JSON)
        .body(json!({ "currentPassword": "wrong", "newPassword": "p2" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .post("/api/v1/users/password")
        .header(bearer)
        .header(ContentType::JSON)
        .body(json!({ "currentPassword": "p1", "newPassword": "p2" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    // Old password no longer logs in; the new one does.
    let response = client
        .post("/api/v1/users/login")
        .header(ContentType::JSON)
        .body(json!({ "username": "ana", "password": "p1" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .post("/api/v1/users/login")
        .header(ContentType::JSON)
        .body(json!({ "username": "ana", "password": "p2" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
}
