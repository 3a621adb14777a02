mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn register_login_and_whoami() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, signup) = app
        .post("/register", None, json!({ "email": "luna@example.com", "password": "pw-123456" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let user_id = signup["id"].as_str().unwrap().to_string();

    let (status, session) = app
        .post("/login", None, json!({ "email": "luna@example.com", "password": "pw-123456" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    // Provider payload is passed through untouched
    assert_eq!(session["token_type"], "bearer");
    assert_eq!(session["user"]["id"], user_id.as_str());

    let token = session["access_token"].as_str().unwrap();
    let (status, me) = app.get("/whoami", Some(token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["user_id"], user_id.as_str());
    assert_eq!(me["data"]["email"], "luna@example.com");
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.post("/register", None, json!({ "email": "a@example.com", "password": "right" }))
        .await?;

    let (status, body) = app
        .post("/login", None, json!({ "email": "a@example.com", "password": "wrong" }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Login failed");
    Ok(())
}

#[tokio::test]
async fn malformed_credentials_are_rejected_before_the_provider() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app
        .post("/login", None, json!({ "email": "no-at-sign", "password": "pw" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app.post_raw("/login", None, "{\"email\":").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_bad_request() -> Result<()> {
    let app = TestApp::spawn().await?;
    let creds = json!({ "email": "dup@example.com", "password": "pw" });

    let (status, _) = app.post("/register", None, creds.clone()).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.post("/register", None, creds).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Registration failed");
    Ok(())
}

#[tokio::test]
async fn register_with_username_creates_profile() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, _) = app
        .post(
            "/register",
            None,
            json!({ "email": "sol@example.com", "password": "pw", "username": "sol" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, profiles) = app.get("/profiles", None).await?;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = profiles["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["username"].as_str())
        .collect();
    assert_eq!(names, vec!["sol"]);
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_the_refresh_token() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.post("/register", None, json!({ "email": "r@example.com", "password": "pw" }))
        .await?;
    let (_, session) = app
        .post("/login", None, json!({ "email": "r@example.com", "password": "pw" }))
        .await?;
    let refresh_token = session["refresh_token"].as_str().unwrap().to_string();

    let (status, next) = app
        .post("/refresh", None, json!({ "refresh_token": refresh_token }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(next["refresh_token"], refresh_token.as_str());

    // The old refresh token was consumed
    let (status, body) = app
        .post("/refresh", None, json!({ "refresh_token": refresh_token }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token refresh failed");
    Ok(())
}

#[tokio::test]
async fn logout_signs_out_at_the_provider() -> Result<()> {
    let app = TestApp::spawn().await?;
    let token = app.token_for("user-logout");

    let (status, body) = app.post("/logout", Some(&token), json!({})).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    assert_eq!(app.provider.signed_out(), vec![token]);
    Ok(())
}

#[tokio::test]
async fn remote_verification_asks_the_provider() -> Result<()> {
    let app = TestApp::spawn_remote().await?;
    app.post("/register", None, json!({ "email": "remote@example.com", "password": "pw" }))
        .await?;
    let (_, session) = app
        .post("/login", None, json!({ "email": "remote@example.com", "password": "pw" }))
        .await?;
    let token = session["access_token"].as_str().unwrap().to_string();

    let (status, me) = app.get("/whoami", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["email"], "remote@example.com");

    // A well-formed token the provider does not know is refused
    let stranger = app.token_for("stranger");
    let (status, _) = app.get("/whoami", Some(&stranger)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Once signed out, the provider no longer recognises the token
    let (status, _) = app.post("/logout", Some(&token), json!({})).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get("/whoami", Some(&token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
