use forecast_goals::{
    helpers::oauth::{
        exchange_code, load_client_secrets, load_stored_token, load_token, refresh_access_token,
        resolve_access_token, save_token, EnvCredentials, RefreshCredentials,
    },
    models::oauth::{ClientSecrets, StoredToken},
    GoalsError,
};
use reqwest::Client;
use serde_json::json;
use std::fs;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn secrets(token_uri: String) -> ClientSecrets {
    ClientSecrets {
        client_id: "client-123".to_string(),
        client_secret: "shh".to_string(),
        redirect_uris: vec!["http://localhost".to_string()],
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri,
        project_id: None,
    }
}

#[tokio::test]
async fn exchange_code_posts_authorization_code_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=4%2Fabc"))
        .and(body_string_contains("redirect_uri=http%3A%2F%2Flocalhost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.new",
            "refresh_token": "1//refresh",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/spreadsheets.readonly",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let secrets = secrets(format!("{}/token", server.uri()));
    let token = exchange_code(&Client::new(), &secrets, "4/abc", "http://localhost")
        .await
        .unwrap();

    assert_eq!(token.access_token, "ya29.new");
    assert_eq!(token.refresh_token.as_deref(), Some("1//refresh"));
    assert!(token.expiry_date.is_some());
}

#[tokio::test]
async fn rejected_code_surfaces_oauth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Bad Request"
        })))
        .mount(&server)
        .await;

    let secrets = secrets(format!("{}/token", server.uri()));
    let err = exchange_code(&Client::new(), &secrets, "stale", "http://localhost")
        .await
        .unwrap_err();

    match err {
        GoalsError::OAuth(msg) => assert_eq!(msg, "invalid_grant: Bad Request"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn refresh_posts_refresh_token_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=r-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.refreshed",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = refresh_access_token(
        &Client::new(),
        &format!("{}/token", server.uri()),
        "client-123",
        "shh",
        "r-1",
    )
    .await
    .unwrap();
    assert_eq!(token.access_token, "ya29.refreshed");
    assert!(token.refresh_token.is_none());
}

#[tokio::test]
async fn resolve_prefers_refresh_over_stored_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.fresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stored = StoredToken {
        access_token: Some("ya29.stale".to_string()),
        refresh_token: Some("r-1".to_string()),
        client_id: Some("from-token-file".to_string()),
        client_secret: Some("shh".to_string()),
        ..Default::default()
    };
    let creds = RefreshCredentials {
        client_id: None,
        client_secret: None,
        token_uri: Some(format!("{}/token", server.uri())),
    };

    let token = resolve_access_token(&Client::new(), &stored, &creds).await.unwrap();
    assert_eq!(token, "ya29.fresh");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("client_id=from-token-file"));
}

#[tokio::test]
async fn huge_expires_in_saturates_expiry_date() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.forever",
            "expires_in": i64::MAX
        })))
        .mount(&server)
        .await;

    let token = refresh_access_token(
        &Client::new(),
        &format!("{}/token", server.uri()),
        "client-123",
        "shh",
        "r-1",
    )
    .await
    .unwrap();
    assert_eq!(token.expiry_date, Some(i64::MAX));
}

#[tokio::test]
async fn env_credentials_refresh_without_token_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("client_id=env-id"))
        .and(body_string_contains("refresh_token=1%2F%2Fenv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.from-env"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let env = EnvCredentials {
        client_id: Some("env-id".to_string()),
        client_secret: Some("env-secret".to_string()),
        refresh_token: Some("1//env".to_string()),
    };
    let stored = load_stored_token(&env, dir.path().join("token.json")).unwrap();
    let creds = RefreshCredentials {
        token_uri: Some(format!("{}/token", server.uri())),
        ..Default::default()
    };

    let token = resolve_access_token(&Client::new(), &stored, &creds).await.unwrap();
    assert_eq!(token, "ya29.from-env");
}

#[test]
fn token_file_round_trips_both_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");

    let user = StoredToken::authorized_user(&secrets("t".to_string()), "1//refresh");
    save_token(&path, &user).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"type\": \"authorized_user\""));
    assert_eq!(load_token(&path).unwrap(), user);

    fs::write(
        &path,
        r#"{"access_token": "a", "refresh_token": "r", "scope": "s", "token_type": "Bearer", "expiry_date": 1735689600000}"#,
    )
    .unwrap();
    let raw = load_token(&path).unwrap();
    assert_eq!(raw.access_token.as_deref(), Some("a"));
    assert_eq!(raw.expiry_date, Some(1_735_689_600_000));
}

#[test]
fn client_secrets_file_needs_a_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");

    fs::write(&path, r#"{"other": {}}"#).unwrap();
    assert!(matches!(load_client_secrets(&path), Err(GoalsError::Config(_))));

    fs::write(
        &path,
        r#"{"installed": {"client_id": "id", "client_secret": "s", "redirect_uris": ["http://localhost"]}}"#,
    )
    .unwrap();
    let loaded = load_client_secrets(&path).unwrap();
    assert_eq!(loaded.client_id, "id");
}
