//! Integration tests for the CRM token provider.

use deal_sync::{CrmConfig, TokenProvider, TokenRefreshError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/oauth/v2/token";

fn provider(server: &MockServer) -> TokenProvider {
    let mut config = CrmConfig::new("refresh-abc", "client-1", "secret-1");
    config.token_url = format!("{}{TOKEN_PATH}", server.uri());
    TokenProvider::new(reqwest::Client::new(), &config)
}

#[tokio::test]
async fn test_refresh_sends_form_encoded_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("refresh_token=refresh-abc"))
        .and(body_string_contains("client_id=client-1"))
        .and(body_string_contains("client_secret=secret-1"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok-1", "expires_in": 3600 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(provider(&server).refresh().await.unwrap(), "tok-1");
}

#[tokio::test]
async fn test_access_token_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = provider(&server);

    assert_eq!(tokens.access_token().await.unwrap(), "tok-1");
    assert_eq!(tokens.access_token().await.unwrap(), "tok-1");
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok-1" }))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tokens = provider(&server);
    let (a, b) = tokio::join!(tokens.access_token(), tokens.access_token());

    assert_eq!(a.unwrap(), "tok-1");
    assert_eq!(b.unwrap(), "tok-1");
}

#[tokio::test]
async fn test_unauthorized_refresh_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid client"))
        .expect(2)
        .mount(&server)
        .await;

    let tokens = provider(&server);

    let err = tokens.access_token().await.unwrap_err();
    assert!(matches!(err, TokenRefreshError::Status { status: 401, .. }));

    // The failure left the cache empty, so the next call refreshes again.
    assert!(tokens.access_token().await.is_err());
}

#[tokio::test]
async fn test_grant_error_in_ok_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "invalid_code" })))
        .mount(&server)
        .await;

    let err = provider(&server).refresh().await.unwrap_err();

    match err {
        TokenRefreshError::MissingAccessToken { detail } => assert_eq!(detail, "invalid_code"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_ok_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = provider(&server).refresh().await.unwrap_err();

    assert!(matches!(err, TokenRefreshError::MissingAccessToken { .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_http_error() {
    let mut config = CrmConfig::new("r", "c", "s");
    config.token_url = "http://127.0.0.1:9/oauth/v2/token".to_string();
    let tokens = TokenProvider::new(reqwest::Client::new(), &config);

    assert!(matches!(
        tokens.access_token().await,
        Err(TokenRefreshError::Http(_))
    ));
}
