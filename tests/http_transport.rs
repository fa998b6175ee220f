//! HttpTransport behavior against a local mock server.

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use libtwittercast::transport::{HttpTransport, LoginTransport};
use libtwittercast::{
    AuthConfig, AuthLevel, AuthManager, Level1Credentials, LoginError, TransportConfig,
};

fn transport_config(server: &MockServer) -> TransportConfig {
    TransportConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
        retry_count: 1,
        retry_backoff: Duration::from_millis(10),
    }
}

fn api_headers() -> HashMap<String, String> {
    HashMap::from([("x-api-key".to_string(), "abcdefghijklmnop".to_string())])
}

#[tokio::test]
async fn post_forwards_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twitter/login"))
        .and(header("x-api-key", "abcdefghijklmnop"))
        .and(body_partial_json(json!({"user_name": "u"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&transport_config(&server)).unwrap();
    let response = transport
        .post_json("/twitter/login", &api_headers(), &json!({"user_name": "u"}))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body["ok"], true);
}

#[tokio::test]
async fn rate_limit_surfaces_distinctly_and_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twitter/login"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"msg": "too many attempts"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&transport_config(&server)).unwrap();
    match transport
        .post_json("/twitter/login", &api_headers(), &json!({}))
        .await
    {
        Err(LoginError::RateLimited(msg)) => assert_eq!(msg, "too many attempts"),
        other => panic!("Expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn server_errors_are_retried_then_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twitter/login"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/twitter/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&transport_config(&server)).unwrap();
    let response = transport
        .post_json("/twitter/login", &api_headers(), &json!({}))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn persistent_server_error_comes_back_as_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twitter/login"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({"error": "bad gateway"})))
        .expect(2) // initial attempt plus one retry
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&transport_config(&server)).unwrap();
    let response = transport
        .post_json("/twitter/login", &api_headers(), &json!({}))
        .await
        .unwrap();
    assert_eq!(response.status, 502);
    assert_eq!(response.error_message(), "bad gateway");
}

#[tokio::test]
async fn non_json_body_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/twitter/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&transport_config(&server)).unwrap();
    let response = transport
        .get("/twitter/user/info", &api_headers())
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert!(response.body.is_null());
}

#[tokio::test]
async fn manager_end_to_end_over_real_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/twitter/login"))
        .and(header("x-api-key", "abcdefghijklmnop"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"success": true, "session_token": "tok123"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/twitter/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "42"})))
        .mount(&server)
        .await;

    let mut config = AuthConfig::new("abcdefghijklmnop");
    config.transport = transport_config(&server);
    let manager = AuthManager::new(config).unwrap();

    assert!(manager.test_connection().await.unwrap());

    let creds = Level1Credentials {
        user_name: "u".to_string(),
        email: "e@x.com".to_string(),
        password: SecretString::from("p".to_string()),
        totp_secret: None,
        proxy: None,
    };
    let grant = manager.login_level1(&creds).await.unwrap();
    assert_eq!(grant.token, "tok123");
    assert_eq!(manager.current_auth_level(), AuthLevel::SessionLevel1);
}
