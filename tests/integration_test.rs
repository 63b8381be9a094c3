use abdm_integration_core::core::config::AbdmConfig;
use abdm_integration_core::core::errors::AppError;
use abdm_integration_core::gateway::GatewayClient;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(base_url: &str, auth_url: &str) -> AbdmConfig {
    AbdmConfig {
        base_url: base_url.to_string(),
        auth_url: auth_url.to_string(),
        client_id: "hiu-client".to_string(),
        client_secret: "hiu-secret".to_string(),
        request_timeout_ms: 5_000,
        max_retry_attempts: 2,
        token_cache_ttl_secs: 3600,
    }
}

async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "test-access-token",
            "expiresIn": 3600,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn authenticates_once_and_reuses_cached_token() {
    let gateway_server = MockServer::start().await;
    let auth_server = MockServer::start().await;
    mount_token_endpoint(&auth_server).await;

    Mock::given(method("GET"))
        .and(path("/v0.5/consent-requests/status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "GRANTED" })))
        .expect(2)
        .mount(&gateway_server)
        .await;

    let client = GatewayClient::new(config(&gateway_server.uri(), &format!("{}/sessions", auth_server.uri()))).unwrap();

    let first: serde_json::Value = client.get("/v0.5/consent-requests/status/abc", &[]).await.unwrap();
    let second: serde_json::Value = client.get("/v0.5/consent-requests/status/abc", &[]).await.unwrap();

    assert_eq!(first["status"], "GRANTED");
    assert_eq!(second["status"], "GRANTED");

    // The token endpoint should only be hit once: the second call reuses the cached token.
    let token_requests = auth_server.received_requests().await.unwrap();
    assert_eq!(token_requests.len(), 1);
}

#[tokio::test]
async fn retries_on_server_error_then_succeeds() {
    let gateway_server = MockServer::start().await;
    let auth_server = MockServer::start().await;
    mount_token_endpoint(&auth_server).await;

    Mock::given(method("GET"))
        .and(path("/v0.5/consent-requests/status/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&gateway_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0.5/consent-requests/status/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "GRANTED" })))
        .mount(&gateway_server)
        .await;

    let client = GatewayClient::new(config(&gateway_server.uri(), &format!("{}/sessions", auth_server.uri()))).unwrap();
    let response: serde_json::Value = client.get("/v0.5/consent-requests/status/flaky", &[]).await.unwrap();

    assert_eq!(response["status"], "GRANTED");
}

#[tokio::test]
async fn surfaces_gateway_protocol_errors_for_client_errors() {
    let gateway_server = MockServer::start().await;
    let auth_server = MockServer::start().await;
    mount_token_endpoint(&auth_server).await;

    Mock::given(method("GET"))
        .and(path("/v0.5/consent-requests/status/bad"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "INVALID_REQUEST",
            "message": "malformed consent request id",
        })))
        .mount(&gateway_server)
        .await;

    let client = GatewayClient::new(config(&gateway_server.uri(), &format!("{}/sessions", auth_server.uri()))).unwrap();
    let result: Result<serde_json::Value, AppError> = client.get("/v0.5/consent-requests/status/bad", &[]).await;

    match result {
        Err(AppError::GatewayProtocol { status, code, .. }) => {
            assert_eq!(status, 400);
            assert_eq!(code, "INVALID_REQUEST");
        }
        other => panic!("expected GatewayProtocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn reauthenticates_once_on_unauthorized_then_gives_up() {
    let gateway_server = MockServer::start().await;
    let auth_server = MockServer::start().await;
    mount_token_endpoint(&auth_server).await;

    Mock::given(method("GET"))
        .and(path("/v0.5/consent-requests/status/unauth"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&gateway_server)
        .await;

    let client = GatewayClient::new(config(&gateway_server.uri(), &format!("{}/sessions", auth_server.uri()))).unwrap();
    let result: Result<serde_json::Value, AppError> = client.get("/v0.5/consent-requests/status/unauth", &[]).await;

    assert!(matches!(result, Err(AppError::GatewayAuth(_))));
    // One initial auth + one forced re-auth after the first 401.
    let token_requests = auth_server.received_requests().await.unwrap();
    assert_eq!(token_requests.len(), 2);
}
