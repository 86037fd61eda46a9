use std::time::Duration;

use auth_engine::{
    fetch_current_user_info, verify_cached_token, InMemorySecretStore, ReqwestVerifier,
    SecretStore, TokenVerifier, UserInfo, UserInfoResult, VerificationResult, VerifierSettings,
    API_KEY_SECRET,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{bearer_token, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "0f5c4b52-1b8e-4c6a-9a55-4e1f2b3c4d5e";

fn verifier_for(server: &MockServer) -> ReqwestVerifier {
    ReqwestVerifier::new(VerifierSettings {
        api_base_url: server.uri(),
        ..VerifierSettings::default()
    })
}

async fn serve(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(bearer_token(TOKEN))
        .and(header("Wanikani-Revision", "20170710"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn valid_token_yields_username() {
    let server = serve(200, json!({"data": {"username": "alice", "level": 5}})).await;
    let result = verifier_for(&server).verify(TOKEN).await;
    assert_eq!(result, VerificationResult::Valid("alice".to_string()));
}

#[tokio::test]
async fn missing_username_is_still_valid() {
    let server = serve(200, json!({"data": {"level": 5}})).await;
    let result = verifier_for(&server).verify(TOKEN).await;
    assert_eq!(result, VerificationResult::Valid(String::new()));
}

#[tokio::test]
async fn status_codes_map_to_outcomes() {
    let cases = [
        (401, VerificationResult::Invalid),
        (403, VerificationResult::Invalid),
        (429, VerificationResult::RateLimited),
        (
            500,
            VerificationResult::NetworkError("Unexpected response code: 500".to_string()),
        ),
    ];
    for (status, expected) in cases {
        let server = serve(status, json!({"error": "nope"})).await;
        assert_eq!(verifier_for(&server).verify(TOKEN).await, expected, "{status}");
    }
}

#[tokio::test]
async fn request_carries_bearer_and_revision_headers() {
    let server = MockServer::start().await;
    // Anything without both headers falls through to wiremock's 404.
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(bearer_token("other-token"))
        .and(header("Wanikani-Revision", "20170710"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"username": "bob"}})))
        .expect(1)
        .mount(&server)
        .await;

    let verifier = verifier_for(&server);
    assert_eq!(
        verifier.verify(TOKEN).await,
        VerificationResult::NetworkError("Unexpected response code: 404".to_string())
    );
    assert_eq!(
        verifier.verify("other-token").await,
        VerificationResult::Valid("bob".to_string())
    );
}

#[tokio::test]
async fn verification_is_idempotent() {
    let server = serve(200, json!({"data": {"username": "alice"}})).await;
    let verifier = verifier_for(&server);

    let first = verifier.verify(TOKEN).await;
    let second = verifier.verify(TOKEN).await;
    assert_eq!(first, second);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn blank_token_is_not_sent() {
    let server = MockServer::start().await;
    let verifier = verifier_for(&server);

    assert_eq!(verifier.verify("  ").await, VerificationResult::NoToken);
    assert_eq!(verifier.fetch_user_info("").await, UserInfoResult::NoToken);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let verifier = ReqwestVerifier::new(VerifierSettings {
        api_base_url: "http://127.0.0.1:1".to_string(),
        connect_timeout: Duration::from_secs(2),
        ..VerifierSettings::default()
    });

    match verifier.verify(TOKEN).await {
        VerificationResult::NetworkError(message) => {
            assert!(message.starts_with("Network error: "), "{message}")
        }
        other => panic!("unexpected result {other:?}"),
    }
    match verifier.fetch_user_info(TOKEN).await {
        UserInfoResult::Error(message) => {
            assert!(message.starts_with("Network error: "), "{message}")
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn slow_server_hits_read_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(1500))
                .set_body_json(json!({"data": {"username": "alice"}})),
        )
        .mount(&server)
        .await;

    let verifier = ReqwestVerifier::new(VerifierSettings {
        api_base_url: server.uri(),
        read_timeout: Duration::from_millis(100),
        ..VerifierSettings::default()
    });

    assert!(matches!(
        verifier.verify(TOKEN).await,
        VerificationResult::NetworkError(_)
    ));
}

#[tokio::test]
async fn user_info_reads_all_fields() {
    let server = serve(
        200,
        json!({"data": {
            "username": "alice",
            "level": 12,
            "profile_url": "https://www.wanikani.com/users/alice",
            "started_at": "2020-01-01T00:00:00.000000Z",
            "subscription": {"active": true, "type": "lifetime"}
        }}),
    )
    .await;

    assert_eq!(
        verifier_for(&server).fetch_user_info(TOKEN).await,
        UserInfoResult::Success(UserInfo {
            username: "alice".to_string(),
            level: 12,
            profile_url: "https://www.wanikani.com/users/alice".to_string(),
            started_at: "2020-01-01T00:00:00.000000Z".to_string(),
            subscription_active: true,
        })
    );
}

#[tokio::test]
async fn user_info_defaults_optional_fields() {
    let server = serve(200, json!({"data": {"username": "alice", "level": 1}})).await;

    assert_eq!(
        verifier_for(&server).fetch_user_info(TOKEN).await,
        UserInfoResult::Success(UserInfo {
            username: "alice".to_string(),
            level: 1,
            profile_url: String::new(),
            started_at: String::new(),
            subscription_active: false,
        })
    );
}

#[tokio::test]
async fn user_info_requires_level() {
    let server = serve(200, json!({"data": {"username": "alice"}})).await;
    assert_eq!(
        verifier_for(&server).fetch_user_info(TOKEN).await,
        UserInfoResult::Error("Failed to parse user info".to_string())
    );
}

#[tokio::test]
async fn user_info_reports_unexpected_status() {
    let server = serve(401, json!({})).await;
    assert_eq!(
        verifier_for(&server).fetch_user_info(TOKEN).await,
        UserInfoResult::Error("Unexpected response code: 401".to_string())
    );
}

#[tokio::test]
async fn cached_token_read_paths() {
    let server = serve(200, json!({"data": {"username": "alice", "level": 3}})).await;
    let verifier = verifier_for(&server);
    let store = InMemorySecretStore::new();

    assert_eq!(
        fetch_current_user_info(&verifier, &store).await,
        UserInfoResult::NoToken
    );
    assert_eq!(
        verify_cached_token(&verifier, &store).await,
        VerificationResult::NoToken
    );

    store.put(API_KEY_SECRET, TOKEN).unwrap();
    assert!(matches!(
        fetch_current_user_info(&verifier, &store).await,
        UserInfoResult::Success(UserInfo { level: 3, .. })
    ));
    assert_eq!(
        verify_cached_token(&verifier, &store).await,
        VerificationResult::Valid("alice".to_string())
    );
}
