//! Login outcome classification against a mocked identity service.

mod support;

use serde_json::json;
use stepup::error::AuthError;
use stepup::login::{Authenticator, LoginOutcome};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{jwt, test_config, tokens_json};

fn authenticator(server: &MockServer) -> Authenticator {
    Authenticator::new(&test_config(server))
}

#[tokio::test]
async fn login_success_returns_tokens_immediately() {
    let server = MockServer::start().await;
    let access = jwt("demo", "user");
    Mock::given(method("POST"))
        .and(path("/login/"))
        .and(body_json(json!({ "username": "demo", "password": "Demo@123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "tokens": tokens_json(&access, "refresh-1")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = authenticator(&server)
        .login("demo", "Demo@123")
        .await
        .expect("login");

    match outcome {
        LoginOutcome::Authenticated(tokens) => {
            assert_eq!(tokens.access, access);
            assert_eq!(tokens.refresh, "refresh-1");
        }
        other => panic!("expected Authenticated, got {other:?}"),
    }
}

#[tokio::test]
async fn login_setup_required_hands_back_temp_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SETUP_REQUIRED",
            "message": "2FA Setup Required",
            "tokens": tokens_json("setup-access", "setup-refresh")
        })))
        .mount(&server)
        .await;

    let outcome = authenticator(&server)
        .login("demo", "Demo@123")
        .await
        .expect("login");

    match outcome {
        LoginOutcome::SetupRequired(temp) => assert_eq!(temp.as_str(), "setup-access"),
        other => panic!("expected SetupRequired, got {other:?}"),
    }
}

#[tokio::test]
async fn login_challenge_required_carries_temp_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "2FA_REQUIRED",
            "message": "Please enter your OTP code",
            "temp_token": "temp-abc",
            "push_auth_available": true
        })))
        .mount(&server)
        .await;

    let outcome = authenticator(&server)
        .login("demo", "Demo@123")
        .await
        .expect("login");

    match outcome {
        LoginOutcome::ChallengeRequired(temp) => assert_eq!(temp.as_str(), "temp-abc"),
        other => panic!("expected ChallengeRequired, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_password_surfaces_service_message_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "non_field_errors": ["Incorrect Credentials"]
        })))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .login("demo", "wrong")
        .await
        .unwrap_err();

    match err {
        AuthError::InvalidCredentials(message) => assert_eq!(message, "Incorrect Credentials"),
        other => panic!("expected InvalidCredentials, got {other:?}"),
    }
}

#[tokio::test]
async fn login_can_be_resubmitted_after_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/"))
        .and(body_json(json!({ "username": "demo", "password": "wrong" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "non_field_errors": ["Incorrect Credentials"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login/"))
        .and(body_json(json!({ "username": "demo", "password": "Demo@123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "SUCCESS",
            "tokens": tokens_json("acc", "ref")
        })))
        .mount(&server)
        .await;

    let auth = authenticator(&server);
    assert!(auth.login("demo", "wrong").await.is_err());
    let outcome = auth.login("demo", "Demo@123").await.expect("second try");
    assert!(matches!(outcome, LoginOutcome::Authenticated(_)));
}

#[tokio::test]
async fn unknown_login_status_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "MAYBE" })))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .login("demo", "Demo@123")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidResponse(msg) if msg.contains("MAYBE")));
}

#[tokio::test]
async fn server_error_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = authenticator(&server)
        .login("demo", "Demo@123")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Api { status: 503, .. }));
}
