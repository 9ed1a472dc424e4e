//! HTTP-level behavior against a mock server: bearer attachment, the
//! 401 -> refresh -> replay round trip, and the identity flows.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use attendtrack_client::{
    AccessToken, Client, ClientConfig, LoginOutcome, MemoryTokenStore, SessionExpiryNotifier,
    TokenStore,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

struct CountingNotifier {
    calls: AtomicUsize,
}

#[async_trait]
impl SessionExpiryNotifier for CountingNotifier {
    async fn session_expired(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

async fn client_with_token(server: &MockServer, token: Option<&str>) -> (Client, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    if let Some(token) = token {
        store.set(AccessToken::new(token)).await;
    }
    let client = Client::builder()
        .config(ClientConfig::new(server.uri()).unwrap())
        .token_store(Arc::clone(&store) as Arc<dyn TokenStore>)
        .build()
        .unwrap();
    (client, store)
}

#[tokio::test]
async fn bearer_token_is_attached_to_requests() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ana"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_with_token(&server, Some("c1")).await;
    let me: serde_json::Value = client.get("/users/me").await.unwrap();
    assert_eq!(me["username"], "ana");
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "ana"})))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "c2", "token_type": "bearer"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = client_with_token(&server, Some("c1")).await;
    let me: serde_json::Value = client.get("/users/me").await.unwrap();
    assert_eq!(me["username"], "ana");
    assert_eq!(client.access_token().await.unwrap().expose(), "c2");
}

#[tokio::test]
async fn failed_refresh_surfaces_session_expiry() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/attendance"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Refresh token invalid or expired"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let notifier = Arc::new(CountingNotifier {
        calls: AtomicUsize::new(0),
    });
    let store = Arc::new(MemoryTokenStore::new());
    store.set(AccessToken::new("c1")).await;
    let client = Client::builder()
        .config(ClientConfig::new(server.uri()).unwrap())
        .token_store(Arc::clone(&store) as Arc<dyn TokenStore>)
        .notifier(Arc::clone(&notifier) as Arc<dyn SessionExpiryNotifier>)
        .build()
        .unwrap();

    let err = client
        .get::<serde_json::Value>("/attendance")
        .await
        .unwrap_err();

    assert!(err.is_session_expired());
    assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    assert!(store.get().await.is_none());
}

#[tokio::test]
async fn bad_password_is_rejected_without_touching_refresh() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Invalid username or password"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "c2"})))
        .expect(0)
        .mount(&server)
        .await;

    let (client, store) = client_with_token(&server, None).await;
    let err = client.login("ana", "wrong").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(store.get().await.is_none());
}

#[tokio::test]
async fn two_factor_login_flow_stores_the_issued_token() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"username": "ana", "password": "hunter2"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"requires_2fa_verify": true, "temp_token": "tmp-1"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/2fa/verify"))
        .and(header("authorization", "Bearer tmp-1"))
        .and(body_json(json!({"code": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "c1"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with_token(&server, None).await;

    let outcome = client.login("ana", "hunter2").await.unwrap();
    let temp_token = match outcome {
        LoginOutcome::TwoFactorVerifyRequired { temp_token } => temp_token,
        other => panic!("expected a 2FA verify challenge, got {other:?}"),
    };
    assert!(store.get().await.is_none());

    let token = client.verify_totp(&temp_token, "123456", None).await.unwrap();
    assert_eq!(token.expose(), "c1");
    assert_eq!(store.get().await.unwrap().expose(), "c1");
}

#[tokio::test]
async fn logout_clears_the_stored_token() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer c1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = client_with_token(&server, Some("c1")).await;
    client.logout().await.unwrap();
    assert!(store.get().await.is_none());
}
