//! Shared fixtures for the gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use tokio::time;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chat_gateway::auth::Claims;
use chat_gateway::config::Config;
use chat_gateway::gateway::fanout::GatewayBroadcast;
use chat_gateway::gateway::presence::PresenceRegistry;
use chat_gateway::store::memory::{MemoryIdentityStore, MemoryMessageStore};
use chat_gateway::store::{Identity, Role};
use chat_gateway::AppState;

pub const TEST_SECRET: &str = "gateway-test-secret";

pub type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Build an AppState over fresh in-memory stores. The store handles are
/// returned so tests can seed identities and inspect persisted messages.
pub fn test_state(history_limit: usize) -> (AppState, Arc<MemoryIdentityStore>, Arc<MemoryMessageStore>) {
    let identities = Arc::new(MemoryIdentityStore::new());
    let messages = Arc::new(MemoryMessageStore::new());
    let state = AppState {
        config: Arc::new(Config {
            jwt_secret: TEST_SECRET.to_string(),
            port: 0,
            history_limit,
        }),
        identities: identities.clone(),
        messages: messages.clone(),
        presence: Arc::new(PresenceRegistry::new()),
        broadcast: Arc::new(GatewayBroadcast::new()),
    };
    (state, identities, messages)
}

pub fn seed_user(identities: &MemoryIdentityStore, id: i64, display_name: &str) {
    identities.insert(Identity {
        id,
        display_name: display_name.to_string(),
        role: Role::User,
    });
}

pub fn mint_token(secret: &str, identity_id: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: identity_id,
        role: Role::User,
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("sign token")
}

pub fn mint_expired_token(secret: &str, identity_id: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: identity_id,
        role: Role::User,
        iat: now - 7200,
        exp: now - 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("sign token")
}

/// Start a real listener serving the gateway router; returns its address.
pub async fn start_server(state: AppState) -> SocketAddr {
    let app = chat_gateway::gateway::server::router().with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

/// Connect with the token in the query string.
pub async fn connect(addr: SocketAddr, token: &str) -> WsClient {
    let url = format!("ws://{addr}/gateway?token={token}");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws
}

/// Attempt a connection that is expected to be refused; returns the HTTP
/// status of the refusal.
pub async fn connect_refused(addr: SocketAddr, query: &str) -> u16 {
    let url = format!("ws://{addr}/gateway{query}");
    let err = tokio_tungstenite::connect_async(&url)
        .await
        .expect_err("connection should be refused");
    match err {
        tungstenite::Error::Http(response) => response.status().as_u16(),
        other => panic!("unexpected error: {other:?}"),
    }
}

pub async fn send_client_event(ws: &mut WsClient, event: serde_json::Value) {
    ws.send(tungstenite::Message::Text(event.to_string().into()))
        .await
        .expect("send event");
}

/// Read the next event, JSON-decoded, within a timeout.
pub async fn recv_event(ws: &mut WsClient) -> serde_json::Value {
    let msg = time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timeout waiting for event")
        .expect("stream ended")
        .expect("ws read error");
    let text = msg.into_text().expect("not text");
    serde_json::from_str(&text).expect("parse event")
}

/// Read events until one matches `event_name`, returning it.
pub async fn recv_until(ws: &mut WsClient, event_name: &str) -> serde_json::Value {
    loop {
        let event = recv_event(ws).await;
        if event["event"] == event_name {
            return event;
        }
    }
}

/// Assert no further event arrives within a short window.
pub async fn assert_silent(ws: &mut WsClient) {
    let result = time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(result.is_err(), "expected no further events, got {result:?}");
}
