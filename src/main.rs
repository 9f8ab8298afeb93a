use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_gateway::config::Config;
use chat_gateway::gateway::fanout::GatewayBroadcast;
use chat_gateway::gateway::presence::PresenceRegistry;
use chat_gateway::store::memory::{MemoryIdentityStore, MemoryMessageStore};
use chat_gateway::AppState;

#[tokio::main]
async fn main() {
    // Env vars may also be set externally; a missing .env file is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    // In-memory stores. Database-backed identity/message stores plug in
    // behind the same traits.
    let state = AppState {
        config: Arc::new(config),
        identities: Arc::new(MemoryIdentityStore::new()),
        messages: Arc::new(MemoryMessageStore::new()),
        presence: Arc::new(PresenceRegistry::new()),
        broadcast: Arc::new(GatewayBroadcast::new()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = chat_gateway::gateway::server::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "chat-gateway listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("install ctrl-c handler");
    tracing::info!("shutdown signal received");
}
