pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod store;

use std::sync::Arc;

use config::Config;
use gateway::fanout::GatewayBroadcast;
use gateway::presence::PresenceRegistry;
use store::{IdentityStore, MessageStore};

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub identities: Arc<dyn IdentityStore>,
    pub messages: Arc<dyn MessageStore>,
    pub presence: Arc<PresenceRegistry>,
    pub broadcast: Arc<GatewayBroadcast>,
}
