/// Gateway configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret used to verify handshake credentials (HS256).
    pub jwt_secret: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Maximum number of public messages replayed to a new connection.
    pub history_limit: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            jwt_secret: required_var("JWT_SECRET"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4003),
            history_limit: std::env::var("HISTORY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}
