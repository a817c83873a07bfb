use clap::Parser;
use std::net::SocketAddr;

/// Command-line and environment configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "users-api")]
#[command(about = "User management API with built-in request analytics")]
#[command(version)]
pub struct Config {
    /// Address to bind the HTTP server to
    #[arg(long, env = "USERS_API_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Redis URL for user storage; users are kept in memory when unset
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Number of demo users to insert at startup
    #[arg(long, env = "USERS_API_SEED", default_value_t = 0)]
    pub seed_users: usize,

    /// Default log level (trace, debug, info, warn, error); RUST_LOG wins
    #[arg(long, env = "USERS_API_LOG", default_value = "info")]
    pub log_level: String,
}
