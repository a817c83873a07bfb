use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod envelope;
mod handlers;
mod middleware;
mod mock_data;
mod monitoring;
mod server;
mod store;
mod validation;

use config::Config;
use monitoring::MonitoringService;
use store::{InMemoryUserRepository, RedisUserRepository, UserRepository};
use validation::UserValidator;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// User storage; in-memory or Redis, picked at startup.
    pub users: Arc<dyn UserRepository>,

    /// Request analytics. Handlers record into it, the dashboard reads it.
    pub monitoring: Arc<MonitoringService>,

    pub validator: UserValidator,
}

impl AppState {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self {
            users,
            monitoring: Arc::new(MonitoringService::new()),
            validator: UserValidator::new(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(&config.log_level);

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   👥  USERS API  ·  live request analytics        ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Pick a storage backend ───────────────────────────────
    let users: Arc<dyn UserRepository> = match &config.redis_url {
        Some(url) => {
            tracing::info!("connecting to redis");
            let repo = RedisUserRepository::connect(url)
                .await
                .context("failed to connect to redis")?;
            Arc::new(repo)
        }
        None => {
            tracing::info!("using in-memory user store");
            Arc::new(InMemoryUserRepository::new())
        }
    };

    // ── 2. Seed demo data ───────────────────────────────────────
    mock_data::seed(users.as_ref(), config.seed_users)
        .await
        .context("failed to seed demo users")?;

    // ── 3. Build shared state and router ────────────────────────
    let state = Arc::new(AppState::new(users));
    let app = server::create_router(state);

    // ── 4. Bind & serve ─────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;

    tracing::info!(addr = %config.listen, "server listening");
    tracing::info!("analytics      → http://{}/api/users/analytics", config.listen);
    tracing::info!("analytics SSE  → http://{}/api/users/analytics/stream", config.listen);

    axum::serve(listener, app)
        .await
        .context("server exited with error")?;
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true),
        )
        .with(filter)
        .init();
}
