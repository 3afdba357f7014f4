#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use core::time::Duration;
use miniblog_core::UserStore;
use miniblog_sync::Supervisor;
use server::auth::{JwtValidator, PolicyAuthorizer};
use server::config::{CliArgs, ServerConfig};
use server::service::{AppState, handler::UserService, router};
use server::store::MemoryStore;
use server::telemetry::init_telemetry;
use server::{jobs, lifecycle};
use std::sync::Arc;
use tokio::net::TcpListener;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let store: Arc<dyn UserStore> = Arc::new(MemoryStore::new());
    let jwt = Arc::new(JwtValidator::new(&config.jwt_secret));
    let service = UserService::new(Arc::clone(&store), config.default_limit, config.max_limit);

    let supervisor = Supervisor::new();
    jobs::spawn_stats_job(&supervisor, store, config.stats_interval);

    let app = router(AppState {
        users: service.clone(),
        validator: jwt.clone(),
        authorizer: Arc::new(PolicyAuthorizer::new(config.admin.clone())),
    });

    let listener = TcpListener::bind(config.addr).await?;
    log_startup_info(&config, &jwt);

    axum::serve(listener, app)
        .with_graceful_shutdown(lifecycle::shutdown_signal(service))
        .await?;

    if let Err(e) = supervisor.shutdown(config.shutdown_timeout).await {
        tracing::error!("Error during background task shutdown: {e}");
    }
    tracing::info!("Service shut down successfully");

    providers.shutdown();
    Ok(())
}

fn log_startup_info(config: &ServerConfig, jwt: &JwtValidator) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting user service on {} with full config: {:#?}",
            config.addr,
            config
        );
    } else {
        tracing::info!("Starting user service on {}", config.addr);
    }

    // Kept out of tracing so exporters never see it.
    if config.dev_token {
        match jwt.issue(&config.admin, Duration::from_secs(24 * 60 * 60)) {
            Ok(token) => eprintln!("Development token for '{}': {token}", config.admin),
            Err(e) => eprintln!("Could not mint a development token: {e}"),
        }
    }
}
