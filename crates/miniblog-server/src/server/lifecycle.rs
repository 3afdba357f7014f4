use crate::server::service::handler::UserService;
use tokio::signal;

/// Resolves on Ctrl+C or SIGTERM, after turning new requests away.
///
/// Used as the graceful shutdown future of the HTTP server: once it resolves
/// the listener stops accepting and in-flight requests drain.
pub async fn shutdown_signal(service: UserService) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
    service.begin_shutdown();
}
