//! Stethoscope
//!
//! Endpoint liveness tracker in front of the service-discovery registry.
//!
//! # Servers
//!
//! - gRPC server for endpoint checkins (default: 0.0.0.0:50070)
//! - HTTP server for health and metrics (default: 0.0.0.0:8090)
//!
//! # Startup
//!
//! 1. Initialize tracing
//! 2. Load configuration
//! 3. Install Prometheus metrics recorder
//! 4. Connect to the registry
//! 5. Seed the cache from the registry (fatal on failure or timeout)
//! 6. Start health HTTP server
//! 7. Start cache maintenance task
//! 8. Start gRPC server and mark ready
//! 9. Wait for shutdown signal, then drain pending deregistrations

use proto_gen::stethoscope::stethoscope_service_server::StethoscopeServiceServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use stethoscope::config::Config;
use stethoscope::grpc::CheckinService;
use stethoscope::observability::{
    health_router, init_metrics_recorder, metrics_router, HealthState,
};
use stethoscope::registry::{RedisRegistry, RegistryClient};
use stethoscope::services::{LivenessSettings, Stethoscope};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on draining in-flight deregistrations at shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stethoscope=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Stethoscope");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        grpc_bind_address = %config.grpc_bind_address,
        health_bind_address = %config.health_bind_address,
        expire_after_write_secs = config.expire_after_write.as_secs(),
        cleanup_interval_secs = config.cleanup_interval.as_secs(),
        remove_from_registry = config.remove_from_registry,
        "Configuration loaded successfully"
    );

    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let health_state = Arc::new(HealthState::new());

    info!("Connecting to registry...");
    let registry: Arc<dyn RegistryClient> = Arc::new(
        RedisRegistry::new(config.registry_url())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to registry");
                e
            })?,
    );
    info!("Registry connection established");

    if config.remove_from_registry {
        info!("Evicted endpoints will be removed from the registry");
    } else {
        info!("Evicted endpoints will NOT be removed from the registry");
    }

    let stethoscope = Arc::new(
        Stethoscope::initialize(registry, LivenessSettings::from(&config))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load the cache from the registry");
                e
            })?,
    );

    let shutdown_token = CancellationToken::new();

    // Health server
    let health_addr: SocketAddr = config.health_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.health_bind_address, "Invalid health bind address");
        e
    })?;
    let app = health_router(Arc::clone(&health_state))
        .merge(metrics_router(prometheus_handle))
        .layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %health_addr, "Failed to bind health server");
            format!("Failed to bind health server to {health_addr}: {e}")
        })?;
    let health_shutdown_token = shutdown_token.child_token();
    let health_task = tokio::spawn(async move {
        info!(addr = %health_addr, "Health server starting");
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            health_shutdown_token.cancelled().await;
            info!("Health server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Health server failed");
        }
    });

    // Maintenance
    let maintenance_task = stethoscope.spawn_maintenance(shutdown_token.child_token());

    // gRPC server
    let grpc_addr: SocketAddr = config.grpc_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.grpc_bind_address, "Invalid gRPC bind address");
        e
    })?;
    let grpc_shutdown_token = shutdown_token.child_token();
    let grpc_server = tonic::transport::Server::builder()
        .add_service(StethoscopeServiceServer::new(CheckinService::new(
            Arc::clone(&stethoscope),
        )))
        .serve_with_shutdown(grpc_addr, async move {
            grpc_shutdown_token.cancelled().await;
            info!("gRPC server shutting down");
        });
    let grpc_task = tokio::spawn(async move {
        info!(addr = %grpc_addr, "gRPC server starting");
        if let Err(e) = grpc_server.await {
            error!(error = %e, "gRPC server failed");
        }
    });

    health_state.set_ready();
    info!("Stethoscope ready");

    shutdown_signal().await;
    info!("Shutdown signal received");

    health_state.set_not_ready();
    shutdown_token.cancel();

    for (name, task) in [
        ("grpc", grpc_task),
        ("maintenance", maintenance_task),
        ("health", health_task),
    ] {
        if let Err(e) = task.await {
            warn!(task = name, error = %e, "Task did not stop cleanly");
        }
    }

    if tokio::time::timeout(DRAIN_TIMEOUT, stethoscope.drain_evictions())
        .await
        .is_err()
    {
        warn!(
            in_flight = stethoscope.eviction().in_flight(),
            "Timed out waiting for pending deregistrations"
        );
    }

    info!("Stethoscope stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. Without them the service
/// cannot shut down gracefully.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
