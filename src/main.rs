use std::process::ExitCode;
use std::sync::Arc;

use exercise_portal::web::{router, serve, AppState};
use exercise_portal::{ExercisePortal, MemoryBlobStore, MemoryDocumentStore, PortalConfig};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Loading configuration...");
    let config = PortalConfig::from_env()?;

    let documents = match &config.seed_path {
        Some(path) => {
            info!("Seeding document store from {}", path.display());
            MemoryDocumentStore::from_snapshot_file(path)?
        }
        None => MemoryDocumentStore::new(),
    };
    info!("Document store holds {} documents", documents.document_count());

    let blobs = MemoryBlobStore::new(config.public_blob_url.as_str());
    let portal = ExercisePortal::new(Arc::new(documents), Arc::new(blobs));

    if config.admin_token.is_none() {
        warn!("PORTAL_ADMIN_TOKEN not set, every request is treated as the administrator");
    }

    let address = config.bind_addr();
    let app = router(AppState::new(portal, config.admin_token), config.max_body_bytes);

    info!("Binding to {address}");
    let listener = TcpListener::bind(address).await?;
    info!("Server running on {address}");

    serve(listener, app, shutdown_signal()).await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
