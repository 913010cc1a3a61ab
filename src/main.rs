use clap::Parser;
use dotenvy::dotenv;
use pdf_ocr_backend::config::AppConfig;
use pdf_ocr_backend::infrastructure::{ocr, storage};
use pdf_ocr_backend::services::extractor::LopdfExtractor;
use pdf_ocr_backend::services::ocr_service::OcrService;
use pdf_ocr_backend::{AppState, create_app};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the API server (default: $PORT or 5000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory with the built frontend (default: $STATIC_DIR or ../frontend/dist)
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & Logging Setup
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_ocr_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting PDF OCR Backend...");

    let mut config = AppConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(static_dir) = args.static_dir {
        config.static_dir = static_dir;
    }
    info!(
        "🛡️  Config: Max Size={}MB, OCR Engine={}, Timeout={}s, Origins={:?}",
        config.max_file_size / 1024 / 1024,
        config.ocr_engine,
        config.ocr_timeout_secs,
        config.allowed_origins
    );

    // 2. Infrastructure
    let storage_service = storage::setup_storage(&config).await?;
    let ocr_engine = ocr::setup_ocr_engine(&config).await;

    let ocr_service = Arc::new(OcrService::new(
        storage_service.clone(),
        ocr_engine,
        Arc::new(LopdfExtractor),
    ));

    let state = AppState {
        storage: storage_service,
        ocr_service,
        config: config.clone(),
    };

    // 3. Serve
    let app = create_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ Server listening on: http://0.0.0.0:{}", config.port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", config.port);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Server runtime error: {}", e);
        return Err(e.into());
    }

    info!("👋 Backend exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
