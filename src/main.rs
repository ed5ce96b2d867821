use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agrichain_qr::api::{self, AppState};
use agrichain_qr::catalog::InMemoryCatalog;
use agrichain_qr::cli;
use agrichain_qr::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `issue`/`verify` output stays pipeable.
    let json_logs = std::env::var("AGRICHAIN_LOG_FORMAT").is_ok_and(|v| v == "json");
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "agrichain_qr=debug,tower_http=debug".into()),
        ))
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let args = cli::Cli::parse();

    let result = match args.command {
        // keygen must work before any secret exists
        Some(cli::Commands::Keygen { bytes }) => cli::run_keygen(bytes, &mut std::io::stdout()),
        Some(cli::Commands::Serve { port }) => {
            let cfg = config::load()?;
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Issue { product_id, png }) => {
            let cfg = config::load()?;
            cli::run_issue(&cfg.codec(), &product_id, png.as_deref(), &mut std::io::stdout())
        }
        Some(cli::Commands::Verify { payload }) => {
            let cfg = config::load()?;
            cli::run_verify(&cfg.codec(), payload, std::io::stdin(), &mut std::io::stdout())
        }
        None => {
            let cfg = config::load()?;
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    let catalog = match &cfg.catalog_path {
        Some(path) => {
            tracing::info!("Loading product catalog from {}", path.display());
            InMemoryCatalog::from_file(path).await?
        }
        None => {
            tracing::warn!("AGRICHAIN_CATALOG_PATH is not set, starting with an empty product catalog");
            InMemoryCatalog::new()
        }
    };
    tracing::info!(products = catalog.len().await, "Product catalog ready");

    let codec = cfg.codec();
    if !codec.is_configured() {
        tracing::warn!("QR signing key missing, /api/v1/qr/issue will return 503");
    }

    let state = Arc::new(AppState {
        codec,
        catalog: Arc::new(catalog),
    });

    let app = api::app(state, &cfg.dashboard_origin);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("AgriChain QR service listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
