use std::sync::Arc;

use axum::http::Method;
use axum::{
    Router,
    routing::{get, put},
};
use clap::Parser;
use marginalia::config::{Cli, Config, default_config_dir, default_config_path};
use marginalia::handler::{
    AppState, get_highlights, healthcheck, highlights_exist, replace_highlights,
};
use marginalia::store::HighlightStore;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Determine config path and data directory
    // If --config is provided, use its parent directory for data (store, etc.)
    // Otherwise use ~/.marginalia/ for both
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = std::path::PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            (path, dir)
        }
        None => {
            let dir = default_config_dir();
            (default_config_path(), dir)
        }
    };

    // Ensure data directory exists
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("failed to create data directory {:?}: {}", data_dir, e);
        std::process::exit(1);
    }

    tracing_subscriber::fmt().json().init();
    tracing::info!("marginalia.svc starting");

    let cfg = Config::new(config_path.to_string_lossy().as_ref()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });
    let store = Arc::new(
        HighlightStore::new(cfg.app.store_root(&data_dir)).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to setup highlight store");
            std::process::exit(1);
        }),
    );

    let address = format!("0.0.0.0:{}", cfg.app.get_port());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(healthcheck))
        .route("/highlights", get(get_highlights))
        .route("/highlights", put(replace_highlights))
        .route("/highlights/exists", get(highlights_exist))
        .layer(cors)
        .with_state(AppState { store });

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("marginalia.svc running on {}", &address);
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "server exited with error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl+c signal received, shutting down");
        }
    }

    tracing::info!("marginalia.svc going off, graceful shutdown complete");
}
