use std::net::SocketAddr;
use std::path::PathBuf;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use notes_db::{BackendKind, DataSourceConfig, open_data_source};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notes=debug,notes_db=debug,notes_api=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let backend: BackendKind = std::env::var("NOTES_BACKEND")
        .unwrap_or_else(|_| BackendKind::Relational.to_string())
        .parse()?;
    let db_path: PathBuf = std::env::var("NOTES_DB_PATH")
        .unwrap_or_else(|_| "notes.db".into())
        .into();
    let document_path: PathBuf = std::env::var("NOTES_DOCUMENT_PATH")
        .unwrap_or_else(|_| "notes-documents.json".into())
        .into();
    let host = std::env::var("NOTES_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("NOTES_PORT")
        .unwrap_or_else(|_| "8001".into())
        .parse()?;

    // Backend is fixed for the life of the process
    let source = open_data_source(&DataSourceConfig {
        backend,
        relational_path: Some(db_path),
        document_path: Some(document_path),
    })
    .await?;

    let app = notes_api::router(source)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Notes server ({}) listening on {}", backend, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
