//! Demo server: serves the record types of a schema file.
//!
//! Run from repo root: `SCHEMA_PATH=demo_server/schema/parent-child.json cargo run -p demo-server`
//! Without `DATABASE_URL` records live in memory.

use recordgate::{
    app, ensure_database_exists, ensure_tables, load_schema_file, resolve, AppState, MemoryStore,
    PgStore, Settings, Store,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("recordgate=info,demo_server=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let schema = load_schema_file(&settings.schema_path).await?;
    let registry = resolve(&schema)?;

    let store: Arc<dyn Store> = match settings.database_url.as_deref() {
        Some(url) => {
            ensure_database_exists(url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;
            ensure_tables(&pool, &registry).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping records in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(registry, store);
    let router = app(state, &settings);
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(
        "listening on http://{}/{}",
        listener.local_addr()?,
        settings.api_prefix
    );
    axum::serve(listener, router).await?;
    Ok(())
}
