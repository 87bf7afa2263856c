mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::services::auth::TokenVerifier;
use crate::services::persistence::{PersistConfig, spawn_persistence_worker};
use crate::services::store::{MemoryMessageStore, MessageStore, PgMessageStore};

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to load .env"),
    }

    let config = config::ServerConfig::from_env().expect("invalid configuration");

    let store: Arc<dyn MessageStore> = if let Some(database_url) = &config.database_url {
        let pool = db::init_pool(database_url).await.expect("database init failed");
        Arc::new(PgMessageStore::new(pool))
    } else {
        tracing::warn!("DATABASE_URL not set; using in-memory message store, history is lost on restart");
        Arc::new(MemoryMessageStore::new())
    };

    let rooms = state::RoomRegistry::new();
    let persist_tx = spawn_persistence_worker(store.clone(), rooms.clone(), PersistConfig::from_env());
    let state = state::AppState::new(
        store,
        rooms,
        Some(persist_tx),
        TokenVerifier::new(&config.jwt_secret),
        config.client_channel_capacity,
    );

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "draw server listening");
    axum::serve(listener, app).await.expect("server failed");
}
