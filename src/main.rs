use std::net::SocketAddr;
use std::sync::Arc;

use thingaha_server::config::{Config, StorageBackend};
use thingaha_server::db::PgStore;
use thingaha_server::service::MemoryStore;
use thingaha_server::storage::{LocalStorage, PhotoStorage, S3Storage};
use thingaha_server::{app, auth, AppState};

async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let photos: Arc<dyn PhotoStorage> = match config.storage.backend {
        StorageBackend::Local => Arc::new(LocalStorage::prepare(config.storage.clone()).await?),
        StorageBackend::S3 => Arc::new(S3Storage::from_env(config.storage.clone()).await),
    };

    let state = match config.database.url.clone() {
        Some(url) => {
            let store = Arc::new(PgStore::connect(&config.database, &url).await?);
            store.run_migrations().await?;
            AppState {
                students: store.clone(),
                addresses: store.clone(),
                users: store,
                photos,
                config: Arc::new(config),
            }
        }
        None => {
            log::warn!("DATABASE__URL is not set, records are kept in memory only");
            let store = Arc::new(MemoryStore::new());
            AppState {
                students: store.clone(),
                addresses: store.clone(),
                users: store,
                photos,
                config: Arc::new(config),
            }
        }
    };
    Ok(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::load()?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = build_state(config).await?;

    if let Some(admin) = &state.config.admin {
        auth::ensure_admin(state.users.as_ref(), admin).await?;
    }

    log::info!("Starting Thingaha HTTP Server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
