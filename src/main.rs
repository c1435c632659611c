use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use std::sync::Arc;

mod api;
mod auth;
mod backend;
mod clock;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod router;
mod routes;
mod state;
mod store;
mod utils;

use auth::provider::StoreAuthProvider;
use backend::Backend;
use clock::SystemClock;
use config::{Config, StoreBackend};
use db::init_db;
use store::{DocumentStore, MemoryStore, MySqlStore};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store: Arc<dyn DocumentStore> = match &config.store {
        StoreBackend::Memory => {
            warn!("Using the in-memory store, data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::MySql { database_url } => {
            let pool = init_db(database_url).await?;
            Arc::new(MySqlStore::connect(pool).await?)
        }
    };

    let provider = Arc::new(StoreAuthProvider::new(store.clone()));

    let provider_for_warmup = provider.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = provider_for_warmup.warmup(250).await {
            warn!(error = %e, "Failed to warm up the email filter");
        }
    });

    let backend = Data::new(Backend::new(
        store,
        provider,
        Arc::new(SystemClock),
        &config,
    ));

    // 👇 clone what you need BEFORE moving config
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(backend.clone())
            // Configure auth, protected and page routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
