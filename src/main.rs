use std::{path::Path, sync::Arc};

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use crate::config::app_config::AppConfig;
use crate::logger::init_logger;
use crate::services::campaign_service::CampaignService;
use crate::services::content_service::{ContentGenerator, HttpContentGenerator};
use crate::services::dispatch_service::{spawn_dispatch_loop, DispatchEngine};
use crate::services::mail_transport::build_transport;
use crate::services::store_service::{CampaignStore, SqliteStore};
use crate::services::tracking_service::TrackingRecorder;

mod app;
mod config;
mod errors;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

/// Crea la carpeta del archivo SQLite si hace falta (p.ej. `data/`).
fn ensure_sqlite_dir(database_url: &str) {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path == ":memory:" {
        return;
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).expect("No se pudo crear el directorio de la DB");
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env();

    // Base de datos
    ensure_sqlite_dir(&config.database_url);
    log::info!("Conectando a SQLite en {}", config.database_url);
    let sqlite = SqliteStore::connect(&config.database_url, config.db_max_connections)
        .await
        .expect("No se pudo conectar a la base de datos SQLite.");
    if let Err(e) = sqlite.run_migrations().await {
        panic!("Fallo en migraciones: {:?}", e);
    }
    let store: Arc<dyn CampaignStore> = Arc::new(sqlite);

    // Colaboradores externos
    let transport = build_transport(&config);
    let generator: Arc<dyn ContentGenerator> = Arc::new(HttpContentGenerator::new(config.ai.clone()));
    if config.app_url.is_none() {
        log::warn!("APP_URL is not set. Open tracking will be disabled.");
    }

    // Servicios
    let engine = DispatchEngine::new(store.clone(), transport.clone(), config.dispatch.clone());
    let campaign_service = CampaignService::new(
        store.clone(),
        transport,
        generator,
        config.app_url.clone(),
        config.dispatch.clone(),
    );
    let recorder = TrackingRecorder::new(store);

    // Loop de envíos programados (reemplaza al polling del navegador)
    let _dispatch_loop = spawn_dispatch_loop(engine.clone(), config.dispatch.interval_secs);

    log::info!("Levantando servidor en {}:{}", config.bind_addr, config.port);
    let bind = (config.bind_addr.clone(), config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(engine.clone()))
            .app_data(web::Data::new(campaign_service.clone()))
            .app_data(web::Data::new(recorder.clone()))
            .configure(app::init_app)
    })
    .bind(bind)?
    .run()
    .await
}
