use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use std::sync::Arc;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod model;
mod models;
mod routes;

use attendance::clock::SystemClock;
use attendance::mysql::MySqlAttendanceStore;
use attendance::service::AttendanceService;
use attendance::store::{AttendanceStore, MemoryAttendanceStore};
use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "WorkFlowX attendance"
}

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

    info!(cutoff = %config.checkin_cutoff, "Server starting...");

    match config.database_url.clone() {
        Some(url) => {
            let pool = init_db(&url)
                .await
                .context("Failed to connect to database")?;
            serve(config, MySqlAttendanceStore::new(pool)).await
        }
        None => {
            warn!("DATABASE_URL not set, attendance is kept in memory and lost on restart");
            serve(config, MemoryAttendanceStore::new()).await
        }
    }
}

async fn serve<S: AttendanceStore>(config: Config, store: S) -> anyhow::Result<()> {
    let service = Data::new(AttendanceService::new(
        store,
        Arc::new(SystemClock),
        config.checkin_cutoff,
    ));
    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        let route_config = config_data.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(service.clone())
            .app_data(config_data.clone())
            .service(index)
            .configure(move |cfg| routes::configure::<S>(cfg, &route_config))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
