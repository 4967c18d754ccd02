use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod auth;
mod collab;
mod config;
mod core;
mod db;
mod directory;
mod docs;
mod error;
mod ledger;
mod model;
mod routes;

use collab::face::{FaceIndex, HttpFaceIndex, sweep_orphan_faces};
use collab::photos::{DiskPhotoStore, PhotoStore};
use config::Config;
use db::init_db;
use directory::TenantDirectory;
use ledger::EventLedger;

use crate::docs::ApiDoc;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Ponto Eletrônico"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;

    let faces: Arc<dyn FaceIndex> = Arc::new(HttpFaceIndex::new(&config));
    let photos: Arc<dyn PhotoStore> = Arc::new(DiskPhotoStore::new(&config));

    let ledger = EventLedger::new(pool.clone());
    let directory = TenantDirectory::new(pool.clone());

    // Employees deleted while the face service was down leave enrollments
    // behind; sweep them off the index in the background.
    let pool_for_sweep = pool.clone();
    let faces_for_sweep = faces.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = sweep_orphan_faces(&pool_for_sweep, faces_for_sweep.as_ref()).await {
            tracing::warn!(error = %e, "Face sweep failed");
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(ledger.clone()))
            .app_data(Data::new(directory.clone()))
            .app_data(Data::from(faces.clone()))
            .app_data(Data::from(photos.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
