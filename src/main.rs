use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod badge;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod store;
mod utils;

use config::Config;
use db::{bootstrap_schema, init_db};

use crate::badge::ProcessGuard;
use crate::store::month::latest_month;
use crate::utils::member_cache::{self, CacheLayer};
use crate::utils::member_filter;
use tracing::info;
use tracing_appender::rolling;
use utoipa_swagger_ui::SwaggerUi;
use crate::docs::ApiDoc;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()

#[get("/")]
async fn index() -> impl Responder {
    "Church Attendance Tracker"
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
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;
    bootstrap_schema(&pool)
        .await
        .expect("Failed to bootstrap fixed tables");

    let cache = CacheLayer::new(config.cache_ttl_secs);
    let guard = Data::new(ProcessGuard::default());

    // Warm the caches from the most recent month, if any exists yet.
    let pool_for_filter_warmup = pool.clone();
    let pool_for_cache_warmup = pool.clone();
    let cache_for_warmup = cache.clone();

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    actix_web::rt::spawn(async move {
        match latest_month(&pool_for_filter_warmup).await {
            Ok(Some(month)) => {
                if let Err(e) = member_filter::warmup_member_filter(
                    &pool_for_filter_warmup,
                    &month.table_name,
                    100,
                )
                .await
                {
                    eprintln!("Failed to warmup member name filter: {:?}", e);
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("Failed to find latest month for filter warmup: {:?}", e),
        }
    });

    actix_web::rt::spawn(async move {
        match latest_month(&pool_for_cache_warmup).await {
            Ok(Some(month)) => {
                if let Err(e) = member_cache::warmup_member_cache(
                    &pool_for_cache_warmup,
                    &cache_for_warmup,
                    &month.table_name,
                )
                .await
                {
                    eprintln!("Failed to warmup member cache: {:?}", e);
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("Failed to find latest month for cache warmup: {:?}", e),
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(cache.clone()))
            .app_data(guard.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
