use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::{self, Data};
use actix_web::{App, HttpServer, ResponseError};
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod utils;

use crate::attendance::{
    calculator::AttendanceDayCalculator,
    clock::OfficeClock,
    mysql_store::MySqlAttendanceStore,
    policy::AttendancePolicy,
};
use crate::docs::ApiDoc;
use crate::error::AppError;
use crate::routes::RateLimiters;
use config::Config;
use db::init_db;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Malformed JSON bodies and query strings answer with the usual error body.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let app_err = AppError::Validation(format!("Invalid request body: {err}"));
        actix_web::error::InternalError::from_response(err, app_err.error_response()).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let app_err = AppError::Validation(format!("Invalid query string: {err}"));
        actix_web::error::InternalError::from_response(err, app_err.error_response()).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let app_err = AppError::Validation(format!("Invalid path: {err}"));
        actix_web::error::InternalError::from_response(err, app_err.error_response()).into()
    })
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(
        addr = %config.server_addr,
        utc_offset = %config.utc_offset,
        "Server starting..."
    );

    let pool = init_db(&config.database_url, config.db_max_connections).await?;

    let policy = AttendancePolicy {
        standard_hours: config.standard_hours,
        half_day_hours: config.half_day_hours,
    };
    let calculator = Data::new(AttendanceDayCalculator::new(
        Arc::new(MySqlAttendanceStore::new(pool.clone())),
        policy,
        config.default_shift_id,
        config.max_leave_days,
    ));
    let clock = Data::new(OfficeClock::system(config.utc_offset));
    let limiters = RateLimiters::from_config(&config)?;

    let server_addr = config.server_addr.clone();
    let pool_data = Data::new(pool);
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(routes::cors(&config_data))
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .app_data(calculator.clone())
            .app_data(clock.clone())
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config_data, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
