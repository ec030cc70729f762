//! MediaFlipper Job Orchestration Core - HTTP + Dispatcher entry point.
//!
//! Runs an HTTP listener and the Dispatcher tick loop as sibling tasks
//! under one `JoinSet`, sharing a single Redis connection manager
//! (spec §1 [AMBIENT] Process model, mirroring `media-service::main`'s
//! HTTP + gRPC task pair).
use std::io;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use mediaflipper_core::queue::{Dispatcher, LoggingClusterLauncher};
use mediaflipper_core::store::RedisStore;
use mediaflipper_core::{AppState, Config};
use tokio::task::JoinSet;

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("failed to load configuration");

    let pool = redis_utils::RedisPool::connect(&config.redis.url, config.redis.sentinel.clone())
        .await
        .expect("failed to connect to redis");
    let store: Arc<dyn mediaflipper_core::store::Store> = Arc::new(RedisStore::new(pool.manager()));

    let launcher = Arc::new(LoggingClusterLauncher);
    let templates = Arc::new(mediaflipper_core::queue::FsTemplateSource::new(config.dispatcher.templates_dir.clone()));
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), launcher, templates, config.dispatcher.max_concurrent_jobs));

    let state = AppState { store: store.clone(), dispatcher: dispatcher.clone() };

    let http_bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!(address = %http_bind_address, "mediaflipper-server starting HTTP server");

    let server = HttpServer::new(move || {
        App::new()
            .wrap(actix_middleware::Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(mediaflipper_core::routes::configure)
    })
    .bind(&http_bind_address)?
    .run();

    let tick_interval = Duration::from_millis(config.dispatcher.tick_interval_ms);
    let mut tasks = JoinSet::new();

    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    tasks.spawn(run_dispatcher_loop(dispatcher, tick_interval));

    let mut first_error = None;
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(_)) => {
                tracing::warn!("a server task completed unexpectedly");
            }
            Ok(Err(e)) => {
                tracing::error!("server error: {e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(e) => {
                tracing::error!("task join error: {e}");
                if first_error.is_none() {
                    first_error = Some(io::Error::new(io::ErrorKind::Other, format!("{e}")));
                }
            }
        }
    }

    tracing::info!("mediaflipper-server shutting down");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Runs the Dispatcher's admission cycle on a fixed interval (spec §4.4,
/// §5's "single logical worker"). Never returns under normal operation;
/// the `io::Result` return type only exists so this task's future shares
/// a type with the HTTP server task in the same `JoinSet`.
async fn run_dispatcher_loop(dispatcher: Arc<Dispatcher>, interval: Duration) -> io::Result<()> {
    tracing::info!("dispatcher tick loop is running");
    loop {
        if let Err(e) = dispatcher.tick().await {
            e.log();
        }
        tokio::time::sleep(interval).await;
    }
}
