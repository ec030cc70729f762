/// Route definitions wiring handlers into the `actix-web` app (spec §6).
use actix_web::web;

use crate::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/healthz", web::get().to(handlers::healthz))
        .route("/api/readyz", web::get().to(handlers::readyz))
        .route("/api/bulk/upload", web::post().to(handlers::upload_bulk))
        .route("/api/bulk/list", web::get().to(handlers::list_bulk))
        .route("/api/bulk/content", web::get().to(handlers::bulk_content))
        .route("/api/flip/{kind}", web::post().to(handlers::initiate_flip))
        .route("/api/{kind}/result", web::post().to(handlers::accept_result))
        .route("/api/jobrunner/status", web::get().to(handlers::status));
}
