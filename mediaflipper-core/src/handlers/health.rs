/// Health/readiness handlers (spec §9 [AMBIENT], matching the reference
/// `media-service::main`'s health/ready/live routes).
use actix_web::{web, HttpResponse};

use crate::AppState;

pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

/// Reports readiness by exercising the store: an `EXISTS` on a well-known
/// sentinel key is enough to confirm the Redis connection is live without
/// depending on any application data being present.
pub async fn readyz(state: web::Data<AppState>) -> HttpResponse {
    match state.store.exists("mediaflipper:readyz-probe").await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({"status": "ready"})),
        Err(e) => {
            e.log();
            HttpResponse::ServiceUnavailable().json(serde_json::json!({"status": "not_ready"}))
        }
    }
}
