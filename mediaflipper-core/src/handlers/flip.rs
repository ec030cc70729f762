/// Flip handlers - HTTP endpoint that initiates JobContainers for a bulk
/// list (spec §6 `POST /api/flip/<kind>?forBulk=<id>`).
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bulklist;
use crate::error::{AppError, Result};
use crate::model::{BulkItemState, JobContainer, JobStepKind, TranscodeSettings};
use crate::queue;
use crate::AppState;

/// Claims at most this many Pending items per flip call when the caller
/// doesn't supply `limit`. Unbounded claiming would let one request stall
/// behind an arbitrarily large bulk list.
const DEFAULT_FLIP_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct FlipQuery {
    #[serde(rename = "forBulk")]
    pub for_bulk: Uuid,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FlipResponse {
    #[serde(rename = "containerIds")]
    pub container_ids: Vec<Uuid>,
}

/// Claims up to `limit` `Pending` items from the named bulk list (moving
/// them to `Active` via the indexer's `DequeueForQueue`, spec §4.2), builds
/// a single-step `JobContainer` per item, and pushes each onto the request
/// queue for the Dispatcher to pick up.
pub async fn initiate_flip(
    state: web::Data<AppState>,
    kind: web::Path<String>,
    query: web::Query<FlipQuery>,
    body: Option<web::Json<serde_json::Value>>,
) -> Result<HttpResponse> {
    let kind_template = parse_kind(&kind, body.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_FLIP_LIMIT);

    let claimed = bulklist::dequeue_for_queue(
        state.store.as_ref(),
        query.for_bulk,
        BulkItemState::Pending,
        BulkItemState::Active,
        limit,
    )
    .await?;

    let mut container_ids = Vec::with_capacity(claimed.len());
    for item in &claimed {
        let container = JobContainer::initiate(item, vec![kind_template.clone()]);
        container.save(state.store.as_ref()).await?;
        queue::enqueue_request(state.store.as_ref(), container.id).await?;
        container_ids.push(container.id);
    }

    tracing::info!(bulk_list_id = %query.for_bulk, initiated = container_ids.len(), "initiated jobs for bulk list");
    Ok(HttpResponse::Ok().json(FlipResponse { container_ids }))
}

fn parse_kind(kind: &str, body: Option<&serde_json::Value>) -> Result<JobStepKind> {
    match kind {
        "analysis" => Ok(JobStepKind::Analysis),
        "thumbnail" => {
            let frame_seconds = body
                .and_then(|b| b.get("thumbnailFrameSeconds"))
                .and_then(|v| v.as_f64())
                .ok_or_else(|| AppError::BadRequest("thumbnailFrameSeconds is required".to_string()))?;
            Ok(JobStepKind::Thumbnail { frame_seconds })
        }
        "transcode" => {
            let raw = body
                .and_then(|b| b.get("transcodeSettings"))
                .ok_or_else(|| AppError::BadRequest("transcodeSettings is required".to_string()))?;
            let settings: TranscodeSettings = serde_json::from_value(raw.clone())
                .map_err(|e| AppError::BadRequest(format!("invalid transcodeSettings: {e}")))?;
            Ok(JobStepKind::Transcode { settings })
        }
        other => Err(AppError::BadRequest(format!("unknown flip kind {other}"))),
    }
}
