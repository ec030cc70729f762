/// Bulk list handlers - HTTP endpoints for creating and browsing bulk
/// uploads (spec §6 `POST /api/bulk/upload`, `GET /api/bulk/list`,
/// `GET /api/bulk/content`).
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bulklist;
use crate::error::{AppError, Result};
use crate::model::{BulkItem, BulkItemState, BulkList};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkUploadResponse {
    #[serde(rename = "bulkListId")]
    pub bulk_list_id: Uuid,
    #[serde(rename = "itemCount")]
    pub item_count: usize,
}

/// Creates a BulkList from a newline-delimited listing of source paths
/// (spec §6). Multipart upload of the listing file itself is a front-end
/// concern and is not implemented by this handler; it accepts the already
/// extracted text body.
pub async fn upload_bulk(
    state: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let text = std::str::from_utf8(&body)
        .map_err(|e| AppError::BadRequest(format!("body is not valid UTF-8: {e}")))?;

    let name = query.name.clone().unwrap_or_else(|| "unnamed".to_string());
    let list = BulkList::create(state.store.as_ref(), name).await?;

    let mut item_count = 0;
    for line in text.lines() {
        let path = line.trim();
        if path.is_empty() {
            continue;
        }
        let mut item = BulkItem::new(list.id, path, 0);
        // Lifecycle: NotQueued -> Pending when added to a bulk list (spec §3).
        item.state = BulkItemState::Pending;
        bulklist::add_record(state.store.as_ref(), &item).await?;
        item_count += 1;
    }

    tracing::info!(bulk_list_id = %list.id, item_count, "created bulk list");
    Ok(HttpResponse::Created().json(BulkUploadResponse { bulk_list_id: list.id, item_count }))
}

/// Enumerates every BulkList ever created (spec §6).
pub async fn list_bulk(state: web::Data<AppState>) -> Result<HttpResponse> {
    let lists = BulkList::all(state.store.as_ref()).await?;
    Ok(HttpResponse::Ok().json(lists))
}

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    #[serde(rename = "forId")]
    pub for_id: Uuid,
    pub state: Option<String>,
}

/// Items belonging to a bulk list, optionally filtered by state (spec §6
/// `GET /api/bulk/content?forId=<id>&state=<name>`).
pub async fn bulk_content(state: web::Data<AppState>, query: web::Query<ContentQuery>) -> Result<HttpResponse> {
    let items = match &query.state {
        Some(raw) => {
            let parsed = parse_bulk_item_state(raw)?;
            bulklist::filter_records_by_state(state.store.as_ref(), query.for_id, parsed).await?
        }
        None => bulklist::get_all_records(state.store.as_ref(), query.for_id).await?,
    };
    Ok(HttpResponse::Ok().json(items))
}

fn parse_bulk_item_state(raw: &str) -> Result<BulkItemState> {
    match raw.to_ascii_lowercase().as_str() {
        "notqueued" => Ok(BulkItemState::NotQueued),
        "pending" => Ok(BulkItemState::Pending),
        "active" => Ok(BulkItemState::Active),
        "completed" => Ok(BulkItemState::Completed),
        "failed" => Ok(BulkItemState::Failed),
        "aborted" => Ok(BulkItemState::Aborted),
        other => Err(AppError::BadRequest(format!("unknown bulk item state {other}"))),
    }
}
