/// Result callback handlers - the worker-facing endpoint that binds a
/// result to its step (spec §4.5, §6 `POST /api/<kind>/result`).
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::intake::{self, IntakeOutcome};
use crate::model::{AnalysisResultPayload, ResultPayload, ThumbnailResultPayload, TranscodeResultPayload};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResultQuery {
    #[serde(rename = "forJob")]
    pub for_job: Uuid,
    #[serde(rename = "stepId")]
    pub step_id: Uuid,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: &'static str,
}

/// Parses the body according to `kind` and hands it to `intake::accept_result`
/// (spec §4.5 steps 1-11). A parse failure is a 400 `bad_request`, matching
/// step 1's "respond 400 ... and do nothing"; every other outcome maps to
/// the `{status}` bodies step 9 pins to 200.
pub async fn accept_result(
    state: web::Data<AppState>,
    kind: web::Path<String>,
    query: web::Query<ResultQuery>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let payload = parse_payload(&kind, &body)?;

    let outcome = intake::accept_result(state.store.as_ref(), query.for_job, query.step_id, payload).await?;

    let status = match outcome {
        IntakeOutcome::Ok => "ok",
        IntakeOutcome::Dropped => "dropped",
        IntakeOutcome::AlreadyTerminal => "ok",
        IntakeOutcome::DbError => "db_error",
    };
    Ok(HttpResponse::Ok().json(StatusBody { status }))
}

fn parse_payload(kind: &str, body: &[u8]) -> Result<ResultPayload> {
    match kind {
        "analysis" => {
            let payload: AnalysisResultPayload =
                serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid analysis result: {e}")))?;
            Ok(ResultPayload::Analysis(payload))
        }
        "thumbnail" => {
            let payload: ThumbnailResultPayload =
                serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid thumbnail result: {e}")))?;
            Ok(ResultPayload::Thumbnail(payload))
        }
        "transcode" => {
            let payload: TranscodeResultPayload =
                serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid transcode result: {e}")))?;
            Ok(ResultPayload::Transcode(payload))
        }
        other => Err(AppError::BadRequest(format!("unknown result kind {other}"))),
    }
}
