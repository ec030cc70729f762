/// Job runner status handler (spec §6 `GET /api/jobrunner/status`).
use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::error::Result;
use crate::store::keys;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct JobRunnerStatus {
    #[serde(rename = "requestQueueLength")]
    pub request_queue_length: usize,
    #[serde(rename = "runningQueueLength")]
    pub running_queue_length: usize,
    #[serde(rename = "maxConcurrentJobs")]
    pub max_concurrent_jobs: usize,
}

pub async fn status(state: web::Data<AppState>) -> Result<HttpResponse> {
    let request_queue_length = state.store.llen(&keys::queue(keys::REQUEST_QUEUE)).await?;
    let running_queue_length = state.store.llen(&keys::queue(keys::RUNNING_QUEUE)).await?;

    Ok(HttpResponse::Ok().json(JobRunnerStatus {
        request_queue_length,
        running_queue_length,
        max_concurrent_jobs: state.dispatcher.max_concurrent_jobs(),
    }))
}
