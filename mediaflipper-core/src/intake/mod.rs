//! Result Intake (spec §4.5): binds a worker's callback to the persisted
//! step it names, advances the container, and frees a queue slot. The
//! entire multi-write sequence runs under the running-queue advisory lock
//! (spec §5), since the core has no multi-key transaction to rely on.
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::model::{BulkItemState, BulkItem, FileEntry, FileEntryType, JobStatus, ResultPayload};
use crate::queue::{remove_from_running_queue, when_queue_available};
use crate::store::{keys, Store};

use crate::model::JobContainer;

/// Outcome of a single result-intake call, mapped to the wire response by
/// the HTTP handler (spec §4.5 step 9 and its `{status:"..."}` bodies).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Step transitioned and the container was persisted successfully.
    Ok,
    /// The container's owning `BulkItem` is `Aborted`; the result was
    /// dropped without mutating anything (spec §5 Cancellation).
    Dropped,
    /// A duplicate callback for an already-terminal step; idempotent
    /// no-op (spec §4.5 Idempotence).
    AlreadyTerminal,
    /// Persistence failed after the step was computed. Reported in-band
    /// rather than raised to the worker, to avoid retry storms (spec §4.5
    /// step 9, §7).
    DbError,
}

/// Runs the full result-intake protocol (spec §4.5 steps 2-11; step 1's
/// body parse happens in the HTTP handler before this is called). Returns
/// `Err(BadRequest)` for a kind/variant mismatch and `Err(NotFound)` for an
/// unknown container, matching the handler's direct status-code mapping for
/// those two cases; every other outcome — including a store failure — is
/// reported as `Ok(IntakeOutcome)` since spec §4.5 step 9 pins those to a
/// 200 response.
pub async fn accept_result(
    store: &dyn Store,
    container_id: Uuid,
    step_id: Uuid,
    payload: ResultPayload,
) -> Result<IntakeOutcome> {
    let file_entry_id = match payload.output_path() {
        Some(path) => {
            let entry_type = match &payload {
                ResultPayload::Transcode(_) => FileEntryType::Transcode,
                ResultPayload::Thumbnail(_) => FileEntryType::Thumbnail,
                ResultPayload::Analysis(_) => FileEntryType::SourceMedia,
            };
            let entry = FileEntry::new(path, container_id, entry_type);
            entry.store(store).await?;
            Some(entry.id)
        }
        None => None,
    };

    when_queue_available(store, keys::RUNNING_QUEUE, true, || async {
        run_under_lock(store, container_id, step_id, payload, file_entry_id).await
    })
    .await
}

async fn run_under_lock(
    store: &dyn Store,
    container_id: Uuid,
    step_id: Uuid,
    payload: ResultPayload,
    file_entry_id: Option<Uuid>,
) -> Result<IntakeOutcome> {
    let mut container = JobContainer::load(store, container_id).await?;

    if let Some(bulk_id) = container.source_bulk_id {
        if let Ok(item) = BulkItem::load(store, bulk_id).await {
            if item.state == BulkItemState::Aborted {
                return Ok(IntakeOutcome::Dropped);
            }
        }
    }

    let Some(step) = container.find_step_by_id(step_id).cloned() else {
        return Err(AppError::NotFound(format!("step {step_id} in container {container_id}")));
    };

    if step.kind_name() != payload.kind_name() {
        return Err(AppError::BadRequest(format!(
            "callback kind {} does not match step kind {}",
            payload.kind_name(),
            step.kind_name()
        )));
    }

    if step.status().is_terminal() {
        return Ok(IntakeOutcome::AlreadyTerminal);
    }

    let mut updated = step.clone();
    if let Some(entry_id) = file_entry_id {
        updated = set_output_id(updated, entry_id);
        if matches!(payload, ResultPayload::Transcode(_)) {
            container.transcoded_media_id = Some(entry_id);
        }
        if matches!(payload, ResultPayload::Thumbnail(_)) {
            container.thumbnail_id = Some(entry_id);
        }
    }

    let next_status = if payload.error_message().is_some() { JobStatus::Failed } else { JobStatus::Completed };
    updated = updated.with_new_status(next_status, payload.error_message().map(str::to_string));
    set_time_taken(&mut updated, payload.time_taken());

    container.update_step_by_id(updated);

    match container.save(store).await {
        Ok(()) => {}
        Err(AppError::DbError(_)) => return Ok(IntakeOutcome::DbError),
        Err(other) => return Err(other),
    }

    remove_from_running_queue(store, container.id).await?;
    if !container.status.is_terminal() && container.has_remaining_steps() {
        crate::queue::enqueue_request(store, container.id).await?;
    }

    Ok(IntakeOutcome::Ok)
}

fn set_output_id(step: crate::model::JobStep, entry_id: Uuid) -> crate::model::JobStep {
    use crate::model::JobStep;
    match step {
        JobStep::Analysis { mut common } => {
            common.output_id = Some(entry_id);
            JobStep::Analysis { common }
        }
        JobStep::Thumbnail { mut common, thumbnail_frame_seconds } => {
            common.output_id = Some(entry_id);
            JobStep::Thumbnail { common, thumbnail_frame_seconds }
        }
        JobStep::Transcode { mut common, transcode_settings } => {
            common.output_id = Some(entry_id);
            JobStep::Transcode { common, transcode_settings }
        }
    }
}

fn set_time_taken(step: &mut crate::model::JobStep, time_taken: f64) {
    use crate::model::JobStep;
    let common = match step {
        JobStep::Analysis { common } => common,
        JobStep::Thumbnail { common, .. } => common,
        JobStep::Transcode { common, .. } => common,
    };
    common.time_taken = Some(time_taken);
}
