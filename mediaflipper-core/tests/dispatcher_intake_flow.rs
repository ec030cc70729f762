//! End-to-end exercise of the orchestration core against an in-memory
//! `FakeStore`: bulk-list admission through `BulkList`/`bulklist`, container
//! initiation, a dispatcher tick that admits work to a fake cluster
//! launcher, and worker callbacks accepted through `intake::accept_result`
//! that drive the container to completion and free its running-queue slot
//! (spec §2's end-to-end flow, §8 scenario 6).
use std::sync::Arc;

use mediaflipper_core::bulklist;
use mediaflipper_core::model::{
    AnalysisResultPayload, BulkItem, BulkItemState, BulkList, ImageSettings, JobContainer, JobStatus,
    JobStepKind, ResultPayload, ThumbnailResultPayload, TranscodeResultPayload, TranscodeSettings,
};
use mediaflipper_core::queue::{
    enqueue_request, Dispatcher, InMemoryTemplateSource, LoggingClusterLauncher,
};
use mediaflipper_core::store::{keys, FakeStore, Store, StoreExt};
use mediaflipper_core::{intake, AppError};

fn templates() -> Arc<InMemoryTemplateSource> {
    Arc::new(
        InMemoryTemplateSource::new()
            .with("analysis-job.yaml", "mode=${WRAPPER_MODE} file=${FILE_NAME}")
            .with("thumbnail-job.yaml", "mode=${WRAPPER_MODE} frame=${THUMBNAIL_FRAME}")
            .with("transcode-job.yaml", "mode=${WRAPPER_MODE} settings=${TRANSCODE_SETTINGS}"),
    )
}

/// Walks one container through its whole pipeline: upload into a bulk list,
/// claim it via `DequeueForQueue`, initiate a two-step container, dispatch
/// both steps one at a time via worker callbacks, and confirm the container
/// lands `Completed` with the running queue empty at the end.
#[actix_rt::test]
async fn full_pipeline_drains_both_queues_and_completes_the_container() {
    let store: Arc<dyn Store> = Arc::new(FakeStore::new());
    let dispatcher = Dispatcher::new(store.clone(), Arc::new(LoggingClusterLauncher), templates(), 10);

    let list = BulkList::create(store.as_ref(), "nightly-batch").await.unwrap();
    let mut item = BulkItem::new(list.id, "path/to/file1.mp4", 0);
    item.state = BulkItemState::Pending;
    bulklist::add_record(store.as_ref(), &item).await.unwrap();

    let claimed = bulklist::dequeue_for_queue(
        store.as_ref(),
        list.id,
        BulkItemState::Pending,
        BulkItemState::Active,
        10,
    )
    .await
    .unwrap();
    assert_eq!(claimed.len(), 1);
    let claimed_item = &claimed[0];

    let container = JobContainer::initiate(
        claimed_item,
        vec![
            JobStepKind::Analysis,
            JobStepKind::Thumbnail { frame_seconds: 4.5 },
        ],
    );
    let container_id = container.id;
    container.save(store.as_ref()).await.unwrap();
    enqueue_request(store.as_ref(), container_id).await.unwrap();

    // Tick 1: admits the analysis step.
    let report = dispatcher.tick().await.unwrap();
    assert_eq!(report.admitted, 1);
    assert_eq!(store.llen(&keys::queue(keys::RUNNING_QUEUE)).await.unwrap(), 1);
    assert_eq!(store.llen(&keys::queue(keys::REQUEST_QUEUE)).await.unwrap(), 0);

    let after_tick1 = JobContainer::load(store.as_ref(), container_id).await.unwrap();
    let analysis_step_id = after_tick1.steps[0].id();
    assert_eq!(after_tick1.steps[0].status(), JobStatus::Started);

    // Worker callback for the analysis step completes it and re-enqueues
    // the container for its remaining thumbnail step.
    let outcome = intake::accept_result(
        store.as_ref(),
        container_id,
        analysis_step_id,
        ResultPayload::Analysis(AnalysisResultPayload {
            time_taken: 2.1,
            error_message: None,
            metadata: serde_json::json!({"duration": 120.0}),
        }),
    )
    .await
    .unwrap();
    assert_eq!(outcome, intake::IntakeOutcome::Ok);
    assert_eq!(store.llen(&keys::queue(keys::RUNNING_QUEUE)).await.unwrap(), 0);
    assert_eq!(store.llen(&keys::queue(keys::REQUEST_QUEUE)).await.unwrap(), 1);

    // Tick 2: admits the thumbnail step.
    let report = dispatcher.tick().await.unwrap();
    assert_eq!(report.admitted, 1);

    let after_tick2 = JobContainer::load(store.as_ref(), container_id).await.unwrap();
    let thumbnail_step_id = after_tick2.steps[1].id();
    assert_eq!(after_tick2.steps[1].status(), JobStatus::Started);

    let outcome = intake::accept_result(
        store.as_ref(),
        container_id,
        thumbnail_step_id,
        ResultPayload::Thumbnail(ThumbnailResultPayload {
            out_path: Some("/tmp/thumb.jpg".into()),
            time_taken: 0.8,
            error_message: None,
        }),
    )
    .await
    .unwrap();
    assert_eq!(outcome, intake::IntakeOutcome::Ok);

    let final_container = JobContainer::load(store.as_ref(), container_id).await.unwrap();
    assert_eq!(final_container.status, JobStatus::Completed);
    assert_eq!(final_container.completed_steps, 2);
    assert!(final_container.thumbnail_id.is_some());
    assert_eq!(store.llen(&keys::queue(keys::RUNNING_QUEUE)).await.unwrap(), 0);
    assert_eq!(store.llen(&keys::queue(keys::REQUEST_QUEUE)).await.unwrap(), 0);

    let remaining_in_bulk_list =
        bulklist::filter_records_by_state(store.as_ref(), list.id, BulkItemState::Active).await.unwrap();
    assert_eq!(remaining_in_bulk_list.len(), 1);
}

/// A failed transcode callback leaves both the step and the single-step
/// container `Failed` (spec §8 scenario 4), and the running queue is freed.
#[actix_rt::test]
async fn failed_transcode_result_fails_the_single_step_container() {
    let store: Arc<dyn Store> = Arc::new(FakeStore::new());
    let list = BulkList::create(store.as_ref(), "batch").await.unwrap();
    let item = BulkItem::new(list.id, "path/to/file2.mov", 0);
    item.save(store.as_ref()).await.unwrap();

    let container = JobContainer::initiate(
        &item,
        vec![JobStepKind::Transcode {
            settings: TranscodeSettings::ImageSettings(ImageSettings { width: 640, height: 480, format: "jpg".into() }),
        }],
    );
    let container_id = container.id;
    container.save(store.as_ref()).await.unwrap();
    store.rpush(&keys::queue(keys::RUNNING_QUEUE), container_id.to_string()).await.unwrap();
    let step_id = container.steps[0].id();

    let outcome = intake::accept_result(
        store.as_ref(),
        container_id,
        step_id,
        ResultPayload::Transcode(TranscodeResultPayload {
            out_file: None,
            time_taken: 5.0,
            error_message: Some("codec failed".into()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(outcome, intake::IntakeOutcome::Ok);

    let reloaded = JobContainer::load(store.as_ref(), container_id).await.unwrap();
    assert_eq!(reloaded.status, JobStatus::Failed);
    assert_eq!(reloaded.steps[0].status(), JobStatus::Failed);
    assert_eq!(store.llen(&keys::queue(keys::RUNNING_QUEUE)).await.unwrap(), 0);
    assert_eq!(store.llen(&keys::queue(keys::REQUEST_QUEUE)).await.unwrap(), 0);
}

/// Spec §8 scenario 6: with `max=2` and three containers queued, exactly
/// two are admitted to the running queue after one tick and the third stays
/// queued.
#[actix_rt::test]
async fn admission_budget_caps_running_queue_across_three_containers() {
    let store: Arc<dyn Store> = Arc::new(FakeStore::new());
    let dispatcher = Dispatcher::new(store.clone(), Arc::new(LoggingClusterLauncher), templates(), 2);

    for i in 0..3 {
        let item = BulkItem::new(uuid::Uuid::new_v4(), format!("path/to/file{i}"), 0);
        let container = JobContainer::initiate(&item, vec![JobStepKind::Analysis]);
        container.save(store.as_ref()).await.unwrap();
        enqueue_request(store.as_ref(), container.id).await.unwrap();
    }

    let report = dispatcher.tick().await.unwrap();
    assert_eq!(report.admitted, 2);
    assert_eq!(store.llen(&keys::queue(keys::RUNNING_QUEUE)).await.unwrap(), 2);
    assert_eq!(store.llen(&keys::queue(keys::REQUEST_QUEUE)).await.unwrap(), 1);
}

/// A result callback that names a container with no such id is a 404-class
/// `NotFound`, and never mutates anything (spec §4.5 step 4).
#[actix_rt::test]
async fn result_for_unknown_container_is_not_found_and_mutates_nothing() {
    let store: Arc<dyn Store> = Arc::new(FakeStore::new());
    let bogus_container = uuid::Uuid::new_v4();
    let bogus_step = uuid::Uuid::new_v4();

    let err = intake::accept_result(
        store.as_ref(),
        bogus_container,
        bogus_step,
        ResultPayload::Analysis(AnalysisResultPayload {
            time_taken: 1.0,
            error_message: None,
            metadata: serde_json::json!({}),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
