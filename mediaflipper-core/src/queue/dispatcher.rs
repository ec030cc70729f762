//! The bounded-concurrency gate between pending work and the cluster
//! (spec §4.4). One `Dispatcher` owns a single tick loop; `tick()` is the
//! whole admission cycle and is meant to be called serially, matching
//! spec §5's "the Dispatcher runs as a single logical worker".
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::Result;
use crate::model::{JobContainer, JobStep, MediaType};
use crate::store::{keys, Store, StoreExt};

use super::cluster::ClusterLauncher;
use super::lock::when_queue_available;
use super::manifest::{render, TemplateSource};

/// Maximum concurrent jobs the Dispatcher will admit at once (spec §4.4,
/// default 10).
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 10;

/// Default retry budget handed to workers via `MAX_RETRIES`; the core
/// itself never retries (spec §5 Failure policy), this only tells the
/// worker wrapper how many times *it* may retry its own callback POST.
const DEFAULT_MAX_RETRIES: u32 = 3;

pub struct Dispatcher {
    store: Arc<dyn Store>,
    launcher: Arc<dyn ClusterLauncher>,
    templates: Arc<dyn TemplateSource>,
    max_concurrent_jobs: usize,
}

/// Summary of one `tick()`, surfaced on `GET /api/jobrunner/status` and
/// useful in tests (spec §8 scenario 6).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub admitted: usize,
    pub submission_failures: usize,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        launcher: Arc<dyn ClusterLauncher>,
        templates: Arc<dyn TemplateSource>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self { store, launcher, templates, max_concurrent_jobs }
    }

    /// Configured admission budget, surfaced on `GET /api/jobrunner/status`.
    pub fn max_concurrent_jobs(&self) -> usize {
        self.max_concurrent_jobs
    }

    /// One admission cycle (spec §4.4). Computes available slots, claims
    /// that many containers off the request queue, and for each either
    /// admits it to the cluster or fails it forward. The slot computation
    /// and the eventual RPUSH onto the running queue happen under the same
    /// advisory-lock acquisition (spec §5: "the Dispatcher must not observe
    /// the running queue between its LEN check and its LPUSH on admission").
    pub async fn tick(&self) -> Result<TickReport> {
        when_queue_available(self.store.as_ref(), keys::RUNNING_QUEUE, true, || async {
            let running_len = self.store.llen(&keys::queue(keys::RUNNING_QUEUE)).await?;
            let slots = self.max_concurrent_jobs.saturating_sub(running_len);
            if slots == 0 {
                return Ok(TickReport::default());
            }

            let claimed = self.store.lpop_n(&keys::queue(keys::REQUEST_QUEUE), slots).await?;
            let mut report = TickReport::default();
            for raw_id in claimed {
                let Ok(container_id) = raw_id.parse::<Uuid>() else { continue };
                match self.admit_one(container_id).await {
                    Ok(true) => report.admitted += 1,
                    Ok(false) => report.submission_failures += 1,
                    Err(e) => {
                        e.log();
                        report.submission_failures += 1;
                    }
                }
            }
            Ok(report)
        })
        .await
    }

    /// Admits a single claimed container: selects its next step, renders a
    /// manifest, and submits it. Returns `Ok(true)` on a successful
    /// submission, `Ok(false)` if submission failed and was handled per
    /// spec §4.4 step 4.
    async fn admit_one(&self, container_id: Uuid) -> Result<bool> {
        let mut container = JobContainer::load(self.store.as_ref(), container_id).await?;
        let Some(step) = container.next_pending_step().cloned() else {
            // No non-terminal step left; nothing to admit (spec §9 boundary:
            // an already-terminal container reaching the queue is a no-op).
            return Ok(true);
        };

        let manifest_template = self.templates.load(&step.common().template_file).await?;
        let env = build_env(&container, &step);
        let manifest = render(&manifest_template, &env);

        match self.launcher.launch(&manifest).await {
            Ok(()) => {
                let started = step.with_new_status(crate::model::JobStatus::Started, None);
                container.update_step_by_id(started);
                container.save(self.store.as_ref()).await?;
                self.store.rpush(&keys::queue(keys::RUNNING_QUEUE), container.id.to_string()).await?;
                Ok(true)
            }
            Err(submission_err) => {
                let failed = step.with_new_status(crate::model::JobStatus::Failed, Some(submission_err));
                container.update_step_by_id(failed);
                container.save(self.store.as_ref()).await?;
                if container.has_remaining_steps() {
                    self.store.rpush(&keys::queue(keys::REQUEST_QUEUE), container.id.to_string()).await?;
                }
                Ok(false)
            }
        }
    }
}

/// Pushes a container's id onto the request queue (spec §2 Flow: "Containers
/// are pushed to the request queue"). The canonical record at
/// `jobcontainer:<id>` is always loaded fresh on dequeue, so the queue entry
/// only needs to be an id — a full snapshot would already be stale the
/// instant the first step transitions (see DESIGN.md).
pub async fn enqueue_request(store: &dyn Store, container_id: Uuid) -> Result<()> {
    store.rpush(&keys::queue(keys::REQUEST_QUEUE), container_id.to_string()).await
}

/// Removes a container from the running queue once its callback has been
/// processed (spec §2 Flow, §4.5 step 10's surrounding narrative).
pub async fn remove_from_running_queue(store: &dyn Store, container_id: Uuid) -> Result<()> {
    store.lrem(&keys::queue(keys::RUNNING_QUEUE), &container_id.to_string()).await
}

/// Builds the environment-variable map a rendered manifest substitutes in
/// (spec §4.4 step 2), one entry per variable the worker wrapper expects.
fn build_env(container: &JobContainer, step: &JobStep) -> BTreeMap<&'static str, String> {
    let mut env = BTreeMap::new();
    env.insert("WRAPPER_MODE", step.kind_name().to_string());
    env.insert("JOB_CONTAINER_ID", container.id.to_string());
    env.insert("JOB_STEP_ID", step.id().to_string());
    env.insert("FILE_NAME", container.media_file.clone());
    env.insert("MAX_RETRIES", DEFAULT_MAX_RETRIES.to_string());
    env.insert("MEDIA_TYPE", media_type_label(container.item_type).to_string());
    env.insert("OUTPUT_PATH", output_path_for(container, step));

    if let JobStep::Transcode { transcode_settings, .. } = step {
        if let Ok(json) = serde_json::to_string(transcode_settings) {
            env.insert("TRANSCODE_SETTINGS", json);
        }
    }
    if let JobStep::Thumbnail { thumbnail_frame_seconds, .. } = step {
        env.insert("THUMBNAIL_FRAME", thumbnail_frame_seconds.to_string());
    }

    env
}

fn media_type_label(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Video => "video",
        MediaType::Audio => "audio",
        MediaType::Image => "image",
        MediaType::Other => "other",
    }
}

fn output_path_for(container: &JobContainer, step: &JobStep) -> String {
    match step {
        JobStep::Transcode { transcode_settings, .. } => {
            format!("{}.{}", step.id(), transcode_settings.likely_output_extension())
        }
        JobStep::Thumbnail { .. } => format!("{}.jpg", step.id()),
        JobStep::Analysis { .. } => format!("{}.json", container.id),
    }
}
