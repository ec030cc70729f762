use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::store::{keys, Store, StoreExt};

use super::bulk_item::BulkItem;
use super::job_step::{JobStep, JobStepKind};
use super::status::{JobStatus, MediaType};

/// The pipeline run for a single `BulkItem`: an ordered sequence of steps
/// plus an aggregate status derived from them (spec §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobContainer {
    pub id: Uuid,
    #[serde(rename = "sourceBulkId")]
    pub source_bulk_id: Option<Uuid>,
    #[serde(rename = "mediaFile")]
    pub media_file: String,
    #[serde(rename = "incomingFileType")]
    pub incoming_file_type: String,
    #[serde(rename = "itemType")]
    pub item_type: MediaType,
    pub status: JobStatus,
    #[serde(rename = "startTime")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "endTime")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
    #[serde(rename = "transcodedMediaId")]
    pub transcoded_media_id: Option<Uuid>,
    pub steps: Vec<JobStep>,
    #[serde(rename = "completedSteps")]
    pub completed_steps: usize,
    #[serde(rename = "thumbnailId")]
    pub thumbnail_id: Option<Uuid>,
}

impl JobContainer {
    /// Materializes a container for `bulk_item`'s pipeline (spec §2's
    /// "separate initiation call", §4.3). Builds one `Pending` step per
    /// requested `JobStepKind`, in the requested order; the container's own
    /// status starts `Pending`.
    pub fn initiate(bulk_item: &BulkItem, step_kinds: Vec<JobStepKind>) -> Self {
        let id = Uuid::new_v4();
        let steps = step_kinds.into_iter().map(|kind| JobStep::new(id, kind)).collect();
        Self {
            id,
            source_bulk_id: Some(bulk_item.id),
            media_file: bulk_item.source_path.clone(),
            incoming_file_type: format!("{:?}", bulk_item.item_type).to_lowercase(),
            item_type: bulk_item.item_type,
            status: JobStatus::Pending,
            start_time: None,
            end_time: None,
            error_message: None,
            transcoded_media_id: None,
            steps,
            completed_steps: 0,
            thumbnail_id: None,
        }
    }

    pub fn find_step_by_id(&self, step_id: Uuid) -> Option<&JobStep> {
        self.steps.iter().find(|s| s.id() == step_id)
    }

    /// The next non-terminal step, i.e. the one the Dispatcher should admit
    /// next (spec §4.4 step 1). Steps are strictly sequential: the earliest
    /// non-terminal step is always the only one that may be live.
    pub fn next_pending_step(&self) -> Option<&JobStep> {
        self.steps.iter().find(|s| !s.status().is_terminal())
    }

    pub fn has_remaining_steps(&self) -> bool {
        self.next_pending_step().is_some()
    }

    /// Replaces the step matching `updated`'s id, recomputes
    /// `completed_steps` and the aggregate container status (spec §4.3
    /// `UpdateStepById`, §8 invariant `completedSteps = |{terminal steps}|`).
    /// Returns whether a matching step was found.
    pub fn update_step_by_id(&mut self, updated: JobStep) -> bool {
        let Some(slot) = self.steps.iter_mut().find(|s| s.id() == updated.id()) else {
            return false;
        };
        *slot = updated;
        self.completed_steps = self.steps.iter().filter(|s| s.status().is_terminal()).count();

        if self.steps.iter().all(|s| s.status().is_terminal()) {
            self.status = if self.steps.iter().any(|s| s.status() == JobStatus::Failed) {
                JobStatus::Failed
            } else {
                JobStatus::Completed
            };
            self.end_time = Some(Utc::now());
        } else if self.status == JobStatus::Pending {
            self.status = JobStatus::Running;
            self.start_time.get_or_insert(Utc::now());
        }
        true
    }

    /// Marks the container itself as fatally failed, independent of any
    /// individual step (spec §7: "container-level fatal errors abort the
    /// container and mark it Failed").
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(reason.into());
        self.end_time = Some(Utc::now());
    }

    pub async fn load(store: &dyn Store, id: Uuid) -> Result<Self> {
        store
            .get_json(&keys::job_container(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job container {id}")))
    }

    pub async fn save(&self, store: &dyn Store) -> Result<()> {
        store.set_json(&keys::job_container(self.id), self, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transcode_settings::{ImageSettings, TranscodeSettings};

    fn fixture_item() -> BulkItem {
        BulkItem::new(Uuid::new_v4(), "path/to/file1", 1)
    }

    #[test]
    fn initiate_builds_one_pending_step_per_requested_kind_in_order() {
        let item = fixture_item();
        let container = JobContainer::initiate(
            &item,
            vec![
                JobStepKind::Analysis,
                JobStepKind::Thumbnail { frame_seconds: 3.0 },
                JobStepKind::Transcode {
                    settings: TranscodeSettings::ImageSettings(ImageSettings {
                        width: 100,
                        height: 100,
                        format: "jpg".into(),
                    }),
                },
            ],
        );
        assert_eq!(container.steps.len(), 3);
        assert_eq!(container.steps[0].kind_name(), "analysis");
        assert_eq!(container.steps[1].kind_name(), "thumbnail");
        assert_eq!(container.steps[2].kind_name(), "transcode");
        assert!(container.steps.iter().all(|s| s.status() == JobStatus::Pending));
        assert_eq!(container.status, JobStatus::Pending);
        assert_eq!(container.source_bulk_id, Some(item.id));
    }

    #[test]
    fn aggregate_status_is_running_once_a_step_progresses() {
        let item = fixture_item();
        let mut container =
            JobContainer::initiate(&item, vec![JobStepKind::Analysis, JobStepKind::Thumbnail { frame_seconds: 1.0 }]);
        let first_id = container.steps[0].id();
        let running = container.steps[0].with_new_status(JobStatus::Started, None);
        assert!(container.update_step_by_id(running));
        assert_eq!(container.status, JobStatus::Running);
        assert_eq!(container.find_step_by_id(first_id).unwrap().status(), JobStatus::Started);
        assert_eq!(container.completed_steps, 0);
    }

    #[test]
    fn aggregate_status_is_failed_if_any_step_fails_even_if_others_completed() {
        let item = fixture_item();
        let mut container =
            JobContainer::initiate(&item, vec![JobStepKind::Analysis, JobStepKind::Thumbnail { frame_seconds: 1.0 }]);
        let completed = container.steps[0].with_new_status(JobStatus::Completed, None);
        let failed = container.steps[1].with_new_status(JobStatus::Failed, Some("codec failed".into()));
        container.update_step_by_id(completed);
        container.update_step_by_id(failed);
        assert_eq!(container.status, JobStatus::Failed);
        assert_eq!(container.completed_steps, 2);
        assert!(container.end_time.is_some());
    }

    #[test]
    fn aggregate_status_is_completed_only_once_every_step_is_completed() {
        let item = fixture_item();
        let mut container = JobContainer::initiate(&item, vec![JobStepKind::Analysis]);
        let completed = container.steps[0].with_new_status(JobStatus::Completed, None);
        assert!(container.update_step_by_id(completed));
        assert_eq!(container.status, JobStatus::Completed);
        assert_eq!(container.completed_steps, 1);
    }

    #[test]
    fn update_step_by_id_returns_false_for_unknown_step() {
        let item = fixture_item();
        let mut container = JobContainer::initiate(&item, vec![JobStepKind::Analysis]);
        let stray = JobStep::new(Uuid::new_v4(), JobStepKind::Thumbnail { frame_seconds: 1.0 });
        assert!(!container.update_step_by_id(stray));
    }

    #[test]
    fn next_pending_step_is_the_only_non_terminal_step() {
        let item = fixture_item();
        let mut container =
            JobContainer::initiate(&item, vec![JobStepKind::Analysis, JobStepKind::Thumbnail { frame_seconds: 1.0 }]);
        let completed = container.steps[0].with_new_status(JobStatus::Completed, None);
        container.update_step_by_id(completed);
        let next = container.next_pending_step().unwrap();
        assert_eq!(next.kind_name(), "thumbnail");
        assert!(container.has_remaining_steps());
    }
}
