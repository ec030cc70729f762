use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::JobStatus;
use super::transcode_settings::TranscodeSettings;

/// Fields every step variant carries, regardless of what kind of work it
/// describes (spec §3). `template_file` names the cluster-manifest template
/// the Dispatcher renders when it admits this step (spec §4.4);
/// `runner_description` is a human-readable label surfaced on dashboards,
/// not interpreted by the core itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCommon {
    #[serde(rename = "stepId")]
    pub step_id: Uuid,
    #[serde(rename = "containerId")]
    pub container_id: Uuid,
    pub status: JobStatus,
    #[serde(rename = "runnerDescription")]
    pub runner_description: String,
    #[serde(rename = "templateFile")]
    pub template_file: String,
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
    #[serde(rename = "startTime")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(rename = "endTime")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "timeTaken")]
    pub time_taken: Option<f64>,
    #[serde(rename = "outputId")]
    pub output_id: Option<Uuid>,
}

impl StepCommon {
    fn new(container_id: Uuid, runner_description: impl Into<String>, template_file: impl Into<String>) -> Self {
        Self {
            step_id: Uuid::new_v4(),
            container_id,
            status: JobStatus::Pending,
            runner_description: runner_description.into(),
            template_file: template_file.into(),
            last_error: None,
            start_time: None,
            end_time: None,
            time_taken: None,
            output_id: None,
        }
    }
}

/// One step of a `JobContainer`'s pipeline. Tagged with `stepType` on the
/// wire so the result-intake handler can route a callback to the right
/// variant without the caller needing to know the container's shape
/// (spec §3, §4.3, §4.5). Deserialization rejects records missing the
/// discriminator, since `serde`'s internally-tagged representation fails
/// to match any variant without it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "lowercase")]
pub enum JobStep {
    Analysis {
        #[serde(flatten)]
        common: StepCommon,
    },
    Thumbnail {
        #[serde(flatten)]
        common: StepCommon,
        #[serde(rename = "thumbnailFrameSeconds")]
        thumbnail_frame_seconds: f64,
    },
    Transcode {
        #[serde(flatten)]
        common: StepCommon,
        #[serde(rename = "transcodeSettings")]
        transcode_settings: TranscodeSettings,
    },
}

/// The kind of step requested at initiation time, before a `JobContainer`
/// exists to own it (spec §4.3 `JobContainer::initiate`).
#[derive(Debug, Clone)]
pub enum JobStepKind {
    Analysis,
    Thumbnail { frame_seconds: f64 },
    Transcode { settings: TranscodeSettings },
}

impl JobStep {
    pub fn new(container_id: Uuid, kind: JobStepKind) -> Self {
        match kind {
            JobStepKind::Analysis => JobStep::Analysis {
                common: StepCommon::new(container_id, "media analysis", "analysis-job.yaml"),
            },
            JobStepKind::Thumbnail { frame_seconds } => JobStep::Thumbnail {
                common: StepCommon::new(container_id, "thumbnail extraction", "thumbnail-job.yaml"),
                thumbnail_frame_seconds: frame_seconds,
            },
            JobStepKind::Transcode { settings } => JobStep::Transcode {
                common: StepCommon::new(container_id, "media transcode", "transcode-job.yaml"),
                transcode_settings: settings,
            },
        }
    }

    pub fn id(&self) -> Uuid {
        self.common().step_id
    }

    pub fn status(&self) -> JobStatus {
        self.common().status
    }

    /// The `stepType` discriminator this variant serializes under, used by
    /// the result-intake handler to verify a callback's `kind` path segment
    /// matches the step it targets (spec §4.5 step 5).
    pub fn kind_name(&self) -> &'static str {
        match self {
            JobStep::Analysis { .. } => "analysis",
            JobStep::Thumbnail { .. } => "thumbnail",
            JobStep::Transcode { .. } => "transcode",
        }
    }

    pub fn common(&self) -> &StepCommon {
        match self {
            JobStep::Analysis { common } => common,
            JobStep::Thumbnail { common, .. } => common,
            JobStep::Transcode { common, .. } => common,
        }
    }

    fn common_mut(&mut self) -> &mut StepCommon {
        match self {
            JobStep::Analysis { common } => common,
            JobStep::Thumbnail { common, .. } => common,
            JobStep::Transcode { common, .. } => common,
        }
    }

    /// Returns a copy of this step with `status` updated, leaving the
    /// original untouched (spec §4.3 `WithNewStatus`). Stamps `start_time`
    /// on entering `Started`, `end_time` on entering a terminal status, and
    /// records `err_msg` into `last_error` when given.
    pub fn with_new_status(&self, status: JobStatus, err_msg: Option<String>) -> Self {
        let mut next = self.clone();
        {
            let common = next.common_mut();
            common.status = status;
            if status == JobStatus::Started {
                common.start_time = Some(Utc::now());
            }
            if status.is_terminal() {
                common.end_time = Some(Utc::now());
            }
            if let Some(msg) = err_msg {
                common.last_error = Some(msg);
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transcode_settings::ImageSettings;

    #[test]
    fn step_type_discriminator_round_trips_transcode_with_nested_settings() {
        let container_id = Uuid::new_v4();
        let step = JobStep::new(
            container_id,
            JobStepKind::Transcode {
                settings: TranscodeSettings::ImageSettings(ImageSettings {
                    width: 320,
                    height: 240,
                    format: "jpg".into(),
                }),
            },
        );
        let encoded = serde_json::to_string(&step).unwrap();
        assert!(encoded.contains("\"stepType\":\"transcode\""));
        let decoded: JobStep = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.id(), step.id());
        assert_eq!(decoded.common().container_id, container_id);
    }

    #[test]
    fn deserialization_rejects_a_record_missing_the_discriminator() {
        let no_tag = serde_json::json!({
            "stepId": Uuid::new_v4(),
            "containerId": Uuid::new_v4(),
            "status": "Pending",
            "runnerDescription": "media analysis",
            "templateFile": "analysis-job.yaml",
        });
        let result: Result<JobStep, _> = serde_json::from_value(no_tag);
        assert!(result.is_err());
    }

    #[test]
    fn with_new_status_stamps_start_time_on_started_without_mutating_original() {
        let step = JobStep::new(Uuid::new_v4(), JobStepKind::Analysis);
        let started = step.with_new_status(JobStatus::Started, None);
        assert!(step.common().start_time.is_none());
        assert!(started.common().start_time.is_some());
        assert_eq!(started.id(), step.id());
    }

    #[test]
    fn with_new_status_stamps_end_time_and_last_error_on_terminal_status() {
        let step = JobStep::new(Uuid::new_v4(), JobStepKind::Analysis);
        let failed = step.with_new_status(JobStatus::Failed, Some("boom".into()));
        assert!(failed.common().end_time.is_some());
        assert_eq!(failed.common().last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn kind_name_matches_wire_discriminator() {
        let step = JobStep::new(Uuid::new_v4(), JobStepKind::Thumbnail { frame_seconds: 5.0 });
        assert_eq!(step.kind_name(), "thumbnail");
    }
}
