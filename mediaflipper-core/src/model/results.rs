use serde::{Deserialize, Serialize};

/// Body of a worker's callback for an analysis step (spec §6). The payload
/// shape is worker-defined (mediainfo/ffprobe output, format-dependent), so
/// it is carried opaquely rather than modeled field-by-field; `error_message`
/// still gets its own field since the intake protocol needs it to decide
/// Completed vs Failed regardless of what the rest of the payload contains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResultPayload {
    #[serde(rename = "timeTaken")]
    pub time_taken: f64,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub metadata: serde_json::Value,
}

/// Body of a worker's callback for a thumbnail step (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailResultPayload {
    #[serde(rename = "outPath")]
    pub out_path: Option<String>,
    #[serde(rename = "timeTaken")]
    pub time_taken: f64,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

/// Body of a worker's callback for a transcode step (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeResultPayload {
    #[serde(rename = "outFile")]
    pub out_file: Option<String>,
    #[serde(rename = "timeTaken")]
    pub time_taken: f64,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

/// The three result shapes accepted at the result-intake endpoint,
/// discriminated by the `kind` path segment (spec §4.5), not by a tag in
/// the body — the container/step identity arrives via the `forJob`/`stepId`
/// query parameters instead (spec §6).
#[derive(Debug, Clone)]
pub enum ResultPayload {
    Analysis(AnalysisResultPayload),
    Thumbnail(ThumbnailResultPayload),
    Transcode(TranscodeResultPayload),
}

impl ResultPayload {
    /// The output file path this result produced, if any (spec §4.5 step 2:
    /// "if the result carries an output file path, create a FileEntry").
    pub fn output_path(&self) -> Option<&str> {
        match self {
            ResultPayload::Analysis(_) => None,
            ResultPayload::Thumbnail(p) => p.out_path.as_deref(),
            ResultPayload::Transcode(p) => p.out_file.as_deref(),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ResultPayload::Analysis(p) => p.error_message.as_deref(),
            ResultPayload::Thumbnail(p) => p.error_message.as_deref(),
            ResultPayload::Transcode(p) => p.error_message.as_deref(),
        }
    }

    pub fn time_taken(&self) -> f64 {
        match self {
            ResultPayload::Analysis(p) => p.time_taken,
            ResultPayload::Thumbnail(p) => p.time_taken,
            ResultPayload::Transcode(p) => p.time_taken,
        }
    }

    /// The `stepType` discriminator this payload kind targets, used to
    /// verify a callback's `kind` path segment matches the step it names
    /// (spec §4.5 step 5).
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResultPayload::Analysis(_) => "analysis",
            ResultPayload::Thumbnail(_) => "thumbnail",
            ResultPayload::Transcode(_) => "transcode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcode_payload_parses_error_message_and_out_file() {
        let raw = r#"{"outFile":"/tmp/out.mp4","timeTaken":12.5,"errorMessage":"codec failed"}"#;
        let payload: TranscodeResultPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.out_file.as_deref(), Some("/tmp/out.mp4"));
        assert_eq!(payload.error_message.as_deref(), Some("codec failed"));
    }

    #[test]
    fn thumbnail_payload_allows_absent_error_message_and_path() {
        let raw = r#"{"timeTaken":1.0}"#;
        let payload: ThumbnailResultPayload = serde_json::from_str(raw).unwrap();
        assert!(payload.out_path.is_none());
        assert!(payload.error_message.is_none());
    }
}
