use serde::{Deserialize, Serialize};

/// Tagged settings variant a Transcode step carries (spec §3). `AVSettings`
/// serializes to a sequence of CLI flag/value pairs the worker wrapper
/// passes straight to ffmpeg (grounded in the original `wrapper/transcode.go`,
/// which JSON-marshals the settings struct verbatim for the wrapper to
/// re-interpret); `ImageSettings` carries plain geometry/format fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "settingsType", rename_all = "lowercase")]
pub enum TranscodeSettings {
    #[serde(rename = "av")]
    AVSettings(AvSettings),
    #[serde(rename = "image")]
    ImageSettings(ImageSettings),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvSettings {
    /// Ordered flag/value pairs, e.g. `[("-vcodec", "libx264"), ("-crf", "23")]`.
    pub flags: Vec<(String, String)>,
    pub output_extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl TranscodeSettings {
    /// Flattens `AVSettings` into the CLI argument sequence the worker
    /// wrapper invokes ffmpeg with; `ImageSettings` has no CLI-flag
    /// representation in this core (the worker derives its own imagemagick
    /// invocation from the structured fields), so it returns an empty list.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            TranscodeSettings::AVSettings(av) => av
                .flags
                .iter()
                .flat_map(|(flag, value)| vec![flag.clone(), value.clone()])
                .collect(),
            TranscodeSettings::ImageSettings(_) => Vec::new(),
        }
    }

    pub fn likely_output_extension(&self) -> &str {
        match self {
            TranscodeSettings::AVSettings(av) => &av.output_extension,
            TranscodeSettings::ImageSettings(img) => &img.format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn av_settings_round_trip_preserves_variant_and_fields() {
        let settings = TranscodeSettings::AVSettings(AvSettings {
            flags: vec![("-vcodec".into(), "libx264".into()), ("-crf".into(), "23".into())],
            output_extension: "mp4".into(),
        });
        let encoded = serde_json::to_string(&settings).unwrap();
        let decoded: TranscodeSettings = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.likely_output_extension(), "mp4");
        assert_eq!(decoded.to_args(), vec!["-vcodec", "libx264", "-crf", "23"]);
        assert!(matches!(decoded, TranscodeSettings::AVSettings(_)));
    }

    #[test]
    fn image_settings_round_trip_preserves_variant_and_fields() {
        let settings = TranscodeSettings::ImageSettings(ImageSettings {
            width: 1920,
            height: 1080,
            format: "jpg".into(),
        });
        let encoded = serde_json::to_string(&settings).unwrap();
        let decoded: TranscodeSettings = serde_json::from_str(&encoded).unwrap();
        match decoded {
            TranscodeSettings::ImageSettings(img) => {
                assert_eq!(img.width, 1920);
                assert_eq!(img.height, 1080);
                assert_eq!(img.format, "jpg");
            }
            _ => panic!("expected ImageSettings"),
        }
    }
}
