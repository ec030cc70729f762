//! Worker manifest templating (spec §4.4 step 2). Templates are plain YAML
//! on disk with `${VAR}` placeholders; rendering is a flat string
//! substitution, mirroring the original `CreateGenericJob`'s env-var map
//! approach in `thumbnail.go`/`transcode.go` rather than a templating engine,
//! since the substitution set is small and fixed.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{AppError, Result};

/// Source of template file contents, keyed by the `templateFile` name a
/// `JobStep` carries. Split out as a trait so tests can supply templates
/// in-memory without touching the filesystem.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn load(&self, template_file: &str) -> Result<String>;
}

/// Loads templates from a directory on disk, one file per `templateFile`
/// name (spec §4.4's `templateFile` on a `JobStep`).
pub struct FsTemplateSource {
    base_dir: PathBuf,
}

impl FsTemplateSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

#[async_trait]
impl TemplateSource for FsTemplateSource {
    async fn load(&self, template_file: &str) -> Result<String> {
        let path: &Path = Path::new(template_file);
        let full_path = self.base_dir.join(path);
        tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|e| AppError::ClusterError(format!("reading template {}: {e}", full_path.display())))
    }
}

/// In-memory template set keyed by `templateFile` name, used by dispatcher
/// tests so they don't depend on a real templates directory.
#[derive(Default, Clone)]
pub struct InMemoryTemplateSource {
    templates: BTreeMap<String, String>,
}

impl InMemoryTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, template_file: impl Into<String>, contents: impl Into<String>) -> Self {
        self.templates.insert(template_file.into(), contents.into());
        self
    }
}

#[async_trait]
impl TemplateSource for InMemoryTemplateSource {
    async fn load(&self, template_file: &str) -> Result<String> {
        self.templates
            .get(template_file)
            .cloned()
            .ok_or_else(|| AppError::ClusterError(format!("no template registered for {template_file}")))
    }
}

/// Substitutes every `${KEY}` occurrence in `template` with `env[KEY]`,
/// leaving placeholders with no matching key untouched (an absent optional
/// variable, e.g. `THUMBNAIL_FRAME` on a transcode step, simply isn't
/// supplied by the caller).
pub fn render(template: &str, env: &BTreeMap<&str, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in env {
        out = out.replace(&format!("${{{key}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_known_placeholders_and_leaves_unknown_ones() {
        let template = "mode=${WRAPPER_MODE} file=${FILE_NAME} extra=${UNKNOWN}";
        let mut env = BTreeMap::new();
        env.insert("WRAPPER_MODE", "transcode".to_string());
        env.insert("FILE_NAME", "path/to/file1".to_string());
        let rendered = render(template, &env);
        assert_eq!(rendered, "mode=transcode file=path/to/file1 extra=${UNKNOWN}");
    }
}
