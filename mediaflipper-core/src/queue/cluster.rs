//! The container orchestrator is an external collaborator (spec §1 Out of
//! scope), specified only by the contract the Dispatcher needs: hand it a
//! rendered manifest, get back success or a submission error.
use async_trait::async_trait;

/// What the Dispatcher needs from a cluster scheduler. One real adapter
/// would submit a Kubernetes `Job`; this crate ships only the boundary and
/// two test/ops doubles, since the scheduler itself is explicitly out of
/// scope (spec §1).
#[async_trait]
pub trait ClusterLauncher: Send + Sync {
    async fn launch(&self, manifest: &str) -> Result<(), String>;
}

/// Records every manifest it's handed and always succeeds. A stand-in for
/// environments with no real cluster API configured, and a readable audit
/// trail for operators inspecting what the Dispatcher would have submitted.
#[derive(Default)]
pub struct LoggingClusterLauncher;

#[async_trait]
impl ClusterLauncher for LoggingClusterLauncher {
    async fn launch(&self, manifest: &str) -> Result<(), String> {
        tracing::info!(manifest_len = manifest.len(), "submitting worker manifest to cluster");
        Ok(())
    }
}

/// Test double that always fails submission, used to exercise the
/// submission-failure path (spec §4.4 step 4, §8 scenario 6).
#[derive(Default)]
pub struct FailingClusterLauncher {
    pub reason: String,
}

#[async_trait]
impl ClusterLauncher for FailingClusterLauncher {
    async fn launch(&self, _manifest: &str) -> Result<(), String> {
        Err(self.reason.clone())
    }
}
