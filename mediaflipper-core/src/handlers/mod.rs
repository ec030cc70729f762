/// HTTP handlers for the job orchestration core's external surface
/// (spec §6).
///
/// This module contains handlers for:
/// - Bulk: create and browse bulk lists and their items
/// - Flip: initiate JobContainers for a bulk list
/// - Result: worker result callbacks
/// - Jobrunner: queue status
/// - Health: liveness/readiness
pub mod bulk;
pub mod flip;
pub mod health;
pub mod jobrunner;
pub mod result;

pub use bulk::{bulk_content, list_bulk, upload_bulk};
pub use flip::initiate_flip;
pub use health::{healthz, readyz};
pub use jobrunner::status;
pub use result::accept_result;
