//! Queue & Dispatcher (spec §4.4): the bounded-concurrency gate between
//! pending work and the cluster, plus the advisory-lock primitive
//! (`WhenQueueAvailable`) multi-write sequences serialize against.
pub mod cluster;
pub mod dispatcher;
pub mod lock;
pub mod manifest;

pub use cluster::{ClusterLauncher, FailingClusterLauncher, LoggingClusterLauncher};
pub use dispatcher::{enqueue_request, remove_from_running_queue, Dispatcher, TickReport, DEFAULT_MAX_CONCURRENT_JOBS};
pub use lock::when_queue_available;
pub use manifest::{render, FsTemplateSource, InMemoryTemplateSource, TemplateSource};
