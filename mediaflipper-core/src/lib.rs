//! MediaFlipper Job Orchestration Core (spec §1): the durable job/step
//! model and state machine, the bounded-concurrency queue and dispatcher,
//! the result-intake path, and the bulk-list indexing that feeds it.
pub mod bulklist;
pub mod config;
pub mod error;
pub mod handlers;
pub mod intake;
pub mod model;
pub mod queue;
pub mod routes;
pub mod store;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, Result};
use queue::Dispatcher;
use store::Store;

/// Shared application state handed to every handler via `web::Data`
/// (spec §6, following the reference stack's `AppState` pattern in
/// `auth-service`). `store` backs the model/bulklist/intake layers
/// directly; `dispatcher` is also driven independently by the tick loop
/// spawned in `main`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub dispatcher: Arc<Dispatcher>,
}
