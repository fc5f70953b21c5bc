//! Async state that feeds the view: the pipeline run and concept summaries.

mod controller;
mod epoch;
mod summary;
#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
	DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, RunPhase, StatusSyncController, SyncConfig,
	SyncView,
};
pub use epoch::{Epoch, Generation};
pub use summary::{ConceptSummaryFetcher, SummaryEntry, SummaryView};
