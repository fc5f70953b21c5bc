//! Everything that talks to the pipeline server, plus the offline fixture.

pub mod body;
mod files;
mod fixture;
mod http;
mod types;

use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;

pub use files::{DocumentFile, dedupe_files, read_file_list};
pub use fixture::{FixtureApi, concept_graph};
pub use http::HttpApi;
pub use types::{
	PipelineStatus, STATE_COMPRESSING, STATE_DONE, STATE_ERROR, STATE_EXTRACTING, STATE_POPULATING,
	STATE_QUEUED, UploadReceipt,
};

use crate::config::{AppConfig, DataSource};
use crate::error::ApiError;

/// The four calls the client makes. Futures are `!Send`: everything runs on
/// the browser's single thread.
pub trait PipelineApi {
	/// `POST /status/reset`
	fn reset(&self) -> LocalBoxFuture<'_, Result<(), ApiError>>;

	/// `POST /upload`, all files under the repeated `documents` field.
	fn upload(
		&self,
		files: Vec<DocumentFile>,
	) -> LocalBoxFuture<'_, Result<UploadReceipt, ApiError>>;

	/// `GET /status`
	fn fetch_status(&self) -> LocalBoxFuture<'_, Result<PipelineStatus, ApiError>>;

	/// `GET /concepts/{name}`
	fn fetch_summary<'a>(
		&'a self,
		concept: &'a str,
	) -> LocalBoxFuture<'a, Result<String, ApiError>>;
}

/// Delay source for the poll loop.
pub trait Timer {
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// `setTimeout`-backed timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserTimer;

impl Timer for BrowserTimer {
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
		Box::pin(gloo_timers::future::sleep(duration))
	}
}

/// Pick the transport the configuration asks for.
pub fn connect(config: &AppConfig) -> Rc<dyn PipelineApi> {
	match config.data_source {
		DataSource::Live => Rc::new(HttpApi::new(&config.api_base)),
		DataSource::Fixture => Rc::new(FixtureApi::default()),
	}
}
