//! Reset → upload → poll lifecycle against the pipeline server.
//!
//! One call to [`StatusSyncController::start_run`] is one generation. Every
//! resumption point (after reset, after upload, after each fetch and each
//! sleep) compares the run's generation with the shared [`Epoch`]; once a newer
//! run or a [`cancel`](StatusSyncController::cancel) has advanced it, the old
//! run returns without touching the view.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::{debug, info, warn};

use super::epoch::{Epoch, Generation};
use crate::api::{self, DocumentFile, PipelineApi, PipelineStatus, Timer};
use crate::config::AppConfig;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 900;

const PIPELINE_FAILED: &str = "The pipeline reported an error";
const TIMED_OUT: &str = "Timed out waiting for the pipeline to finish";

/// Client-side position in the run lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunPhase {
	#[default]
	Idle,
	Resetting,
	/// Reset failed; polling still runs so the view never hangs.
	ResetFailed,
	Uploading,
	Polling,
	Done,
	Failed,
	TimedOut,
}

impl RunPhase {
	pub fn is_terminal(self) -> bool {
		matches!(self, RunPhase::Done | RunPhase::Failed | RunPhase::TimedOut)
	}

	pub fn is_busy(self) -> bool {
		!self.is_terminal() && self != RunPhase::Idle
	}

	pub fn label(self) -> &'static str {
		match self {
			RunPhase::Idle => "idle",
			RunPhase::Resetting => "resetting",
			RunPhase::ResetFailed => "reset failed",
			RunPhase::Uploading => "uploading",
			RunPhase::Polling => "polling",
			RunPhase::Done => "done",
			RunPhase::Failed => "failed",
			RunPhase::TimedOut => "timed out",
		}
	}
}

/// What the view renders. `status` is the last good snapshot and survives
/// transient errors; `error` is shown next to it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncView {
	pub phase: RunPhase,
	pub status: Option<PipelineStatus>,
	/// Last poll failure or terminal failure. A successful poll clears it.
	pub error: Option<String>,
	/// Reset or upload failure of the current run. Only a new run clears it.
	pub run_error: Option<String>,
	pub poll_attempts: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
	pub poll_interval: Duration,
	/// `None` polls until the server reaches a terminal state.
	pub max_poll_attempts: Option<u32>,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			poll_interval: DEFAULT_POLL_INTERVAL,
			max_poll_attempts: Some(DEFAULT_MAX_POLL_ATTEMPTS),
		}
	}
}

type Listener = Rc<dyn Fn(&SyncView)>;

struct Shared {
	api: Rc<dyn PipelineApi>,
	timer: Rc<dyn Timer>,
	config: SyncConfig,
	epoch: Epoch,
	view: RefCell<SyncView>,
	listeners: RefCell<Vec<Listener>>,
}

impl Shared {
	fn update(&self, change: impl FnOnce(&mut SyncView)) {
		let snapshot = {
			let mut view = self.view.borrow_mut();
			change(&mut view);
			view.clone()
		};
		// Listeners may subscribe while being notified.
		let listeners: Vec<Listener> = self.listeners.borrow().clone();
		for listener in &listeners {
			listener(&snapshot);
		}
	}

	fn is_stale(&self, generation: Generation, step: &str) -> bool {
		if self.epoch.is_current(generation) {
			return false;
		}
		debug!(
			"run {}: dropping {step} result, run {} is current",
			generation.value(),
			self.epoch.current().value()
		);
		true
	}
}

/// Owns the run lifecycle and the single current [`SyncView`].
#[derive(Clone)]
pub struct StatusSyncController {
	shared: Rc<Shared>,
}

impl StatusSyncController {
	/// Controller over the transport `config.data_source` selects.
	pub fn new(config: &AppConfig, timer: Rc<dyn Timer>) -> Self {
		Self::with_api(api::connect(config), timer, config.sync())
	}

	pub fn with_api(api: Rc<dyn PipelineApi>, timer: Rc<dyn Timer>, config: SyncConfig) -> Self {
		Self {
			shared: Rc::new(Shared {
				api,
				timer,
				config,
				epoch: Epoch::new(),
				view: RefCell::new(SyncView::default()),
				listeners: RefCell::new(Vec::new()),
			}),
		}
	}

	pub fn api(&self) -> Rc<dyn PipelineApi> {
		self.shared.api.clone()
	}

	pub fn view(&self) -> SyncView {
		self.shared.view.borrow().clone()
	}

	/// Called with the new view after every change.
	pub fn subscribe(&self, listener: impl Fn(&SyncView) + 'static) {
		self.shared.listeners.borrow_mut().push(Rc::new(listener));
	}

	/// Begin a new run, superseding any run still in flight. The phase moves to
	/// `Resetting` immediately; the returned future drives the rest and must be
	/// spawned on the local executor.
	pub fn start_run(&self, files: Vec<DocumentFile>) -> LocalBoxFuture<'static, ()> {
		let generation = self.shared.epoch.advance();
		info!("run {}: starting with {} file(s)", generation.value(), files.len());
		self.shared.update(|view| {
			view.phase = RunPhase::Resetting;
			view.error = None;
			view.run_error = None;
			view.poll_attempts = 0;
		});
		run(self.shared.clone(), generation, files).boxed_local()
	}

	/// Abandon the current run. Responses already in flight are ignored.
	pub fn cancel(&self) {
		let cancelled = self.shared.epoch.current();
		self.shared.epoch.advance();
		info!("run {}: cancelled", cancelled.value());
		self.shared.update(|view| {
			if view.phase.is_busy() {
				view.phase = RunPhase::Idle;
			}
		});
	}
}

async fn run(shared: Rc<Shared>, generation: Generation, files: Vec<DocumentFile>) {
	let reset = shared.api.reset().await;
	if shared.is_stale(generation, "reset") {
		return;
	}

	match reset {
		Err(e) => {
			warn!("run {}: reset failed: {e}", generation.value());
			shared.update(|view| {
				view.phase = RunPhase::ResetFailed;
				view.run_error = Some(e.to_string());
			});
		}
		Ok(()) => {
			shared.update(|view| {
				view.status = None;
				view.error = None;
			});
			if !files.is_empty() {
				info!("run {}: uploading {} file(s)", generation.value(), files.len());
				shared.update(|view| view.phase = RunPhase::Uploading);
				let upload = shared.api.upload(files).await;
				if shared.is_stale(generation, "upload") {
					return;
				}
				match upload {
					Ok(receipt) => debug!(
						"run {}: upload accepted ({})",
						generation.value(),
						receipt.status.as_deref().unwrap_or("no status")
					),
					Err(e) => {
						warn!("run {}: upload failed: {e}", generation.value());
						shared.update(|view| view.run_error = Some(e.to_string()));
					}
				}
			}
		}
	}

	poll(&shared, generation).await;
}

async fn poll(shared: &Shared, generation: Generation) {
	info!("run {}: polling every {:?}", generation.value(), shared.config.poll_interval);
	if shared.view.borrow().phase != RunPhase::ResetFailed {
		shared.update(|view| view.phase = RunPhase::Polling);
	}

	let mut attempts = 0;
	loop {
		attempts += 1;
		shared.update(|view| view.poll_attempts = attempts);

		let fetched = shared.api.fetch_status().await;
		if shared.is_stale(generation, "status") {
			return;
		}

		match fetched {
			Ok(status) => {
				let terminal = if status.is_done() {
					Some(RunPhase::Done)
				} else if status.is_error() {
					Some(RunPhase::Failed)
				} else {
					None
				};
				let failure = status
					.is_error()
					.then(|| status.message.clone().unwrap_or_else(|| PIPELINE_FAILED.to_string()));
				shared.update(|view| {
					view.status = Some(status);
					view.error = failure;
					match terminal {
						Some(phase) => view.phase = phase,
						None => view.phase = RunPhase::Polling,
					}
				});
				if let Some(phase) = terminal {
					info!("run {}: finished ({})", generation.value(), phase.label());
					return;
				}
			}
			Err(e) => {
				warn!("run {}: status fetch failed: {e}", generation.value());
				shared.update(|view| view.error = Some(e.to_string()));
			}
		}

		if shared.config.max_poll_attempts.is_some_and(|max| attempts >= max) {
			warn!("run {}: giving up after {attempts} polls", generation.value());
			shared.update(|view| {
				view.phase = RunPhase::TimedOut;
				view.error = Some(TIMED_OUT.to_string());
			});
			return;
		}

		shared.timer.sleep(shared.config.poll_interval).await;
		if shared.is_stale(generation, "sleep") {
			return;
		}
	}
}
