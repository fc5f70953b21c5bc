//! Concept summary lookups for node clicks.
//!
//! Clicks can arrive faster than the server answers. Each request takes a new
//! generation and only the newest one may write its result, so the panel
//! always ends on the concept clicked last.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::{debug, warn};

use super::epoch::Epoch;
use crate::api::PipelineApi;

/// Outcome of the last completed lookup for one concept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SummaryEntry {
	Loaded(String),
	Failed(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SummaryView {
	pub concept: Option<String>,
	pub loading: bool,
	pub entry: Option<SummaryEntry>,
}

type Listener = Rc<dyn Fn(&SummaryView)>;

struct Inner {
	api: Rc<dyn PipelineApi>,
	epoch: Epoch,
	entries: RefCell<HashMap<String, SummaryEntry>>,
	selected: RefCell<Option<String>>,
	loading: Cell<bool>,
	listeners: RefCell<Vec<Listener>>,
}

impl Inner {
	fn snapshot(&self) -> SummaryView {
		let concept = self.selected.borrow().clone();
		let entry = concept
			.as_ref()
			.and_then(|c| self.entries.borrow().get(c).cloned());
		SummaryView {
			concept,
			loading: self.loading.get(),
			entry,
		}
	}

	fn notify(&self) {
		let view = self.snapshot();
		let listeners: Vec<Listener> = self.listeners.borrow().clone();
		for listener in &listeners {
			listener(&view);
		}
	}
}

#[derive(Clone)]
pub struct ConceptSummaryFetcher {
	inner: Rc<Inner>,
}

impl ConceptSummaryFetcher {
	pub fn new(api: Rc<dyn PipelineApi>) -> Self {
		Self {
			inner: Rc::new(Inner {
				api,
				epoch: Epoch::new(),
				entries: RefCell::new(HashMap::new()),
				selected: RefCell::new(None),
				loading: Cell::new(false),
				listeners: RefCell::new(Vec::new()),
			}),
		}
	}

	/// Select `concept` and look it up. Any earlier request still in flight
	/// loses the right to write its result.
	pub fn fetch_summary(&self, concept: impl Into<String>) -> LocalBoxFuture<'static, ()> {
		let concept = concept.into();
		let generation = self.inner.epoch.advance();
		*self.inner.selected.borrow_mut() = Some(concept.clone());
		self.inner.loading.set(true);
		self.inner.notify();

		let inner = self.inner.clone();
		async move {
			let result = inner.api.fetch_summary(&concept).await;
			if !inner.epoch.is_current(generation) {
				debug!("summary #{} for {concept:?} superseded", generation.value());
				return;
			}
			let entry = match result {
				Ok(text) => SummaryEntry::Loaded(text),
				Err(e) => {
					warn!("summary for {concept:?} failed: {e}");
					SummaryEntry::Failed(e.to_string())
				}
			};
			inner.entries.borrow_mut().insert(concept, entry);
			inner.loading.set(false);
			inner.notify();
		}
		.boxed_local()
	}

	pub fn selected(&self) -> SummaryView {
		self.inner.snapshot()
	}

	/// Last completed result for `concept`, visible or not.
	pub fn entry(&self, concept: &str) -> Option<SummaryEntry> {
		self.inner.entries.borrow().get(concept).cloned()
	}

	/// Deselect and drop any request in flight.
	pub fn clear(&self) {
		self.inner.epoch.advance();
		*self.inner.selected.borrow_mut() = None;
		self.inner.loading.set(false);
		self.inner.notify();
	}

	pub fn subscribe(&self, listener: impl Fn(&SummaryView) + 'static) {
		self.inner.listeners.borrow_mut().push(Rc::new(listener));
	}
}
