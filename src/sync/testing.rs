//! Scripted transport: every call parks until the test resolves it, so tests
//! choose the exact order responses arrive in.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};

use crate::api::{DocumentFile, PipelineApi, PipelineStatus, Timer, UploadReceipt};
use crate::error::ApiError;

type Reply<T> = oneshot::Sender<Result<T, ApiError>>;

enum Call {
	Reset(Reply<()>),
	Upload(Vec<String>, Reply<UploadReceipt>),
	Status(Reply<PipelineStatus>),
	Summary(String, Reply<String>),
}

impl Call {
	fn kind(&self) -> &'static str {
		match self {
			Call::Reset(_) => "reset",
			Call::Upload(..) => "upload",
			Call::Status(_) => "status",
			Call::Summary(..) => "summary",
		}
	}
}

#[derive(Default)]
pub(crate) struct ScriptedApi {
	calls: RefCell<VecDeque<Call>>,
}

impl ScriptedApi {
	pub(crate) fn new() -> Rc<Self> {
		Rc::new(Self::default())
	}

	/// Kinds of the calls still waiting, oldest first.
	pub(crate) fn pending(&self) -> Vec<&'static str> {
		self.calls.borrow().iter().map(Call::kind).collect()
	}

	fn take(&self, newest: bool, kind: &str) -> Call {
		let mut calls = self.calls.borrow_mut();
		let pos = if newest {
			calls.iter().rposition(|c| c.kind() == kind)
		} else {
			calls.iter().position(|c| c.kind() == kind)
		};
		match pos.and_then(|p| calls.remove(p)) {
			Some(call) => call,
			None => {
				let pending: Vec<_> = calls.iter().map(Call::kind).collect();
				panic!("no pending {kind} call, pending: {pending:?}")
			}
		}
	}

	pub(crate) fn resolve_reset(&self, result: Result<(), ApiError>) {
		if let Call::Reset(tx) = self.take(false, "reset") {
			let _ = tx.send(result);
		}
	}

	/// Resolves the oldest upload and returns the file names it carried.
	pub(crate) fn resolve_upload(&self, result: Result<UploadReceipt, ApiError>) -> Vec<String> {
		match self.take(false, "upload") {
			Call::Upload(names, tx) => {
				let _ = tx.send(result);
				names
			}
			_ => unreachable!(),
		}
	}

	pub(crate) fn resolve_status(&self, result: Result<PipelineStatus, ApiError>) {
		if let Call::Status(tx) = self.take(false, "status") {
			let _ = tx.send(result);
		}
	}

	pub(crate) fn resolve_latest_status(&self, result: Result<PipelineStatus, ApiError>) {
		if let Call::Status(tx) = self.take(true, "status") {
			let _ = tx.send(result);
		}
	}

	/// Resolves the oldest summary request for `concept`.
	pub(crate) fn resolve_summary(&self, concept: &str, result: Result<String, ApiError>) {
		let mut calls = self.calls.borrow_mut();
		let pos = calls
			.iter()
			.position(|c| matches!(c, Call::Summary(name, _) if name == concept));
		match pos.and_then(|p| calls.remove(p)) {
			Some(Call::Summary(_, tx)) => {
				let _ = tx.send(result);
			}
			_ => panic!("no pending summary call for {concept}"),
		}
	}

	fn park<T: 'static>(
		&self,
		make: impl FnOnce(Reply<T>) -> Call,
	) -> LocalBoxFuture<'static, Result<T, ApiError>> {
		let (tx, rx) = oneshot::channel();
		self.calls.borrow_mut().push_back(make(tx));
		rx.map(|reply| reply.unwrap_or_else(|_| Err(ApiError::Network("call dropped".into()))))
			.boxed_local()
	}
}

impl PipelineApi for ScriptedApi {
	fn reset(&self) -> LocalBoxFuture<'_, Result<(), ApiError>> {
		self.park(Call::Reset)
	}

	fn upload(
		&self,
		files: Vec<DocumentFile>,
	) -> LocalBoxFuture<'_, Result<UploadReceipt, ApiError>> {
		let names = files.into_iter().map(|f| f.name).collect();
		self.park(|tx| Call::Upload(names, tx))
	}

	fn fetch_status(&self) -> LocalBoxFuture<'_, Result<PipelineStatus, ApiError>> {
		self.park(Call::Status)
	}

	fn fetch_summary<'a>(
		&'a self,
		concept: &'a str,
	) -> LocalBoxFuture<'a, Result<String, ApiError>> {
		let concept = concept.to_string();
		self.park(|tx| Call::Summary(concept, tx))
	}
}

/// Timer whose sleeps complete immediately.
pub(crate) struct InstantTimer;

impl Timer for InstantTimer {
	fn sleep(&self, _duration: Duration) -> LocalBoxFuture<'static, ()> {
		future::ready(()).boxed_local()
	}
}
