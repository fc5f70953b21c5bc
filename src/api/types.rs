use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize};

use super::body;
use crate::components::force_graph::GraphData;

pub const STATE_QUEUED: &str = "queued";
pub const STATE_COMPRESSING: &str = "compressing";
pub const STATE_EXTRACTING: &str = "extracting";
pub const STATE_POPULATING: &str = "populating";
pub const STATE_DONE: &str = "done";
pub const STATE_ERROR: &str = "error";

/// One `GET /status` snapshot.
///
/// `state` stays an open string: only `done` and `error` mean anything to the
/// client, unknown values are just "still running".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
	#[serde(default, deserialize_with = "null_as_default")]
	pub state: String,
	#[serde(default, deserialize_with = "null_as_default")]
	pub compressed_documents: Vec<String>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub extracted_documents: IndexMap<String, Vec<String>>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub populated_concepts: IndexSet<String>,
	#[serde(default)]
	pub graph: Option<GraphData>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl PipelineStatus {
	pub fn new(state: impl Into<String>) -> Self {
		Self {
			state: state.into(),
			..Self::default()
		}
	}

	/// Parse a status body; `None` when it is not a JSON object.
	pub fn from_body(raw: &str) -> Option<Self> {
		let value = body::parse_json(raw)?;
		if !value.is_object() {
			return None;
		}
		serde_json::from_value(value).ok()
	}

	pub fn is_done(&self) -> bool {
		self.state == STATE_DONE
	}

	pub fn is_error(&self) -> bool {
		self.state == STATE_ERROR
	}

	pub fn is_terminal(&self) -> bool {
		self.is_done() || self.is_error()
	}
}

/// `POST /upload` acknowledgement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
	#[serde(default)]
	pub status: Option<String>,
	#[serde(default)]
	pub detail: Option<String>,
}

impl UploadReceipt {
	pub fn from_body(raw: &str) -> Self {
		body::parse_json(raw)
			.and_then(|value| serde_json::from_value(value).ok())
			.unwrap_or_default()
	}
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
