use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node identifier as sent by the server: either a string or an integer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
	Int(i64),
	Text(String),
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NodeId::Int(i) => write!(f, "{i}"),
			NodeId::Text(s) => f.write_str(s),
		}
	}
}

impl From<&str> for NodeId {
	fn from(s: &str) -> Self {
		NodeId::Text(s.to_string())
	}
}

impl From<String> for NodeId {
	fn from(s: String) -> Self {
		NodeId::Text(s)
	}
}

impl From<i64> for NodeId {
	fn from(i: i64) -> Self {
		NodeId::Int(i)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
	pub id: NodeId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub group: Option<String>,
	/// Everything else the server attached (`kind`, `document_path`, counts...).
	#[serde(flatten)]
	pub attrs: Map<String, Value>,
}

impl GraphNode {
	pub fn new(id: impl Into<NodeId>) -> Self {
		Self {
			id: id.into(),
			label: None,
			group: None,
			attrs: Map::new(),
		}
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn with_group(mut self, group: impl Into<String>) -> Self {
		self.group = Some(group.into());
		self
	}

	pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
		self.attrs.insert(key.to_string(), value.into());
		self
	}

	/// Label shown on the canvas; falls back to the stringified id.
	pub fn display_label(&self) -> String {
		match &self.label {
			Some(label) if !label.is_empty() => label.clone(),
			_ => self.id.to_string(),
		}
	}

	pub fn attr_str(&self, key: &str) -> Option<&str> {
		self.attrs.get(key).and_then(Value::as_str)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
	pub source: NodeId,
	pub target: NodeId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<f64>,
	#[serde(flatten)]
	pub attrs: Map<String, Value>,
}

impl GraphLink {
	pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			value: None,
			attrs: Map::new(),
		}
	}

	pub fn with_value(mut self, value: f64) -> Self {
		self.value = Some(value);
		self
	}

	pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
		self.attrs.insert(key.to_string(), value.into());
		self
	}

	/// Stroke width in pixels, `√value` with a default weight of 1.
	pub fn stroke_width(&self) -> f64 {
		self.value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(1.0).sqrt()
	}
}

/// One immutable graph snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	#[serde(default)]
	pub nodes: Vec<GraphNode>,
	#[serde(default)]
	pub links: Vec<GraphLink>,
}

impl GraphData {
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}
