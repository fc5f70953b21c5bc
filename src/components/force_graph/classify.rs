//! Structural node classification.
//!
//! Document nodes are the ones the layout ties to the synthetic hub. The
//! default rule looks at a handful of string attributes; callers that know
//! their payload better can inject their own predicate.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::types::GraphNode;

/// Attributes inspected by the default rule, in order.
const CLASS_FIELDS: &[&str] = &["type", "kind", "category"];

/// Case-insensitive substrings that mark a node as a document.
const DOCUMENT_KEYWORDS: &[&str] = &["document", "doc", "file", "pdf", "paper"];

/// Injectable `is_structural_node` predicate.
#[derive(Clone)]
pub struct NodeClassifier(Rc<dyn Fn(&GraphNode) -> bool>);

impl NodeClassifier {
	pub fn new(predicate: impl Fn(&GraphNode) -> bool + 'static) -> Self {
		Self(Rc::new(predicate))
	}

	pub fn is_structural(&self, node: &GraphNode) -> bool {
		(self.0)(node)
	}
}

impl Default for NodeClassifier {
	fn default() -> Self {
		Self::new(is_document_node)
	}
}

impl fmt::Debug for NodeClassifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("NodeClassifier(..)")
	}
}

/// Default classification.
///
/// An explicit boolean `document` attribute always wins. Otherwise the node is
/// a document when `group`, `type`, `kind` or `category` contains one of the
/// document keywords, ignoring case.
pub fn is_document_node(node: &GraphNode) -> bool {
	if let Some(flag) = node.attrs.get("document").and_then(Value::as_bool) {
		return flag;
	}

	let group = node.group.as_deref();
	let others = CLASS_FIELDS.iter().map(|field| node.attr_str(field));
	std::iter::once(group)
		.chain(others)
		.flatten()
		.any(matches_document_keyword)
}

fn matches_document_keyword(value: &str) -> bool {
	let value = value.to_lowercase();
	DOCUMENT_KEYWORDS.iter().any(|kw| value.contains(kw))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn group_and_kind_fields_are_matched_case_insensitively() {
		assert!(is_document_node(&GraphNode::new("a").with_group("Document")));
		assert!(is_document_node(&GraphNode::new("b").with_attr("kind", "PDF upload")));
		assert!(is_document_node(&GraphNode::new("c").with_attr("category", "source-file")));
		assert!(!is_document_node(&GraphNode::new("d").with_group("concept")));
		assert!(!is_document_node(&GraphNode::new("e")));
	}

	#[test]
	fn explicit_flag_overrides_keywords() {
		let node = GraphNode::new("a").with_group("document").with_attr("document", false);
		assert!(!is_document_node(&node));

		let node = GraphNode::new("b").with_group("concept").with_attr("document", true);
		assert!(is_document_node(&node));
	}

	#[test]
	fn non_string_attributes_are_ignored() {
		let node = GraphNode::new("a").with_attr("kind", 3);
		assert!(!is_document_node(&node));
	}

	#[test]
	fn custom_predicate_is_used() {
		let classifier = NodeClassifier::new(|node| node.id.to_string().starts_with("doc-"));
		assert!(classifier.is_structural(&GraphNode::new("doc-1").with_group("concept")));
		assert!(!classifier.is_structural(&GraphNode::new("x").with_group("document")));
	}
}
