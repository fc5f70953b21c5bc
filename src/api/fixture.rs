//! Offline stand-in for the pipeline server.
//!
//! Each status poll advances one stage, so a run walks through every state the
//! real pipeline reports and finishes with a document/concept graph shaped
//! exactly like the server's.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use indexmap::IndexMap;

use super::{
	DocumentFile, PipelineApi, PipelineStatus, STATE_COMPRESSING, STATE_DONE, STATE_EXTRACTING,
	STATE_POPULATING, STATE_QUEUED, UploadReceipt,
};
use crate::components::force_graph::{GraphData, GraphLink, GraphNode};
use crate::error::ApiError;

const DOCUMENT_PREFIX: &str = "document::";
const CONCEPT_PREFIX: &str = "concept::";

const STAGES: &[&str] = &[
	STATE_QUEUED,
	STATE_COMPRESSING,
	STATE_EXTRACTING,
	STATE_POPULATING,
	STATE_DONE,
];

const DEFAULT_DOCUMENTS: &[&str] = &["papers/force-layout.pdf", "papers/async-polling.pdf"];

const VOCABULARY: &[&str] = &[
	"Graph theory",
	"Force simulation",
	"Spring embedding",
	"Concurrency",
	"Event loop",
	"Cancellation",
	"Knowledge graph",
	"Keyword extraction",
	"Document compression",
	"Summarization",
	"Polling",
	"Layout stability",
];

const KEYWORDS_PER_DOCUMENT: usize = 5;

#[derive(Debug, Default)]
pub struct FixtureApi {
	polls: Cell<usize>,
	documents: RefCell<Vec<String>>,
}

impl FixtureApi {
	fn documents(&self) -> Vec<String> {
		let uploaded = self.documents.borrow();
		if uploaded.is_empty() {
			DEFAULT_DOCUMENTS.iter().map(|d| d.to_string()).collect()
		} else {
			uploaded.clone()
		}
	}

	fn snapshot(&self, stage: usize) -> PipelineStatus {
		let documents = self.documents();
		let mut status = PipelineStatus::new(STAGES[stage]);
		if stage >= 2 {
			status.compressed_documents = documents.clone();
		}
		if stage >= 3 {
			status.extracted_documents = extract(&documents);
		}
		if stage >= 4 {
			status.populated_concepts = status
				.extracted_documents
				.values()
				.flatten()
				.cloned()
				.collect();
			status.graph = Some(concept_graph(&status.extracted_documents));
		}
		status
	}
}

impl PipelineApi for FixtureApi {
	fn reset(&self) -> LocalBoxFuture<'_, Result<(), ApiError>> {
		self.polls.set(0);
		self.documents.borrow_mut().clear();
		future::ready(Ok(())).boxed_local()
	}

	fn upload(
		&self,
		files: Vec<DocumentFile>,
	) -> LocalBoxFuture<'_, Result<UploadReceipt, ApiError>> {
		self.documents
			.borrow_mut()
			.extend(files.into_iter().map(|f| format!("uploads/{}", f.name)));
		future::ready(Ok(UploadReceipt {
			status: Some("accepted".into()),
			detail: None,
		}))
		.boxed_local()
	}

	fn fetch_status(&self) -> LocalBoxFuture<'_, Result<PipelineStatus, ApiError>> {
		let stage = self.polls.get().min(STAGES.len() - 1);
		self.polls.set(self.polls.get() + 1);
		future::ready(Ok(self.snapshot(stage))).boxed_local()
	}

	fn fetch_summary<'a>(
		&'a self,
		concept: &'a str,
	) -> LocalBoxFuture<'a, Result<String, ApiError>> {
		let mentions = extract(&self.documents())
			.values()
			.filter(|keywords| keywords.iter().any(|k| k.eq_ignore_ascii_case(concept)))
			.count();
		future::ready(Ok(format!(
			"{concept} is a fixture concept mentioned by {mentions} document(s)."
		)))
		.boxed_local()
	}
}

/// Deterministic pseudo-random keyword picks per document.
fn extract(documents: &[String]) -> IndexMap<String, Vec<String>> {
	documents
		.iter()
		.enumerate()
		.map(|(d, path)| {
			let mut keywords: Vec<String> = Vec::with_capacity(KEYWORDS_PER_DOCUMENT);
			let mut seed = d * 31 + path.len();
			while keywords.len() < KEYWORDS_PER_DOCUMENT {
				let pick = VOCABULARY[(rand_simple(seed) * VOCABULARY.len() as f64) as usize];
				if !keywords.iter().any(|k| k == pick) {
					keywords.push(pick.to_string());
				}
				seed += 1;
			}
			(path.clone(), keywords)
		})
		.collect()
}

fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Bipartite document/concept graph in the server's wire shape: one node per
/// document, one per case-folded keyword, one weight-1 link per pair.
pub fn concept_graph(extracted: &IndexMap<String, Vec<String>>) -> GraphData {
	let mut nodes: IndexMap<String, GraphNode> = IndexMap::new();
	let mut links = Vec::new();
	let mut document_counts: HashMap<String, u64> = HashMap::new();

	for (path, keywords) in extracted {
		let doc_id = format!("{DOCUMENT_PREFIX}{path}");
		let label = Path::new(path)
			.file_name()
			.and_then(|n| n.to_str())
			.filter(|n| !n.is_empty())
			.unwrap_or(path)
			.to_string();

		nodes.insert(
			doc_id.clone(),
			GraphNode::new(doc_id.clone())
				.with_label(label)
				.with_group("document")
				.with_attr("kind", "document")
				.with_attr("document_path", path.as_str()),
		);

		let mut seen = Vec::new();
		for keyword in keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
			let canonical = keyword.to_lowercase();
			if seen.contains(&canonical) {
				continue;
			}
			let concept_id = format!("{CONCEPT_PREFIX}{canonical}");
			nodes.entry(concept_id.clone()).or_insert_with(|| {
				GraphNode::new(concept_id.clone())
					.with_label(keyword)
					.with_group("concept")
					.with_attr("kind", "concept")
			});
			links.push(
				GraphLink::new(doc_id.clone(), concept_id.clone())
					.with_value(1.0)
					.with_attr("kind", "document-concept"),
			);
			*document_counts.entry(concept_id).or_default() += 1;
			seen.push(canonical);
		}

		if let Some(node) = nodes.get_mut(&doc_id) {
			node.attrs.insert("concept_count".into(), (seen.len() as u64).into());
		}
	}

	let nodes = nodes
		.into_iter()
		.map(|(id, node)| match document_counts.get(&id) {
			Some(&count) => node.with_attr("document_count", count),
			None => node,
		})
		.collect();
	GraphData { nodes, links }
}
