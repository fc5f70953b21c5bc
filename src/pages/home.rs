use std::rc::Rc;

use leptos::prelude::*;
use log::info;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, HtmlInputElement};

use crate::api::{BrowserTimer, DocumentFile, PipelineStatus, dedupe_files, read_file_list};
use crate::components::force_graph::{
	ForceGraphCanvas, GraphNode, NodeClickHandler, is_document_node, is_hub_node,
};
use crate::config::AppConfig;
use crate::sync::{ConceptSummaryFetcher, StatusSyncController, SummaryEntry, SummaryView};

/// Only concept nodes have summaries; the hub and documents do not.
fn is_concept_node(node: &GraphNode) -> bool {
	!is_hub_node(node) && !is_document_node(node)
}

/// Explorer page: upload, pipeline progress, graph and concept summaries.
#[component]
pub fn Home() -> impl IntoView {
	let config = AppConfig::from_env();
	info!("pipeline data: {:?} ({})", config.data_source, config.api_base);
	let controller = StatusSyncController::new(&config, Rc::new(BrowserTimer));
	let summaries = ConceptSummaryFetcher::new(controller.api());

	let sync = RwSignal::new(controller.view());
	let summary = RwSignal::new(summaries.selected());
	let files = RwSignal::new(Vec::<DocumentFile>::new());
	controller.subscribe(move |view| sync.set(view.clone()));
	summaries.subscribe(move |view| summary.set(view.clone()));

	// Only a changed graph reaches the canvas; status ticks alone do not
	// rebuild the layout.
	let graph = Memo::new(move |_| {
		sync.with(|v| {
			v.status
				.as_ref()
				.and_then(|s| s.graph.clone())
				.unwrap_or_default()
		})
	});
	let status = Memo::new(move |_| sync.with(|v| v.status.clone().unwrap_or_default()));

	let on_files = move |ev: Event| {
		let Some(list) = ev
			.target()
			.and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
			.and_then(|input| input.files())
		else {
			return;
		};
		spawn_local(async move {
			let picked = read_file_list(list).await;
			files.update(|current| {
				let merged = dedupe_files(current.drain(..).chain(picked));
				*current = merged;
			});
		});
	};

	let (run_controller, run_summaries) = (controller.clone(), summaries.clone());
	let on_run = move |_| {
		run_summaries.clear();
		spawn_local(run_controller.start_run(files.get_untracked()));
	};

	let click_summaries = summaries.clone();
	let on_node_click: NodeClickHandler = Rc::new(move |node: GraphNode| {
		if is_concept_node(&node) {
			spawn_local(click_summaries.fetch_summary(node.display_label()));
		}
	});

	let close_summaries = summaries.clone();
	let owned = StoredValue::new_local((controller.clone(), summaries));
	on_cleanup(move || {
		owned.try_with_value(|(controller, summaries)| {
			controller.cancel();
			summaries.clear();
		});
	});

	spawn_local(controller.start_run(Vec::new()));

	view! {
		<div class="explorer">
			<header class="explorer-header">
				<h1>"Concept Graph"</h1>
				<span class=move || {
					format!("phase phase-{}", sync.with(|v| v.phase.label()).replace(' ', "-"))
				}>{move || sync.with(|v| v.phase.label())}</span>
				<span class="poll-count">{move || sync.with(|v| v.poll_attempts)} " polls"</span>
			</header>

			<section class="controls">
				<input type="file" multiple=true on:change=on_files />
				<button on:click=on_run>"Run pipeline"</button>
				<button on:click=move |_| files.set(Vec::new())>"Clear files"</button>
				<ul class="picked-files">
					{move || {
						files
							.with(|fs| {
								fs.iter()
									.map(|f| {
										let label = format!("{} ({} bytes)", f.name, f.size());
										view! { <li>{label}</li> }
									})
									.collect_view()
							})
					}}
				</ul>
			</section>

			{move || {
				sync.with(|v| v.run_error.clone())
					.map(|e| view! { <p class="error run-error">{e}</p> })
			}}
			{move || sync.with(|v| v.error.clone()).map(|e| view! { <p class="error">{e}</p> })}

			<div class="explorer-body">
				<section class="graph-host">
					<ForceGraphCanvas data=graph on_node_click=on_node_click />
				</section>
				<aside class="sidebar">
					<SummaryPanel summary=summary />
					<button
						on:click=move |_| close_summaries.clear()
						disabled=move || summary.with(|s| s.concept.is_none())
					>
						"Close summary"
					</button>
					<StatusLists status=status />
				</aside>
			</div>
		</div>
	}
}

#[component]
fn SummaryPanel(#[prop(into)] summary: Signal<SummaryView>) -> impl IntoView {
	view! {
		<section class="concept-summary">
			{move || {
				summary
					.with(|s| {
						let Some(concept) = s.concept.clone() else {
							return view! {
								<p class="hint">"Click a concept to read its summary."</p>
							}
								.into_any();
						};
						let body = match (&s.entry, s.loading) {
							(_, true) | (None, false) => {
								view! { <p class="hint">"Loading…"</p> }.into_any()
							}
							(Some(SummaryEntry::Loaded(text)), false) if text.trim().is_empty() => {
								view! { <p class="hint">"No summary available."</p> }.into_any()
							}
							(Some(SummaryEntry::Loaded(text)), false) => {
								view! { <p>{text.clone()}</p> }.into_any()
							}
							(Some(SummaryEntry::Failed(e)), false) => {
								view! { <p class="error">{e.clone()}</p> }.into_any()
							}
						};
						view! {
							<h2>{concept}</h2>
							{body}
						}
							.into_any()
					})
			}}
		</section>
	}
}

#[component]
fn StatusLists(#[prop(into)] status: Signal<PipelineStatus>) -> impl IntoView {
	view! {
		<section class="status-lists">
			<h2>"Compressed documents"</h2>
			<ul>
				{move || {
					status
						.with(|s| {
							s.compressed_documents
								.iter()
								.map(|d| view! { <li>{d.clone()}</li> })
								.collect_view()
						})
				}}
			</ul>

			<h2>"Extracted keywords"</h2>
			<dl>
				{move || {
					status
						.with(|s| {
							s.extracted_documents
								.iter()
								.map(|(doc, keywords)| {
									view! {
										<dt>{doc.clone()}</dt>
										<dd>{keywords.join(", ")}</dd>
									}
								})
								.collect_view()
						})
				}}
			</dl>

			<h2>"Populated concepts"</h2>
			<ul>
				{move || {
					status
						.with(|s| {
							s.populated_concepts
								.iter()
								.map(|c| view! { <li>{c.clone()}</li> })
								.collect_view()
						})
				}}
			</ul>
		</section>
	}
}
