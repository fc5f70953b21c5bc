use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use log::{debug, warn};

use super::classify::NodeClassifier;
use super::palette::ColorScheme;
use super::simulation::{
	DRAG_ALPHA_TARGET, ForceParams, NodeKind, PositionedLink, PositionedNode, Simulation, Viewport,
};
use super::types::{GraphData, GraphLink, GraphNode, NodeId};

pub const HUB_ID: &str = "__concept_graph_hub__";
pub const HUB_LABEL: &str = "Documents";

pub const HUB_RADIUS: f64 = 14.0;
pub const DOCUMENT_RADIUS: f64 = 9.0;
pub const NODE_RADIUS: f64 = 6.0;
pub const HIT_RADIUS: f64 = 10.0;
pub const LINK_HIT_DISTANCE: f64 = 4.0;
/// Pointer travel below which a press is a click rather than a drag.
pub const CLICK_SLOP: f64 = 3.0;

/// Marks the synthetic hub in the node handed to click handlers.
const HUB_ATTR: &str = "hub";

const INITIAL_RING: f64 = 100.0;
const RESIZE_ALPHA: f64 = 0.1;

/// Everything the caller can tune about a layout.
#[derive(Clone, Debug, Default)]
pub struct LayoutOptions {
	pub forces: ForceParams,
	pub colors: ColorScheme,
	pub classifier: NodeClassifier,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub node_idx: Option<usize>,
	pub start_x: f64,
	pub start_y: f64,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<usize>,
	pub neighbors: HashSet<usize>,
}

/// Outcome of a pointer release over the canvas.
#[derive(Clone, Debug, PartialEq)]
pub enum Release {
	NodeClick(usize),
	DragEnd(usize),
	None,
}

pub struct ForceGraphState {
	pub nodes: Vec<PositionedNode>,
	pub links: Vec<PositionedLink>,
	pub drag: DragState,
	pub hover: HoverState,
	pub flow_time: f64,
	simulation: Simulation,
	hub: Option<usize>,
}

impl ForceGraphState {
	pub fn new(data: &GraphData, viewport: Viewport, options: &LayoutOptions) -> Self {
		let (nodes, links, hub) = build_layout(data, viewport, options);
		let simulation = Simulation::new(nodes.len(), &links, options.forces.clone(), viewport);
		let mut state = Self {
			nodes,
			links,
			drag: DragState::default(),
			hover: HoverState::default(),
			flow_time: 0.0,
			simulation,
			hub,
		};
		state.simulation.contain(&mut state.nodes);
		debug!(
			"layout built: {} nodes, {} links",
			state.nodes.len(),
			state.links.len()
		);
		state
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn viewport(&self) -> Viewport {
		self.simulation.viewport()
	}

	pub fn hub(&self) -> Option<&PositionedNode> {
		self.hub.map(|idx| &self.nodes[idx])
	}

	pub fn is_running(&self) -> bool {
		!self.is_empty() && self.simulation.is_active()
	}

	/// Whether another frame would change what is drawn.
	pub fn needs_frame(&self) -> bool {
		self.is_running() || self.drag.node_idx.is_some()
	}

	pub fn tick(&mut self, dt: f64) {
		if self.is_empty() {
			return;
		}
		self.simulation.tick(&mut self.nodes, &self.links);
		self.flow_time += dt;
	}

	/// New host size: the hub follows the center and every node is pulled back
	/// inside, the rest of the simulation state is kept.
	pub fn resize(&mut self, viewport: Viewport) {
		if viewport == self.viewport() {
			return;
		}
		if let Some(idx) = self.hub {
			let (cx, cy) = viewport.center();
			self.nodes[idx].pin(cx, cy);
			self.nodes[idx].x = cx;
			self.nodes[idx].y = cy;
		}
		self.simulation.set_viewport(&mut self.nodes, viewport);
		self.simulation.reheat(RESIZE_ALPHA);
		debug!(
			"layout resized to {}x{}, alpha {:.3}",
			viewport.width,
			viewport.height,
			self.simulation.alpha()
		);
	}

	pub fn node_at_position(&self, x: f64, y: f64) -> Option<usize> {
		let mut found = None;
		let mut best = f64::INFINITY;
		for (idx, node) in self.nodes.iter().enumerate() {
			let d = ((node.x - x).powi(2) + (node.y - y).powi(2)).sqrt();
			if d < node.radius.max(HIT_RADIUS) && d <= best {
				best = d;
				found = Some(idx);
			}
		}
		found
	}

	pub fn link_at_position(&self, x: f64, y: f64) -> Option<usize> {
		let mut found = None;
		let mut best = LINK_HIT_DISTANCE;
		for (idx, link) in self.links.iter().enumerate() {
			let (s, t) = (&self.nodes[link.source], &self.nodes[link.target]);
			let d = segment_distance(x, y, s.x, s.y, t.x, t.y);
			if d <= best {
				best = d;
				found = Some(idx);
			}
		}
		found
	}

	/// Press on `idx`. The hub can be pressed and clicked but never moves.
	pub fn begin_drag(&mut self, idx: usize, x: f64, y: f64) -> bool {
		let Some(node) = self.nodes.get_mut(idx) else {
			return false;
		};
		self.drag = DragState {
			node_idx: Some(idx),
			start_x: x,
			start_y: y,
			moved: false,
		};
		if node.is_hub() {
			return true;
		}
		node.pin(node.x, node.y);
		true
	}

	pub fn drag_to(&mut self, x: f64, y: f64) {
		let Some(idx) = self.drag.node_idx else {
			return;
		};
		if !self.drag.moved && (x - self.drag.start_x).hypot(y - self.drag.start_y) < CLICK_SLOP {
			return;
		}
		if !self.drag.moved {
			self.drag.moved = true;
			if !self.nodes[idx].is_hub() {
				self.simulation.set_alpha_target(DRAG_ALPHA_TARGET);
				self.simulation.reheat(DRAG_ALPHA_TARGET);
			}
		}
		let node = &mut self.nodes[idx];
		if node.is_hub() {
			return;
		}
		let (px, py) = self.simulation.viewport().contain(x, y, node.radius);
		node.pin(px, py);
		node.x = px;
		node.y = py;
	}

	pub fn end_drag(&mut self) -> Release {
		let drag = std::mem::take(&mut self.drag);
		let Some(idx) = drag.node_idx else {
			return Release::None;
		};
		let node = &mut self.nodes[idx];
		if !node.is_hub() {
			node.unpin();
		}
		if drag.moved {
			self.simulation.set_alpha_target(0.0);
			Release::DragEnd(idx)
		} else {
			Release::NodeClick(idx)
		}
	}

	/// Drop any drag in progress without reporting a click.
	pub fn cancel_drag(&mut self) {
		if let Some(idx) = self.drag.node_idx.take() {
			if !self.nodes[idx].is_hub() {
				self.nodes[idx].unpin();
			}
			self.simulation.set_alpha_target(0.0);
		}
		self.drag = DragState::default();
	}

	pub fn set_hover(&mut self, node: Option<usize>) {
		if self.hover.node == node {
			return;
		}
		self.hover.node = node;
		self.hover.neighbors.clear();
		if let Some(idx) = node {
			for link in &self.links {
				if link.source == idx {
					self.hover.neighbors.insert(link.target);
				} else if link.target == idx {
					self.hover.neighbors.insert(link.source);
				}
			}
		}
	}

	/// CSS cursor for the pointer at `(x, y)`.
	pub fn cursor_at(&self, x: f64, y: f64) -> &'static str {
		if let Some(idx) = self.drag.node_idx {
			if !self.nodes[idx].is_hub() {
				return "grabbing";
			}
		}
		if self.node_at_position(x, y).is_some() || self.link_at_position(x, y).is_some() {
			"pointer"
		} else {
			"default"
		}
	}

	pub fn is_highlighted(&self, idx: usize) -> bool {
		self.hover.node == Some(idx) || self.hover.neighbors.contains(&idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some()
	}
}

fn build_layout(
	data: &GraphData,
	viewport: Viewport,
	options: &LayoutOptions,
) -> (Vec<PositionedNode>, Vec<PositionedLink>, Option<usize>) {
	if data.is_empty() {
		return (Vec::new(), Vec::new(), None);
	}

	let (cx, cy) = viewport.center();
	let count = data.nodes.len();
	let mut nodes = Vec::with_capacity(count + 1);
	let mut id_to_idx: HashMap<&NodeId, usize> = HashMap::new();

	for (i, node) in data.nodes.iter().enumerate() {
		if id_to_idx.contains_key(&node.id) {
			warn!("duplicate node id {} in snapshot, keeping the first", node.id);
			continue;
		}
		let kind = if options.classifier.is_structural(node) {
			NodeKind::Document
		} else {
			NodeKind::Concept
		};
		let angle = (i as f64) * 2.0 * PI / count as f64;
		id_to_idx.insert(&node.id, nodes.len());
		nodes.push(positioned(
			node.clone(),
			kind,
			options.colors.node_color(node.group.as_deref()),
			cx + INITIAL_RING * angle.cos(),
			cy + INITIAL_RING * angle.sin(),
		));
	}

	let mut links = Vec::with_capacity(data.links.len() + nodes.len());
	for link in &data.links {
		match (id_to_idx.get(&link.source), id_to_idx.get(&link.target)) {
			(Some(&source), Some(&target)) => links.push(PositionedLink {
				datum: link.clone(),
				source,
				target,
				synthetic: false,
			}),
			_ => warn!(
				"dropping link {} -> {}: endpoint not in snapshot",
				link.source, link.target
			),
		}
	}

	let hub_id = unique_hub_id(&id_to_idx);
	let hub_idx = nodes.len();
	let mut hub = positioned(
		GraphNode::new(hub_id.clone())
			.with_label(HUB_LABEL)
			.with_attr(HUB_ATTR, true),
		NodeKind::Hub,
		options.colors.hub_color.clone(),
		cx,
		cy,
	);
	hub.pin(cx, cy);
	nodes.push(hub);

	let mut spoked = HashSet::new();
	for idx in 0..hub_idx {
		if nodes[idx].kind != NodeKind::Document || !spoked.insert(idx) {
			continue;
		}
		links.push(PositionedLink {
			datum: GraphLink::new(hub_id.clone(), nodes[idx].datum.id.clone()),
			source: hub_idx,
			target: idx,
			synthetic: true,
		});
	}

	(nodes, links, Some(hub_idx))
}

/// True for the synthetic hub as it appears in click callbacks.
pub fn is_hub_node(node: &GraphNode) -> bool {
	node.attrs.get(HUB_ATTR).and_then(|v| v.as_bool()) == Some(true)
		&& node.id.to_string().starts_with(HUB_ID)
}

fn unique_hub_id(taken: &HashMap<&NodeId, usize>) -> NodeId {
	let mut candidate = NodeId::from(HUB_ID);
	let mut n = 1;
	while taken.contains_key(&candidate) {
		candidate = NodeId::Text(format!("{HUB_ID}{n}"));
		n += 1;
	}
	candidate
}

fn positioned(datum: GraphNode, kind: NodeKind, color: String, x: f64, y: f64) -> PositionedNode {
	let label = datum.display_label();
	let radius = match kind {
		NodeKind::Hub => HUB_RADIUS,
		NodeKind::Document => DOCUMENT_RADIUS,
		NodeKind::Concept => NODE_RADIUS,
	};
	let collide_radius = match kind {
		NodeKind::Hub => radius + 30.0,
		_ => radius + 4.0 + label.chars().count().min(24) as f64 * 0.6,
	};
	PositionedNode {
		datum,
		kind,
		label,
		color,
		radius,
		collide_radius,
		x,
		y,
		vx: 0.0,
		vy: 0.0,
		fx: None,
		fy: None,
	}
}

fn segment_distance(px: f64, py: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
	let (dx, dy) = (x2 - x1, y2 - y1);
	let len2 = dx * dx + dy * dy;
	if len2 < 1e-9 {
		return (px - x1).hypot(py - y1);
	}
	let t = (((px - x1) * dx + (py - y1) * dy) / len2).clamp(0.0, 1.0);
	(px - (x1 + t * dx)).hypot(py - (y1 + t * dy))
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	fn viewport() -> Viewport {
		Viewport::new(800.0, 600.0)
	}

	fn sample() -> GraphData {
		GraphData {
			nodes: vec![
				GraphNode::new("document::a.pdf").with_group("document"),
				GraphNode::new("document::b.pdf").with_group("document"),
				GraphNode::new("concept::rust").with_group("concept").with_label("rust"),
			],
			links: vec![
				GraphLink::new("document::a.pdf", "concept::rust").with_value(1.0),
				GraphLink::new("document::b.pdf", "concept::rust").with_value(1.0),
			],
		}
	}

	fn hub_count(state: &ForceGraphState) -> usize {
		state.nodes.iter().filter(|n| n.is_hub()).count()
	}

	#[test]
	fn empty_snapshot_is_a_no_op() {
		let mut state =
			ForceGraphState::new(&GraphData::default(), viewport(), &LayoutOptions::default());
		assert!(state.is_empty());
		assert!(state.hub().is_none());
		assert!(!state.is_running());
		state.tick(0.016);
		assert!(state.links.is_empty());
	}

	#[test]
	fn hub_is_injected_and_linked_to_documents_once() {
		let data = sample();
		let state = ForceGraphState::new(&data, viewport(), &LayoutOptions::default());
		assert_eq!(state.nodes.len(), 4);
		assert_eq!(hub_count(&state), 1);

		let spokes: Vec<_> = state.links.iter().filter(|l| l.synthetic).collect();
		assert_eq!(spokes.len(), 2);
		assert_eq!(state.links.len(), 4);

		// Reprocessing the same snapshot starts over from the caller's data.
		let again = ForceGraphState::new(&data, viewport(), &LayoutOptions::default());
		assert_eq!(again.links.iter().filter(|l| l.synthetic).count(), 2);
		assert_eq!(data, sample());
	}

	#[test]
	fn hub_id_never_collides_with_user_ids() {
		let data = GraphData {
			nodes: vec![GraphNode::new(HUB_ID), GraphNode::new(format!("{HUB_ID}1"))],
			links: vec![],
		};
		let state = ForceGraphState::new(&data, viewport(), &LayoutOptions::default());
		let hub = state.hub().unwrap();
		assert_eq!(hub.datum.id, NodeId::Text(format!("{HUB_ID}2")));
		assert!(is_hub_node(&hub.datum));
		assert!(!is_hub_node(&state.nodes[0].datum));
	}

	#[test]
	fn dangling_links_are_dropped() {
		let mut data = sample();
		data.links.push(GraphLink::new("concept::rust", "concept::missing"));
		let state = ForceGraphState::new(&data, viewport(), &LayoutOptions::default());
		let missing = NodeId::Text("concept::missing".into());
		assert!(state.links.iter().all(|l| l.datum.target != missing));
		assert_eq!(state.links.len(), 4);
	}

	#[test]
	fn duplicate_ids_keep_the_first_node() {
		let data = GraphData {
			nodes: vec![
				GraphNode::new(1i64).with_label("first"),
				GraphNode::new(1i64).with_label("second"),
			],
			links: vec![],
		};
		let state = ForceGraphState::new(&data, viewport(), &LayoutOptions::default());
		assert_eq!(state.nodes.len(), 2);
		assert_eq!(state.nodes[0].label, "first");
	}

	#[test]
	fn hub_stays_pinned_at_center_and_refuses_drag() {
		let mut state = ForceGraphState::new(&sample(), viewport(), &LayoutOptions::default());
		let hub_idx = state.nodes.iter().position(|n| n.is_hub()).unwrap();
		assert!(state.begin_drag(hub_idx, 400.0, 300.0));
		state.drag_to(10.0, 10.0);
		for _ in 0..30 {
			state.tick(0.016);
		}
		assert_eq!(state.end_drag(), Release::DragEnd(hub_idx));
		let hub = state.hub().unwrap();
		assert_eq!((hub.x, hub.y), (400.0, 300.0));
		assert!(hub.fx.is_some());
	}

	#[test]
	fn drag_pins_then_releases_a_node() {
		let mut state = ForceGraphState::new(&sample(), viewport(), &LayoutOptions::default());
		let (x, y) = (state.nodes[2].x, state.nodes[2].y);
		assert!(state.begin_drag(2, x, y));
		state.drag_to(x + 50.0, y + 20.0);
		state.tick(0.016);
		assert_eq!((state.nodes[2].x, state.nodes[2].y), (x + 50.0, y + 20.0));
		assert!(state.is_running());

		assert_eq!(state.end_drag(), Release::DragEnd(2));
		assert!(state.nodes[2].fx.is_none());
	}

	#[test]
	fn drag_is_clamped_to_the_viewport() {
		let mut state = ForceGraphState::new(&sample(), viewport(), &LayoutOptions::default());
		let (x, y) = (state.nodes[0].x, state.nodes[0].y);
		state.begin_drag(0, x, y);
		state.drag_to(-500.0, 5000.0);
		assert_eq!(
			(state.nodes[0].x, state.nodes[0].y),
			(DOCUMENT_RADIUS, 600.0 - DOCUMENT_RADIUS)
		);
	}

	#[test]
	fn short_press_is_a_click() {
		let mut state = ForceGraphState::new(&sample(), viewport(), &LayoutOptions::default());
		let (x, y) = (state.nodes[1].x, state.nodes[1].y);
		assert_eq!(state.node_at_position(x + 1.0, y), Some(1));
		state.begin_drag(1, x, y);
		state.drag_to(x + 1.0, y + 1.0);
		assert_eq!(state.end_drag(), Release::NodeClick(1));
	}

	#[test]
	fn links_are_hit_near_their_segment() {
		let state = ForceGraphState::new(&sample(), viewport(), &LayoutOptions::default());
		let link = &state.links[0];
		let (s, t) = (&state.nodes[link.source], &state.nodes[link.target]);
		let (mx, my) = ((s.x + t.x) / 2.0, (s.y + t.y) / 2.0);
		let hit = state.link_at_position(mx, my).unwrap();
		let found = &state.links[hit];
		let (fs, ft) = (&state.nodes[found.source], &state.nodes[found.target]);
		assert!(segment_distance(mx, my, fs.x, fs.y, ft.x, ft.y) <= LINK_HIT_DISTANCE);
		assert_eq!(state.link_at_position(-100.0, -100.0), None);
	}

	#[test]
	fn hover_highlights_neighbors() {
		let mut state = ForceGraphState::new(&sample(), viewport(), &LayoutOptions::default());
		state.set_hover(Some(2));
		assert!(state.is_highlighted(0));
		assert!(state.is_highlighted(1));
		assert!(!state.is_highlighted(3));
		state.set_hover(None);
		assert!(!state.has_active_highlight());
	}

	#[test]
	fn frames_stop_once_the_layout_settles() {
		let mut state = ForceGraphState::new(&sample(), viewport(), &LayoutOptions::default());
		assert!(state.needs_frame());
		for _ in 0..10_000 {
			if !state.is_running() {
				break;
			}
			state.tick(0.016);
		}
		assert!(!state.needs_frame());

		let (x, y) = (state.nodes[2].x, state.nodes[2].y);
		state.begin_drag(2, x, y);
		assert!(state.needs_frame());
		state.cancel_drag();
		assert!(!state.needs_frame());

		state.resize(Viewport::new(640.0, 480.0));
		assert!(state.needs_frame());
	}

	#[test]
	fn cursor_follows_what_is_under_the_pointer() {
		let mut state = ForceGraphState::new(&sample(), viewport(), &LayoutOptions::default());
		let (x, y) = (state.nodes[2].x, state.nodes[2].y);
		assert_eq!(state.cursor_at(x, y), "pointer");
		assert_eq!(state.cursor_at(-100.0, -100.0), "default");

		state.begin_drag(2, x, y);
		assert_eq!(state.cursor_at(-100.0, -100.0), "grabbing");
		state.end_drag();

		let hub_idx = state.nodes.iter().position(|n| n.is_hub()).unwrap();
		let hub = state.hub().unwrap();
		let (hx, hy) = (hub.x, hub.y);
		state.begin_drag(hub_idx, hx, hy);
		assert_eq!(state.cursor_at(hx, hy), "pointer");
	}

	#[test]
	fn resize_moves_hub_and_reclamps() {
		let mut state = ForceGraphState::new(&sample(), viewport(), &LayoutOptions::default());
		for _ in 0..50 {
			state.tick(0.016);
		}
		state.resize(Viewport::new(200.0, 100.0));
		let hub = state.hub().unwrap();
		assert_eq!((hub.x, hub.y), (100.0, 50.0));
		for n in &state.nodes {
			assert!(n.x >= n.radius && n.x <= 200.0 - n.radius);
			assert!(n.y >= n.radius && n.y <= 100.0 - n.radius);
		}
	}

	#[test]
	fn colors_follow_the_scheme() {
		let options = LayoutOptions {
			colors: ColorScheme::default().with_group("concept", "#123456"),
			..LayoutOptions::default()
		};
		let state = ForceGraphState::new(&sample(), viewport(), &options);
		assert_eq!(state.nodes[2].color, "#123456");
		assert_eq!(state.hub().unwrap().color, options.colors.hub_color);
	}

	fn arb_graph() -> impl Strategy<Value = GraphData> {
		(1usize..24).prop_flat_map(|n| {
			let groups = proptest::collection::vec(
				prop_oneof![Just(None), Just(Some("document")), Just(Some("concept"))],
				n,
			);
			let links = proptest::collection::vec((0..n, 0..n), 0..(n * 2));
			(groups, links).prop_map(|(groups, links)| GraphData {
				nodes: groups
					.into_iter()
					.enumerate()
					.map(|(i, g)| {
						let node = GraphNode::new(i as i64).with_label(format!("node {i}"));
						match g {
							Some(g) => node.with_group(g),
							None => node,
						}
					})
					.collect(),
				links: links
					.into_iter()
					.map(|(s, t)| GraphLink::new(s as i64, t as i64))
					.collect(),
			})
		})
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(48))]

		#[test]
		fn nodes_stay_inside_the_viewport(
			data in arb_graph(),
			width in 100.0f64..1600.0,
			height in 100.0f64..1200.0,
			ticks in 1usize..60,
		) {
			let viewport = Viewport::new(width, height);
			let mut state = ForceGraphState::new(&data, viewport, &LayoutOptions::default());
			for _ in 0..ticks {
				state.tick(0.016);
				for n in &state.nodes {
					let inside_x = n.x >= n.radius && n.x <= width - n.radius;
					let inside_y = n.y >= n.radius && n.y <= height - n.radius;
					prop_assert!(inside_x, "x={} w={}", n.x, width);
					prop_assert!(inside_y, "y={} h={}", n.y, height);
				}
			}
		}

		#[test]
		fn exactly_one_hub_with_single_spokes(data in arb_graph()) {
			let state = ForceGraphState::new(&data, viewport(), &LayoutOptions::default());
			prop_assert_eq!(hub_count(&state), 1);
			let mut seen = HashSet::new();
			for link in state.links.iter().filter(|l| l.synthetic) {
				prop_assert!(seen.insert(link.target));
				prop_assert_eq!(state.nodes[link.target].kind, NodeKind::Document);
			}
			let documents = state.nodes.iter().filter(|n| n.kind == NodeKind::Document).count();
			prop_assert_eq!(seen.len(), documents);
		}
	}
}
