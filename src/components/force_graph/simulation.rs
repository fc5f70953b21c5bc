//! Velocity-Verlet style force simulation.
//!
//! Forces follow the usual d3-force formulation: every tick the energy
//! (`alpha`) moves toward its target, forces add to node velocities scaled by
//! `alpha`, velocities decay, and positions integrate. Containment runs last
//! so no node ever leaves the viewport between frames.

use super::types::{GraphLink, GraphNode};

pub const ALPHA_MIN: f64 = 0.001;
/// Energy kept while a node is being dragged so its neighbors follow.
pub const DRAG_ALPHA_TARGET: f64 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
	Hub,
	Document,
	Concept,
}

/// Simulation-side copy of a [`GraphNode`]. The caller's snapshot is never
/// touched; positions and pins live here only.
#[derive(Clone, Debug)]
pub struct PositionedNode {
	pub datum: GraphNode,
	pub kind: NodeKind,
	pub label: String,
	pub color: String,
	pub radius: f64,
	pub collide_radius: f64,
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
	pub fx: Option<f64>,
	pub fy: Option<f64>,
}

impl PositionedNode {
	pub fn is_hub(&self) -> bool {
		self.kind == NodeKind::Hub
	}

	pub fn pin(&mut self, x: f64, y: f64) {
		self.fx = Some(x);
		self.fy = Some(y);
	}

	pub fn unpin(&mut self) {
		self.fx = None;
		self.fy = None;
	}
}

/// A link resolved to node indices. Synthetic links are the hub spokes.
#[derive(Clone, Debug)]
pub struct PositionedLink {
	pub datum: GraphLink,
	pub source: usize,
	pub target: usize,
	pub synthetic: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
}

impl Viewport {
	pub fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}

	pub fn center(&self) -> (f64, f64) {
		(self.width / 2.0, self.height / 2.0)
	}

	/// Clamp a point so a circle of `radius` around it stays on screen.
	pub fn contain(&self, x: f64, y: f64, radius: f64) -> (f64, f64) {
		(
			contain_axis(x, radius, self.width),
			contain_axis(y, radius, self.height),
		)
	}
}

fn contain_axis(v: f64, radius: f64, extent: f64) -> f64 {
	if extent <= 2.0 * radius {
		return extent / 2.0;
	}
	if !v.is_finite() {
		return extent / 2.0;
	}
	v.clamp(radius, extent - radius)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForceParams {
	/// Rest length of every link.
	pub link_distance: f64,
	/// Many-body strength; negative repels.
	pub charge_strength: f64,
	/// Below this distance the many-body force stops growing.
	pub charge_distance_min: f64,
	/// Beyond this distance nodes ignore each other.
	pub charge_distance_max: f64,
	pub center_strength: f64,
	pub collide_strength: f64,
	pub velocity_decay: f64,
}

impl Default for ForceParams {
	fn default() -> Self {
		Self {
			link_distance: 120.0,
			charge_strength: -240.0,
			charge_distance_min: 8.0,
			charge_distance_max: 480.0,
			center_strength: 0.04,
			collide_strength: 0.7,
			velocity_decay: 0.4,
		}
	}
}

#[derive(Clone, Copy, Debug)]
struct LinkWeight {
	strength: f64,
	bias: f64,
}

pub struct Simulation {
	params: ForceParams,
	viewport: Viewport,
	alpha: f64,
	alpha_target: f64,
	alpha_decay: f64,
	weights: Vec<LinkWeight>,
}

impl Simulation {
	pub fn new(
		node_count: usize,
		links: &[PositionedLink],
		params: ForceParams,
		viewport: Viewport,
	) -> Self {
		let mut degree = vec![0usize; node_count];
		for link in links {
			degree[link.source] += 1;
			degree[link.target] += 1;
		}
		let weights = links
			.iter()
			.map(|link| {
				let (ds, dt) = (degree[link.source] as f64, degree[link.target] as f64);
				LinkWeight {
					strength: 1.0 / ds.min(dt).max(1.0),
					bias: ds / (ds + dt),
				}
			})
			.collect();

		Self {
			params,
			viewport,
			alpha: 1.0,
			alpha_target: 0.0,
			alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / 300.0),
			weights,
		}
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn viewport(&self) -> Viewport {
		self.viewport
	}

	/// Whether another tick would still move anything.
	pub fn is_active(&self) -> bool {
		self.alpha >= ALPHA_MIN || self.alpha_target > 0.0
	}

	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target;
	}

	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = self.alpha.max(alpha);
	}

	/// Swap containment/centering bounds and re-clamp in place. Positions and
	/// velocities are kept.
	pub fn set_viewport(&mut self, nodes: &mut [PositionedNode], viewport: Viewport) {
		self.viewport = viewport;
		self.contain(nodes);
	}

	pub fn tick(&mut self, nodes: &mut [PositionedNode], links: &[PositionedLink]) {
		self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

		self.apply_links(nodes, links);
		self.apply_charge(nodes);
		self.apply_center(nodes);
		self.apply_collisions(nodes);

		let keep = 1.0 - self.params.velocity_decay;
		for node in nodes.iter_mut() {
			match node.fx {
				Some(fx) => {
					node.x = fx;
					node.vx = 0.0;
				}
				None => {
					node.vx *= keep;
					node.x += node.vx;
				}
			}
			match node.fy {
				Some(fy) => {
					node.y = fy;
					node.vy = 0.0;
				}
				None => {
					node.vy *= keep;
					node.y += node.vy;
				}
			}
		}

		self.contain(nodes);
	}

	pub fn contain(&self, nodes: &mut [PositionedNode]) {
		for node in nodes.iter_mut() {
			let (x, y) = self.viewport.contain(node.x, node.y, node.radius);
			if x != node.x {
				node.x = x;
				node.vx = 0.0;
			}
			if y != node.y {
				node.y = y;
				node.vy = 0.0;
			}
		}
	}

	fn apply_links(&self, nodes: &mut [PositionedNode], links: &[PositionedLink]) {
		for (k, (link, weight)) in links.iter().zip(&self.weights).enumerate() {
			let (s, t) = (link.source, link.target);
			if s == t {
				continue;
			}
			let mut x = nodes[t].x + nodes[t].vx - nodes[s].x - nodes[s].vx;
			let mut y = nodes[t].y + nodes[t].vy - nodes[s].y - nodes[s].vy;
			if x == 0.0 {
				x = jiggle(k);
			}
			if y == 0.0 {
				y = jiggle(k + 1);
			}
			let len = (x * x + y * y).sqrt();
			let l = (len - self.params.link_distance) / len * self.alpha * weight.strength;
			x *= l;
			y *= l;
			nodes[t].vx -= x * weight.bias;
			nodes[t].vy -= y * weight.bias;
			nodes[s].vx += x * (1.0 - weight.bias);
			nodes[s].vy += y * (1.0 - weight.bias);
		}
	}

	fn apply_charge(&self, nodes: &mut [PositionedNode]) {
		let min2 = self.params.charge_distance_min.powi(2);
		let max2 = self.params.charge_distance_max.powi(2);
		let n = nodes.len();
		for i in 0..n {
			for j in (i + 1)..n {
				let mut dx = nodes[j].x - nodes[i].x;
				let mut dy = nodes[j].y - nodes[i].y;
				if dx == 0.0 {
					dx = jiggle(i * n + j);
				}
				if dy == 0.0 {
					dy = jiggle(j * n + i);
				}
				let mut l = dx * dx + dy * dy;
				if l >= max2 {
					continue;
				}
				if l < min2 {
					l = (min2 * l).sqrt();
				}
				let w = self.params.charge_strength * self.alpha / l;
				nodes[i].vx += dx * w;
				nodes[i].vy += dy * w;
				nodes[j].vx -= dx * w;
				nodes[j].vy -= dy * w;
			}
		}
	}

	fn apply_center(&self, nodes: &mut [PositionedNode]) {
		let (cx, cy) = self.viewport.center();
		let k = self.params.center_strength * self.alpha;
		for node in nodes.iter_mut() {
			node.vx += (cx - node.x) * k;
			node.vy += (cy - node.y) * k;
		}
	}

	fn apply_collisions(&self, nodes: &mut [PositionedNode]) {
		let n = nodes.len();
		for i in 0..n {
			for j in (i + 1)..n {
				let (ri, rj) = (nodes[i].collide_radius, nodes[j].collide_radius);
				let r = ri + rj;
				let mut dx = nodes[i].x + nodes[i].vx - nodes[j].x - nodes[j].vx;
				let mut dy = nodes[i].y + nodes[i].vy - nodes[j].y - nodes[j].vy;
				if dx * dx + dy * dy >= r * r {
					continue;
				}
				if dx == 0.0 {
					dx = jiggle(i * n + j);
				}
				if dy == 0.0 {
					dy = jiggle(j * n + i);
				}
				let l = (dx * dx + dy * dy).sqrt();
				let push = (r - l) / l * self.params.collide_strength;
				dx *= push;
				dy *= push;
				let share = rj * rj / (ri * ri + rj * rj);
				nodes[i].vx += dx * share;
				nodes[i].vy += dy * share;
				nodes[j].vx -= dx * (1.0 - share);
				nodes[j].vy -= dy * (1.0 - share);
			}
		}
	}
}

/// Tiny deterministic offset for coincident points.
fn jiggle(seed: usize) -> f64 {
	let s = ((seed as f64 + 1.0) * 12.9898).sin() * 43_758.545_3;
	(s.fract() - 0.5) * 1e-6
}

#[cfg(test)]
mod tests {
	use super::*;

	fn body(id: &str, x: f64, y: f64) -> PositionedNode {
		PositionedNode {
			datum: GraphNode::new(id),
			kind: NodeKind::Concept,
			label: id.to_string(),
			color: "#fff".into(),
			radius: 6.0,
			collide_radius: 10.0,
			x,
			y,
			vx: 0.0,
			vy: 0.0,
			fx: None,
			fy: None,
		}
	}

	fn link(source: usize, target: usize) -> PositionedLink {
		PositionedLink {
			datum: GraphLink::new(source as i64, target as i64),
			source,
			target,
			synthetic: false,
		}
	}

	fn dist(a: &PositionedNode, b: &PositionedNode) -> f64 {
		((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
	}

	#[test]
	fn unlinked_nodes_push_apart() {
		let mut nodes = vec![body("a", 390.0, 300.0), body("b", 410.0, 300.0)];
		let mut sim = Simulation::new(2, &[], ForceParams::default(), Viewport::new(800.0, 600.0));
		let before = dist(&nodes[0], &nodes[1]);
		for _ in 0..20 {
			sim.tick(&mut nodes, &[]);
		}
		assert!(dist(&nodes[0], &nodes[1]) > before);
	}

	#[test]
	fn linked_pair_settles_near_rest_length() {
		let mut nodes = vec![body("a", 100.0, 300.0), body("b", 700.0, 300.0)];
		let links = vec![link(0, 1)];
		let params = ForceParams {
			charge_strength: 0.0,
			center_strength: 0.0,
			..ForceParams::default()
		};
		let mut sim = Simulation::new(2, &links, params, Viewport::new(800.0, 600.0));
		while sim.is_active() {
			sim.tick(&mut nodes, &links);
		}
		let d = dist(&nodes[0], &nodes[1]);
		assert!((d - 120.0).abs() < 20.0, "distance {d}");
	}

	#[test]
	fn pinned_nodes_do_not_move() {
		let mut nodes = vec![body("a", 400.0, 300.0), body("b", 405.0, 300.0)];
		nodes[0].pin(400.0, 300.0);
		let mut sim = Simulation::new(2, &[], ForceParams::default(), Viewport::new(800.0, 600.0));
		for _ in 0..50 {
			sim.tick(&mut nodes, &[]);
		}
		assert_eq!((nodes[0].x, nodes[0].y), (400.0, 300.0));
		assert!(nodes[1].x > 405.0);
	}

	#[test]
	fn coincident_nodes_separate_without_nan() {
		let mut nodes = vec![body("a", 200.0, 200.0), body("b", 200.0, 200.0)];
		let mut sim = Simulation::new(2, &[], ForceParams::default(), Viewport::new(400.0, 400.0));
		for _ in 0..30 {
			sim.tick(&mut nodes, &[]);
		}
		assert!(nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));
		assert!(dist(&nodes[0], &nodes[1]) > 1.0);
	}

	#[test]
	fn containment_holds_against_strong_repulsion() {
		let mut nodes: Vec<_> = (0..12)
			.map(|i| body(&i.to_string(), 50.0 + i as f64, 50.0))
			.collect();
		let params = ForceParams {
			charge_strength: -5000.0,
			..ForceParams::default()
		};
		let viewport = Viewport::new(200.0, 150.0);
		let mut sim = Simulation::new(nodes.len(), &[], params, viewport);
		for _ in 0..100 {
			sim.tick(&mut nodes, &[]);
			for n in &nodes {
				assert!(n.x >= n.radius && n.x <= viewport.width - n.radius);
				assert!(n.y >= n.radius && n.y <= viewport.height - n.radius);
			}
		}
	}

	#[test]
	fn alpha_cools_unless_target_is_held() {
		let mut nodes = vec![body("a", 10.0, 10.0)];
		let mut sim = Simulation::new(1, &[], ForceParams::default(), Viewport::new(100.0, 100.0));
		for _ in 0..400 {
			sim.tick(&mut nodes, &[]);
		}
		assert!(!sim.is_active());

		sim.set_alpha_target(DRAG_ALPHA_TARGET);
		sim.reheat(DRAG_ALPHA_TARGET);
		for _ in 0..400 {
			sim.tick(&mut nodes, &[]);
		}
		assert!(sim.is_active());
		assert!((sim.alpha() - DRAG_ALPHA_TARGET).abs() < 1e-3);
	}

	#[test]
	fn shrinking_viewport_reclamps_immediately() {
		let mut nodes = vec![body("a", 700.0, 500.0)];
		let mut sim = Simulation::new(1, &[], ForceParams::default(), Viewport::new(800.0, 600.0));
		sim.set_viewport(&mut nodes, Viewport::new(300.0, 200.0));
		assert_eq!((nodes[0].x, nodes[0].y), (294.0, 194.0));
	}
}
