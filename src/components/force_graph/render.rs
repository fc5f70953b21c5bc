use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::simulation::PositionedNode;
use super::state::ForceGraphState;

const BACKGROUND: &str = "#1a1a2e";

pub fn clear(ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, width, height);
}

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let viewport = state.viewport();
	clear(ctx, viewport.width, viewport.height);
	if state.is_empty() {
		return;
	}
	draw_links(state, ctx);
	draw_nodes(state, ctx);
}

fn draw_links(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let has_highlight = state.has_active_highlight();
	let (dash, gap) = (6.0, 4.0);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);

	for link in &state.links {
		let (s, t) = (&state.nodes[link.source], &state.nodes[link.target]);
		let (dx, dy) = (t.x - s.x, t.y - s.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let lit = state.is_highlighted(link.source) && state.is_highlighted(link.target);
		let alpha = match (has_highlight, lit) {
			(false, _) => 0.6,
			(true, true) => 0.9,
			(true, false) => 0.15,
		};

		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {})", alpha));
		ctx.set_line_width(link.datum.stroke_width());
		if link.synthetic {
			// Hub spokes flow outward so they read as structure, not data.
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(dash),
				&JsValue::from_f64(gap),
			));
			ctx.set_line_dash_offset(dash_offset);
		}

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(s.x + ux * s.radius, s.y + uy * s.radius);
		ctx.line_to(t.x - ux * t.radius, t.y - uy * t.radius);
		ctx.stroke();

		if link.synthetic {
			let _ = ctx.set_line_dash(&js_sys::Array::new());
		}
	}
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let has_highlight = state.has_active_highlight();

	// Dimmed nodes first so highlighted ones paint on top.
	for (idx, node) in state.nodes.iter().enumerate() {
		if has_highlight && state.is_highlighted(idx) {
			continue;
		}
		let alpha = if has_highlight { 0.3 } else { 1.0 };
		draw_node(ctx, node, alpha, false);
	}

	if !has_highlight {
		return;
	}
	for (idx, node) in state.nodes.iter().enumerate() {
		if state.is_highlighted(idx) {
			draw_node(ctx, node, 1.0, state.hover.node == Some(idx));
		}
	}
}

fn draw_node(ctx: &CanvasRenderingContext2d, node: &PositionedNode, alpha: f64, hovered: bool) {
	ctx.set_global_alpha(alpha);
	ctx.begin_path();
	let _ = ctx.arc(node.x, node.y, node.radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(&node.color);
	ctx.fill();

	if node.is_hub() || hovered {
		ctx.begin_path();
		let _ = ctx.arc(node.x, node.y, node.radius + 2.0, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str("rgba(255, 255, 255, 0.7)");
		ctx.set_line_width(1.5);
		ctx.stroke();
	}

	ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", 0.85 * alpha));
	ctx.set_font("11px sans-serif");
	let _ = ctx.fill_text(&node.label, node.x + node.radius + 3.0, node.y + 3.0);
	ctx.set_global_alpha(1.0);
}
