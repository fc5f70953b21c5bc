use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Element, HtmlCanvasElement, MouseEvent, ResizeObserver};

use super::render;
use super::simulation::Viewport;
use super::state::{ForceGraphState, LayoutOptions, Release};
use super::types::{GraphData, GraphLink, GraphNode};
use crate::sync::Epoch;

const FRAME_DT: f64 = 0.016;
const FALLBACK_WIDTH: f64 = 800.0;
const FALLBACK_HEIGHT: f64 = 600.0;

/// Called with a copy of the clicked node.
pub type NodeClickHandler = Rc<dyn Fn(GraphNode)>;
/// Called with a copy of the clicked link (hub spokes included).
pub type LinkClickHandler = Rc<dyn Fn(GraphLink)>;

/// Per-mount canvas machinery. One layout at a time; replacing the snapshot
/// tears the previous one down first.
#[derive(Default)]
struct CanvasRuntime {
	state: RefCell<Option<ForceGraphState>>,
	frame: RefCell<Option<Closure<dyn FnMut()>>>,
	frame_handle: Cell<Option<i32>>,
	frames: Epoch,
	observer: RefCell<Option<(ResizeObserver, Closure<dyn FnMut()>)>>,
}

impl CanvasRuntime {
	/// Stop the loop and drop the layout. Frames already queued see a newer
	/// generation and return without touching the canvas.
	fn teardown(&self, ctx: Option<&CanvasRenderingContext2d>) {
		self.frames.advance();
		if let Some(handle) = self.frame_handle.take() {
			if let Some(window) = web_sys::window() {
				let _ = window.cancel_animation_frame(handle);
			}
		}
		self.frame.borrow_mut().take();
		if let Some(state) = self.state.borrow_mut().take() {
			if let Some(ctx) = ctx {
				let viewport = state.viewport();
				render::clear(ctx, viewport.width, viewport.height);
			}
		}
	}

	fn dispose(&self) {
		self.teardown(None);
		if let Some((observer, _cb)) = self.observer.borrow_mut().take() {
			observer.disconnect();
		}
	}

	fn schedule_frame(&self) {
		let Some(window) = web_sys::window() else {
			return;
		};
		if let Some(cb) = self.frame.borrow().as_ref() {
			match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
				Ok(handle) => self.frame_handle.set(Some(handle)),
				Err(_) => warn!("requestAnimationFrame rejected; layout loop stopped"),
			}
		}
	}

	/// Restart an idle loop after input or a resize changed the layout.
	fn wake(&self) {
		if self.frame_handle.get().is_none() && self.frame.borrow().is_some() {
			self.schedule_frame();
		}
	}
}

fn start_frames(runtime: &Rc<CanvasRuntime>, ctx: CanvasRenderingContext2d) {
	let generation = runtime.frames.advance();
	let weak: Weak<CanvasRuntime> = Rc::downgrade(runtime);
	*runtime.frame.borrow_mut() = Some(Closure::new(move || {
		let Some(rt) = weak.upgrade() else {
			return;
		};
		if !rt.frames.is_current(generation) {
			return;
		}
		rt.frame_handle.set(None);
		let again = match *rt.state.borrow_mut() {
			Some(ref mut s) => {
				if s.is_running() {
					s.tick(FRAME_DT);
				}
				render::render(s, &ctx);
				s.needs_frame()
			}
			None => false,
		};
		// Idle layouts stop here; input and resizes wake the loop.
		if again {
			rt.schedule_frame();
		}
	}));
	runtime.schedule_frame();
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok().flatten()?.dyn_into().ok()
}

fn measure(host: &Element, width: Option<f64>, height: Option<f64>) -> Viewport {
	let observed = |v: i32, fallback: f64| if v > 0 { v as f64 } else { fallback };
	Viewport::new(
		width.unwrap_or_else(|| observed(host.client_width(), FALLBACK_WIDTH)),
		height.unwrap_or_else(|| observed(host.client_height(), FALLBACK_HEIGHT)),
	)
}

fn size_canvas(canvas: &HtmlCanvasElement, viewport: Viewport) {
	canvas.set_width(viewport.width as u32);
	canvas.set_height(viewport.height as u32);
}

fn observe_host(
	runtime: &Rc<CanvasRuntime>,
	host: Element,
	canvas: HtmlCanvasElement,
	width: Option<f64>,
	height: Option<f64>,
) {
	if runtime.observer.borrow().is_some() {
		return;
	}
	let weak = Rc::downgrade(runtime);
	let host_cb = host.clone();
	let cb = Closure::<dyn FnMut()>::new(move || {
		let Some(rt) = weak.upgrade() else {
			return;
		};
		let viewport = measure(&host_cb, width, height);
		if let Some(ref mut s) = *rt.state.borrow_mut() {
			if s.viewport() != viewport {
				debug!("graph host resized to {}x{}", viewport.width, viewport.height);
				size_canvas(&canvas, viewport);
				s.resize(viewport);
			}
		}
		rt.wake();
	});
	match ResizeObserver::new(cb.as_ref().unchecked_ref()) {
		Ok(observer) => {
			observer.observe(&host);
			*runtime.observer.borrow_mut() = Some((observer, cb));
		}
		Err(_) => warn!("ResizeObserver unavailable; graph keeps its initial size"),
	}
}

enum Clicked {
	Node(GraphNode),
	Link(GraphLink),
}

fn pointer_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

fn set_cursor(canvas: &HtmlCanvasElement, cursor: &str) {
	// Explicit path: the leptos prelude's `ElementExt::style` shadows this one.
	let _ = web_sys::HtmlElement::style(canvas).set_property("cursor", cursor);
}

/// Interactive force-directed view of one [`GraphData`] snapshot.
///
/// Without `width`/`height` the canvas fills its host element and follows it
/// as it resizes.
#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(optional)] width: Option<f64>,
	#[prop(optional)] height: Option<f64>,
	#[prop(optional)] options: Option<LayoutOptions>,
	#[prop(optional)] on_node_click: Option<NodeClickHandler>,
	#[prop(optional)] on_link_click: Option<LinkClickHandler>,
) -> impl IntoView {
	let host_ref = NodeRef::<leptos::html::Div>::new();
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let options = options.unwrap_or_default();
	let runtime = Rc::new(CanvasRuntime::default());

	let rt_effect = runtime.clone();
	Effect::new(move |_| {
		let snapshot = data.get();
		let (Some(host), Some(canvas)) = (host_ref.get(), canvas_ref.get()) else {
			return;
		};
		let host: Element = host.into();
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(ctx) = context_2d(&canvas) else {
			warn!("canvas has no 2d context");
			return;
		};

		rt_effect.teardown(Some(&ctx));
		let viewport = measure(&host, width, height);
		size_canvas(&canvas, viewport);
		render::clear(&ctx, viewport.width, viewport.height);
		if width.is_none() || height.is_none() {
			observe_host(&rt_effect, host, canvas, width, height);
		}
		if snapshot.is_empty() {
			return;
		}

		*rt_effect.state.borrow_mut() = Some(ForceGraphState::new(&snapshot, viewport, &options));
		start_frames(&rt_effect, ctx);
	});

	let rt_cleanup = StoredValue::new_local(runtime.clone());
	on_cleanup(move || {
		rt_cleanup.try_with_value(|rt| rt.dispose());
	});

	let rt_md = runtime.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let (x, y) = pointer_position(&canvas, &ev);
		if let Some(ref mut s) = *rt_md.state.borrow_mut() {
			if let Some(idx) = s.node_at_position(x, y) {
				s.begin_drag(idx, x, y);
				set_cursor(&canvas, s.cursor_at(x, y));
			}
		}
		rt_md.wake();
	};

	let rt_mm = runtime.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let (x, y) = pointer_position(&canvas, &ev);
		if let Some(ref mut s) = *rt_mm.state.borrow_mut() {
			if s.drag.node_idx.is_some() {
				s.drag_to(x, y);
			} else {
				let hovered = s.node_at_position(x, y);
				s.set_hover(hovered);
			}
			set_cursor(&canvas, s.cursor_at(x, y));
		}
		rt_mm.wake();
	};

	let rt_mu = runtime.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let (x, y) = pointer_position(&canvas, &ev);

		// Copy the payload out so handlers run with the state released.
		let clicked = {
			let mut guard = rt_mu.state.borrow_mut();
			let Some(s) = guard.as_mut() else {
				return;
			};
			let clicked = match s.end_drag() {
				Release::NodeClick(idx) => Some(Clicked::Node(s.nodes[idx].datum.clone())),
				Release::DragEnd(_) => None,
				Release::None => s
					.link_at_position(x, y)
					.map(|idx| Clicked::Link(s.links[idx].datum.clone())),
			};
			set_cursor(&canvas, s.cursor_at(x, y));
			clicked
		};
		rt_mu.wake();
		match clicked {
			Some(Clicked::Node(node)) => {
				if let Some(cb) = &on_node_click {
					cb(node);
				}
			}
			Some(Clicked::Link(link)) => {
				if let Some(cb) = &on_link_click {
					cb(link);
				}
			}
			None => {}
		}
	};

	let rt_ml = runtime.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *rt_ml.state.borrow_mut() {
			s.cancel_drag();
			s.set_hover(None);
		}
		rt_ml.wake();
	};

	view! {
		<div
			node_ref=host_ref
			class="force-graph-host"
			style="position: relative; width: 100%; height: 100%; min-height: 320px;"
		>
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				style="position: absolute; inset: 0; display: block;"
			/>
		</div>
	}
}
