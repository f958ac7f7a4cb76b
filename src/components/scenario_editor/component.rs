use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, DragEvent, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent,
	WheelEvent, Window,
};

use super::render;
use super::state::EditorState;
use super::store::{ScenarioStore, StoreError};
use super::types::NodeKind;

/// Weight of a user-facing notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
	Info,
	Success,
	Warning,
	Error,
}

impl Severity {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Info => "info",
			Self::Success => "success",
			Self::Warning => "warning",
			Self::Error => "error",
		}
	}
}

const KIND_MIME: &str = "text/node-kind";

fn event_pos(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		client_x as f64 - rect.left(),
		client_y as f64 - rect.top(),
	)
}

/// The scenario graph editor: node palette, toolbar and drawing surface.
///
/// The graph lives in an [`EditorState`] behind an `Rc<RefCell<…>>` shared by
/// the render loop and the input handlers; everything runs on the one wasm
/// thread, so borrows never overlap.
#[component]
pub fn ScenarioEditor(
	/// Key under which the backing store files this scenario.
	#[prop(into)] scenario_id: String,
	/// Persistence collaborator, injected by the page.
	store: Rc<dyn ScenarioStore>,
	/// Sink for user-facing feedback, injected by the page.
	#[prop(into)] on_notify: Callback<(String, Severity)>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<EditorState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let busy = RwSignal::new(false);
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());

	let notify = move |msg: String, severity: Severity| {
		on_notify.run((msg, severity));
	};

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let window: Window = web_sys::window().unwrap();

		let (w, h) = if fullscreen {
			(
				window.inner_width().unwrap().as_f64().unwrap(),
				window.inner_height().unwrap().as_f64().unwrap(),
			)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.unwrap()
			.unwrap()
			.dyn_into()
			.unwrap();
		*state_init.borrow_mut() = Some(EditorState::new(w, h));

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let win: Window = web_sys::window().unwrap();
				let (nw, nh) = (
					win.inner_width().unwrap().as_f64().unwrap(),
					win.inner_height().unwrap().as_f64().unwrap(),
				);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref s) = *state_anim.borrow() {
				render::render(s, &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = web_sys::window()
					.unwrap()
					.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let _ = canvas.focus();
		let (x, y) = event_pos(&canvas, ev.client_x(), ev.client_y());

		if let Some(ref mut s) = *state_md.borrow_mut() {
			if ev.button() == 1 || (ev.button() == 0 && (ev.shift_key() || ev.ctrl_key())) {
				ev.prevent_default();
				s.begin_pan(x, y);
				return;
			}
			if ev.button() != 0 {
				return;
			}
			let p = s.screen_to_graph(x, y);
			if let Some(id) = s.output_port_at(p) {
				s.begin_link(id, p);
			} else if let Some(id) = s.hit_test(p) {
				s.selected = Some(id);
				s.begin_drag(id, p);
			} else {
				s.selected = None;
			}
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_pos(&canvas, ev.client_x(), ev.client_y());

		if let Some(ref mut s) = *state_mm.borrow_mut() {
			let p = s.screen_to_graph(x, y);
			if s.link.from.is_some() {
				s.update_link(p);
			} else if s.drag.node.is_some() {
				s.drag_to(p);
			} else if s.pan.active {
				s.pan_to(x, y);
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_pos(&canvas, ev.client_x(), ev.client_y());

		if let Some(ref mut s) = *state_mu.borrow_mut() {
			if s.link.from.is_some() {
				let p = s.screen_to_graph(x, y);
				s.complete_link(p);
			}
			s.end_drag();
			s.end_pan();
		}
	};

	let state_dc = state.clone();
	let on_dblclick = move |ev: MouseEvent| {
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_pos(&canvas, ev.client_x(), ev.client_y());

		// Resolve the target before the prompt so the borrow does not span
		// the modal dialog.
		let target = match *state_dc.borrow() {
			Some(ref s) => {
				let p = s.screen_to_graph(x, y);
				s.hit_test(p)
					.and_then(|id| s.node(id).map(|n| (id, n.title.clone())))
			}
			None => None,
		};
		let Some((id, current)) = target else {
			return;
		};

		let entered = web_sys::window()
			.unwrap()
			.prompt_with_message_and_default("Node title:", &current)
			.unwrap_or(None);
		let Some(title) = entered else {
			return;
		};
		let title = title.trim();
		if title.is_empty() {
			return;
		}
		if let Some(ref mut s) = *state_dc.borrow_mut() {
			s.set_title(id, title.to_string());
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.cancel_link();
			s.end_drag();
			s.end_pan();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_pos(&canvas, ev.client_x(), ev.client_y());

		if let Some(ref mut s) = *state_wh.borrow_mut() {
			// 10% per wheel notch, zoom toward the cursor.
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			s.zoom_at(factor, x, y);
		}
	};

	let state_kd = state.clone();
	let on_keydown = move |ev: KeyboardEvent| {
		if let Some(ref mut s) = *state_kd.borrow_mut() {
			match ev.key().as_str() {
				"Delete" | "Backspace" => {
					ev.prevent_default();
					s.delete_selected();
				}
				"Escape" => {
					s.cancel_link();
					s.selected = None;
				}
				_ => {}
			}
		}
	};

	let state_ts = state.clone();
	let on_touchstart = move |ev: TouchEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let touches = ev.touches();

		if let Some(ref mut s) = *state_ts.borrow_mut() {
			if touches.length() == 2 {
				let (a, b) = (touches.item(0).unwrap(), touches.item(1).unwrap());
				let (dx, dy) = (
					(a.client_x() - b.client_x()) as f64,
					(a.client_y() - b.client_y()) as f64,
				);
				s.end_drag();
				s.end_pan();
				s.pinch.distance = (dx * dx + dy * dy).sqrt();
			} else if let Some(t) = touches.item(0) {
				let (x, y) = event_pos(&canvas, t.client_x(), t.client_y());
				let p = s.screen_to_graph(x, y);
				if let Some(id) = s.hit_test(p) {
					s.selected = Some(id);
					s.begin_drag(id, p);
				} else {
					s.begin_pan(x, y);
				}
			}
		}
	};

	let state_tm = state.clone();
	let on_touchmove = move |ev: TouchEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let touches = ev.touches();

		if let Some(ref mut s) = *state_tm.borrow_mut() {
			if touches.length() == 2 {
				let (a, b) = (touches.item(0).unwrap(), touches.item(1).unwrap());
				let (dx, dy) = (
					(a.client_x() - b.client_x()) as f64,
					(a.client_y() - b.client_y()) as f64,
				);
				let distance = (dx * dx + dy * dy).sqrt();
				if s.pinch.distance > 0.0 && distance > 0.0 {
					let (mx, my) = (
						(a.client_x() + b.client_x()) / 2,
						(a.client_y() + b.client_y()) / 2,
					);
					let (ax, ay) = event_pos(&canvas, mx, my);
					s.zoom_at(distance / s.pinch.distance, ax, ay);
				}
				s.pinch.distance = distance;
			} else if let Some(t) = touches.item(0) {
				let (x, y) = event_pos(&canvas, t.client_x(), t.client_y());
				if s.drag.node.is_some() {
					let p = s.screen_to_graph(x, y);
					s.drag_to(p);
				} else if s.pan.active {
					s.pan_to(x, y);
				}
			}
		}
	};

	let state_te = state.clone();
	let on_touchend = move |ev: TouchEvent| {
		if let Some(ref mut s) = *state_te.borrow_mut() {
			if ev.touches().length() < 2 {
				s.pinch.distance = 0.0;
			}
			if ev.touches().length() == 0 {
				s.end_drag();
				s.end_pan();
			}
		}
	};

	let state_drop = state.clone();
	let on_drop = move |ev: DragEvent| {
		ev.prevent_default();
		let Some(kind) = ev
			.data_transfer()
			.and_then(|dt| dt.get_data(KIND_MIME).ok())
			.and_then(|s| NodeKind::parse(&s))
		else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_pos(&canvas, ev.client_x(), ev.client_y());

		if let Some(ref mut s) = *state_drop.borrow_mut() {
			let p = s.screen_to_graph(x, y);
			let id = s.add_node(kind, p.x, p.y);
			s.selected = Some(id);
			info!("added {} node {}", kind.as_str(), id);
		}
	};

	let (state_save, store_save, id_save) = (state.clone(), store.clone(), scenario_id.clone());
	let on_save = move |_| {
		let doc = match *state_save.borrow() {
			Some(ref s) if s.nodes.is_empty() => None,
			Some(ref s) => Some(s.document()),
			None => return,
		};
		let Some(doc) = doc else {
			notify("nothing to save: the workspace is empty".to_string(), Severity::Warning);
			return;
		};
		// With the bundled synchronous store the flag flips back within the
		// same tick; it only visibly disables buttons once a store that
		// actually suspends is plugged in.
		busy.set(true);
		match store_save.save(&id_save, &doc) {
			Ok(()) => notify("scenario saved".to_string(), Severity::Success),
			Err(e) => {
				error!("save failed: {e}");
				notify(format!("save failed: {e}"), Severity::Error);
			}
		}
		busy.set(false);
	};

	let (state_load, store_load, id_load) = (state.clone(), store.clone(), scenario_id.clone());
	let on_load = move |_| {
		busy.set(true);
		match store_load.load(&id_load) {
			Ok(doc) => {
				let count = doc.nodes.len();
				if let Some(ref mut s) = *state_load.borrow_mut() {
					s.load(doc);
				}
				// Notify outside the borrow: the sink is caller-supplied and
				// may reach back into the editor.
				notify(format!("scenario loaded ({count} nodes)"), Severity::Success);
			}
			Err(e @ StoreError::NotFound(_)) => {
				notify(e.to_string(), Severity::Warning);
			}
			Err(e) => {
				error!("load failed: {e}");
				notify(format!("load failed: {e}"), Severity::Error);
			}
		}
		busy.set(false);
	};

	let state_val = state.clone();
	let on_validate = move |_| {
		let issues = match *state_val.borrow() {
			Some(ref s) if s.nodes.is_empty() => None,
			Some(ref s) => Some(s.validate()),
			None => return,
		};
		let Some(issues) = issues else {
			notify("nothing to validate: the workspace is empty".to_string(), Severity::Warning);
			return;
		};
		if issues.is_empty() {
			notify("validation passed: no issues".to_string(), Severity::Success);
		} else {
			let summary = issues
				.iter()
				.map(|i| i.to_string())
				.collect::<Vec<_>>()
				.join("; ");
			notify(format!("validation: {summary}"), Severity::Warning);
		}
	};

	let state_center = state.clone();
	let on_center = move |_| {
		if let Some(ref mut s) = *state_center.borrow_mut() {
			s.center_view();
		}
	};

	let state_clear = state.clone();
	let on_clear = move |_| {
		let confirmed = web_sys::window()
			.unwrap()
			.confirm_with_message("Delete all nodes and connections?")
			.unwrap_or(false);
		if !confirmed {
			return;
		}
		if let Some(ref mut s) = *state_clear.borrow_mut() {
			s.clear();
		}
		notify("workspace cleared".to_string(), Severity::Info);
	};

	view! {
		<div class="scenario-editor">
			<div class="editor-toolbar">
				<button on:click=on_save prop:disabled=move || busy.get()>"Save"</button>
				<button on:click=on_load prop:disabled=move || busy.get()>"Load"</button>
				<button on:click=on_validate>"Validate"</button>
				<button on:click=on_center>"Center"</button>
				<button on:click=on_clear>"Clear"</button>
			</div>
			<div class="editor-palette">
				{NodeKind::ALL
					.into_iter()
					.map(|kind| {
						view! {
							<span
								class="palette-item"
								draggable="true"
								style=format!("border-color: {};", kind.color())
								on:dragstart=move |ev: DragEvent| {
									if let Some(dt) = ev.data_transfer() {
										let _ = dt.set_data(KIND_MIME, kind.as_str());
									}
								}
							>
								{kind.icon()}
								" "
								{kind.default_title()}
							</span>
						}
					})
					.collect_view()}
			</div>
			<canvas
				node_ref=canvas_ref
				class="scenario-canvas"
				tabindex="0"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:dblclick=on_dblclick
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				on:keydown=on_keydown
				on:touchstart=on_touchstart
				on:touchmove=on_touchmove
				on:touchend=on_touchend
				on:dragover=move |ev: DragEvent| ev.prevent_default()
				on:drop=on_drop
				style="display: block; cursor: grab; outline: none;"
			/>
		</div>
	}
}
