use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{EditorState, GRID_STEP, PORT_RADIUS};
use super::types::Vec2;

const CORNER_RADIUS: f64 = 8.0;
const INPUT_PORT_COLOR: &str = "#2196f3";
const OUTPUT_PORT_COLOR: &str = "#f44336";

/// Redraw the whole surface from the current state. Runs every animation
/// frame; no dirty tracking.
pub fn render(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#181826");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.viewport.pan.x, state.viewport.pan.y);
	let _ = ctx.scale(state.viewport.scale, state.viewport.scale);
	draw_grid(state, ctx);
	draw_connections(state, ctx);
	draw_pending_link(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

/// Fixed-spacing grid covering the visible graph rect; the viewport
/// transform carries the fractional pan offset for free.
fn draw_grid(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	let view = &state.viewport;
	let left = -view.pan.x / view.scale;
	let top = -view.pan.y / view.scale;
	let right = (state.width - view.pan.x) / view.scale;
	let bottom = (state.height - view.pan.y) / view.scale;

	ctx.set_stroke_style_str("rgba(255, 255, 255, 0.06)");
	ctx.set_line_width(1.0 / view.scale);
	ctx.begin_path();

	let mut x = (left / GRID_STEP).floor() * GRID_STEP;
	while x <= right {
		ctx.move_to(x, top);
		ctx.line_to(x, bottom);
		x += GRID_STEP;
	}
	let mut y = (top / GRID_STEP).floor() * GRID_STEP;
	while y <= bottom {
		ctx.move_to(left, y);
		ctx.line_to(right, y);
		y += GRID_STEP;
	}
	ctx.stroke();
}

/// Control points for the connection curve: horizontal tangents leaving the
/// output port and entering the input port.
fn curve_points(from: Vec2, to: Vec2) -> (Vec2, Vec2) {
	let bend = ((to.x - from.x).abs() * 0.5).max(40.0);
	(
		Vec2::new(from.x + bend, from.y),
		Vec2::new(to.x - bend, to.y),
	)
}

fn draw_curve(
	ctx: &CanvasRenderingContext2d,
	from: Vec2,
	to: Vec2,
	color: &str,
	dashed: bool,
	scale: f64,
) {
	let (cp1, cp2) = curve_points(from, to);

	ctx.set_stroke_style_str(color);
	ctx.set_line_width(2.0);
	if dashed {
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(6.0 / scale),
			&JsValue::from_f64(4.0 / scale),
		));
	}
	ctx.begin_path();
	ctx.move_to(from.x, from.y);
	ctx.bezier_curve_to(cp1.x, cp1.y, cp2.x, cp2.y, to.x, to.y);
	ctx.stroke();
	if dashed {
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}

	// Arrowhead along the terminal tangent (to - cp2).
	let (dx, dy) = (to.x - cp2.x, to.y - cp2.y);
	let len = (dx * dx + dy * dy).sqrt();
	if len < 0.001 {
		return;
	}
	let (ux, uy) = (dx / len, dy / len);
	let size = 10.0;
	let (back_x, back_y) = (to.x - ux * size, to.y - uy * size);
	let (px, py) = (-uy * size * 0.4, ux * size * 0.4);

	ctx.set_fill_style_str(color);
	ctx.begin_path();
	ctx.move_to(to.x, to.y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_connections(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	for conn in &state.connections {
		// Dangling references are filtered on delete; skip defensively here.
		let (Some(from), Some(to)) = (state.node(conn.from), state.node(conn.to)) else {
			continue;
		};
		draw_curve(
			ctx,
			from.output_port(),
			to.input_port(),
			&conn.color,
			conn.dashed,
			state.viewport.scale,
		);
	}
}

fn draw_pending_link(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	let Some(from) = state.link.from.and_then(|id| state.node(id)) else {
		return;
	};
	draw_curve(
		ctx,
		from.output_port(),
		state.link.cursor,
		from.kind.color(),
		true,
		state.viewport.scale,
	);
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, pos: Vec2, size: Vec2, r: f64) {
	let (x, y, w, h) = (pos.x, pos.y, size.x, size.y);
	ctx.begin_path();
	ctx.move_to(x + r, y);
	let _ = ctx.arc_to(x + w, y, x + w, y + h, r);
	let _ = ctx.arc_to(x + w, y + h, x, y + h, r);
	let _ = ctx.arc_to(x, y + h, x, y, r);
	let _ = ctx.arc_to(x, y, x + w, y, r);
	ctx.close_path();
}

fn draw_nodes(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");

	for node in &state.nodes {
		let selected = state.selected == Some(node.id);
		if !node.properties.enabled {
			ctx.set_global_alpha(0.5);
		}

		rounded_rect(ctx, node.position, node.size, CORNER_RADIUS);
		if selected {
			ctx.set_shadow_color("rgba(0, 0, 0, 0.6)");
			ctx.set_shadow_blur(12.0);
		}
		ctx.set_fill_style_str(node.kind.color());
		ctx.fill();
		ctx.set_shadow_blur(0.0);

		if selected {
			ctx.set_stroke_style_str("#ffffff");
			ctx.set_line_width(3.0);
		} else {
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.35)");
			ctx.set_line_width(1.5);
		}
		ctx.stroke();

		let center = node.center();
		ctx.set_fill_style_str("#ffffff");
		ctx.set_font("20px sans-serif");
		let _ = ctx.fill_text(node.kind.icon(), center.x, node.position.y + 28.0);
		ctx.set_font("12px sans-serif");
		let _ = ctx.fill_text(&node.title, center.x, node.position.y + node.size.y - 22.0);

		draw_port(ctx, node.input_port(), INPUT_PORT_COLOR);
		draw_port(ctx, node.output_port(), OUTPUT_PORT_COLOR);

		ctx.set_global_alpha(1.0);
	}
}

fn draw_port(ctx: &CanvasRenderingContext2d, at: Vec2, color: &str) {
	ctx.begin_path();
	let _ = ctx.arc(at.x, at.y, PORT_RADIUS, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(color);
	ctx.fill();
	ctx.set_stroke_style_str("rgba(255, 255, 255, 0.8)");
	ctx.set_line_width(1.0);
	ctx.stroke();
}
