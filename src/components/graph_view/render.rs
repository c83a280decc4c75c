//! Canvas drawing for the graph scene.
//!
//! Rendering runs in passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Edges (world space)
//! 3. Nodes, the selection ring, then labels on top

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::scene::{NodeInfo, Scene};
use super::theme::{CanvasTheme, parse_color};
use crate::visualizer::options::{EdgeStyle, NodeStyle};

/// Renders the complete scene to the canvas.
pub fn render(
	scene: &Scene,
	ctx: &CanvasRenderingContext2d,
	theme: &CanvasTheme,
) -> Result<(), JsValue> {
	ctx.set_fill_style_str(&theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, scene.width, scene.height);

	ctx.save();
	ctx.translate(scene.transform.x, scene.transform.y)?;
	ctx.scale(scene.transform.k, scene.transform.k)?;

	draw_edges(scene, ctx, theme, &scene.edge_style)?;
	draw_nodes(scene, ctx, theme)?;
	draw_labels(scene, ctx, theme, &scene.node_style);

	ctx.restore();
	Ok(())
}

fn draw_edges(
	scene: &Scene,
	ctx: &CanvasRenderingContext2d,
	theme: &CanvasTheme,
	style: &EdgeStyle,
) -> Result<(), JsValue> {
	let width = style
		.extra
		.get("lineWidth")
		.and_then(|v| v.as_f64())
		.unwrap_or(theme.edge_width);
	let dash = js_sys::Array::new();
	if let Some(pattern) = style.extra.get("lineDash").and_then(|v| v.as_array()) {
		for step in pattern.iter().filter_map(|v| v.as_f64()) {
			dash.push(&JsValue::from_f64(step));
		}
	}

	ctx.set_stroke_style_str(&style.stroke);
	ctx.set_line_width(width / scene.transform.k.max(0.1));
	ctx.set_line_dash(&dash)?;
	scene.graph.visit_edges(|n1, n2, _| {
		let (x1, y1, x2, y2) = (n1.x() as f64, n1.y() as f64, n2.x() as f64, n2.y() as f64);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			return;
		}
		let (ux, uy) = (dx / dist, dy / dist);
		let (r1, r2) = (n1.data.user_data.radius, n2.data.user_data.radius);
		ctx.begin_path();
		ctx.move_to(x1 + ux * r1, y1 + uy * r1);
		ctx.line_to(x2 - ux * r2, y2 - uy * r2);
		ctx.stroke();
	});
	ctx.set_line_dash(&js_sys::Array::new())?;
	Ok(())
}

fn draw_nodes(scene: &Scene, ctx: &CanvasRenderingContext2d, theme: &CanvasTheme) -> Result<(), JsValue> {
	let mut result = Ok(());
	scene.graph.visit_nodes(|node| {
		let (x, y) = (node.x() as f64, node.y() as f64);
		let info = &node.data.user_data;
		if let Err(e) = draw_node(ctx, theme, x, y, info) {
			result = Err(e);
		}
		if scene.selected.as_deref() == Some(info.id.as_str()) {
			ctx.begin_path();
			let _ = ctx.arc(x, y, info.radius + 4.0, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&theme.selection.to_css());
			ctx.set_line_width(2.0 / scene.transform.k.max(0.1));
			ctx.stroke();
		}
	});
	result
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	theme: &CanvasTheme,
	x: f64,
	y: f64,
	info: &NodeInfo,
) -> Result<(), JsValue> {
	let radius = info.radius;
	ctx.begin_path();
	ctx.arc(x, y, radius, 0.0, 2.0 * PI)?;
	if theme.node_gradient {
		let base = parse_color(&info.fill);
		let gradient =
			ctx.create_radial_gradient(x - radius * 0.3, y - radius * 0.3, 0.0, x, y, radius)?;
		gradient.add_color_stop(0.0, &base.lighten(0.4).to_css())?;
		gradient.add_color_stop(0.7, &base.to_css())?;
		gradient.add_color_stop(1.0, &base.darken(0.2).to_css())?;
		#[allow(deprecated)]
		ctx.set_fill_style(&gradient);
	} else {
		ctx.set_fill_style_str(&info.fill);
	}
	ctx.fill();

	ctx.set_stroke_style_str(&theme.node_border.to_css());
	ctx.set_line_width(1.0);
	ctx.stroke();
	Ok(())
}

/// Text anchor and offset for a label placement keyword.
fn label_anchor(placement: &str, radius: f64) -> (&'static str, &'static str, f64, f64) {
	match placement {
		"top" => ("center", "bottom", 0.0, -radius - 4.0),
		"bottom" => ("center", "top", 0.0, radius + 4.0),
		"left" => ("right", "middle", -radius - 4.0, 0.0),
		"right" => ("left", "middle", radius + 4.0, 0.0),
		_ => ("center", "middle", 0.0, 0.0),
	}
}

fn draw_labels(
	scene: &Scene,
	ctx: &CanvasRenderingContext2d,
	theme: &CanvasTheme,
	node_style: &NodeStyle,
) {
	ctx.set_font(&theme.label_font);
	ctx.set_fill_style_str(&node_style.label_fill);
	scene.graph.visit_nodes(|node| {
		let info = &node.data.user_data;
		if info.label.is_empty() {
			return;
		}
		let (align, baseline, dx, dy) = label_anchor(&node_style.label_placement, info.radius);
		ctx.set_text_align(align);
		ctx.set_text_baseline(baseline);
		let _ = ctx.fill_text(&info.label, node.x() as f64 + dx, node.y() as f64 + dy);
	});
}
