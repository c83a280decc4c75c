//! graph-unfold: node-link graph visualization with click-to-expand children.
//!
//! The [`visualizer`] module holds the engine-agnostic core: option merging,
//! the expansion planner and the controller managing a render engine's
//! lifecycle. [`components::graph_view`] hosts it in the browser on a canvas
//! engine backed by a force-directed simulation.

use std::rc::Rc;

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

use crate::visualizer::engine::NodeClickEvent;

pub mod components;
pub mod demo;
pub mod visualizer;

pub use components::graph_view::{GraphHandle, GraphView};
pub use visualizer::GraphVisualizer;
pub use visualizer::data::{Edge, GraphData, Node};
pub use visualizer::options::{NodeStylePatch, Options, OptionsPatch};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("graph-unfold: logging initialized");
}

/// Parses the JSON text of the `<script>` element with the given id.
fn load_embedded<T: DeserializeOwned>(element_id: &str) -> Option<T> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(element_id)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	let json_text = script.text().ok()?;

	match serde_json::from_str::<T>(&json_text) {
		Ok(value) => Some(value),
		Err(e) => {
			warn!("graph-unfold: failed to parse #{}: {}", element_id, e);
			None
		}
	}
}

/// Load graph data from a script element with id="graph-data".
/// Expected format: JSON with { nodes: [...], edges: [...] }, nodes may nest
/// `children` graphs of the same shape.
pub fn load_graph_data() -> Option<GraphData> {
	let data: GraphData = load_embedded("graph-data")?;
	info!(
		"graph-unfold: loaded {} nodes, {} edges",
		data.nodes.len(),
		data.edges.len()
	);
	Some(data)
}

/// Load option overrides from a script element with id="graph-options".
pub fn load_options() -> Option<OptionsPatch> {
	load_embedded("graph-options")
}

/// Main application component.
/// Shows the embedded graph (or the sample org chart) with collapse and
/// theme controls.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let graph_data = load_graph_data().unwrap_or_else(demo::org_chart);
	let graph_signal = Signal::derive(move || graph_data.clone());

	let theme = StoredValue::new(0usize);
	let mut options = load_options().unwrap_or_default();
	if options.node_style.as_ref().is_none_or(|s| s.fill.is_none()) {
		let style = options.node_style.get_or_insert_with(NodeStylePatch::default);
		style.fill = Some(demo::layer_fill(0));
	}
	options.on_node_click = Some(Rc::new(|_: &NodeClickEvent, node: &Node| {
		info!("graph-unfold: node clicked: {}", node.label);
	}));
	options.on_node_expand = Some(Rc::new(|id: &str, children: &GraphData| {
		info!("graph-unfold: node {} expanded, {} children", id, children.nodes.len());
	}));

	let handle = GraphHandle::new();
	let on_reset = move |_| handle.reset_graph();
	let on_theme = move |_| {
		theme.update_value(|t| *t = (*t + 1) % demo::palette_count());
		let fill = demo::layer_fill(theme.get_value());
		handle.update_options(OptionsPatch {
			node_style: Some(NodeStylePatch {
				fill: Some(fill),
				..NodeStylePatch::default()
			}),
			..OptionsPatch::default()
		});
	};

	view! {
		<Html attr:lang="en" attr:dir="ltr" />
		<Title text="graph-unfold" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="app">
			<header class="app-header">
				<h1>"graph-unfold"</h1>
				<p class="subtitle">"Click a team to reveal its members. Drag nodes to reposition. Scroll to zoom."</p>
				<div class="controls">
					<button class="btn btn-primary" on:click=on_reset>"Collapse all"</button>
					<button class="btn btn-secondary" on:click=on_theme>"Switch theme"</button>
				</div>
			</header>
			<main class="app-main">
				<GraphView data=graph_signal options=options handle=handle />
			</main>
		</div>
	}
}
