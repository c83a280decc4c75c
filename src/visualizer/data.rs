//! Graph data structures handed to the visualizer by the host.
//!
//! Nodes may carry a nested `children` graph that stays hidden until the node
//! is expanded. Unknown fields are kept in `extra` and travel through to the
//! render engine untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Position and pinning hints for a node.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleHints {
	/// Initial or last rendered x.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub x: Option<f64>,
	/// Initial or last rendered y.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub y: Option<f64>,
	/// Pin the node in place once laid out.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fixed: Option<bool>,
	/// Draw order; higher is on top.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub z_index: Option<i32>,
	/// Any other hint.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// A node in the graph.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Node {
	/// Unique identifier. Edges reference nodes by this id.
	pub id: String,
	/// Display label.
	#[serde(default)]
	pub label: String,
	/// Grouping used by style and layout accessors (1 = root ring).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub layer: Option<i64>,
	/// Radius hint.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size: Option<f64>,
	/// CSS color override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	/// Substructure revealed when the node is clicked.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub children: Option<GraphData>,
	/// Position and pinning hints.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub style: Option<StyleHints>,
	/// Set once the node's children have been merged into the visible graph.
	#[serde(rename = "isExpanded", default, skip_serializing_if = "is_false")]
	pub is_expanded: bool,
	/// Unknown fields, kept verbatim.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

fn is_false(b: &bool) -> bool {
	!*b
}

impl Node {
	/// A plain node with no layer, style or children.
	pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			..Self::default()
		}
	}

	/// Sets the layer.
	pub fn with_layer(mut self, layer: i64) -> Self {
		self.layer = Some(layer);
		self
	}

	/// Attaches a collapsed children graph.
	pub fn with_children(mut self, children: GraphData) -> Self {
		self.children = Some(children);
		self
	}

	/// Rendered position hint, if both coordinates are known.
	pub fn position(&self) -> Option<(f64, f64)> {
		let style = self.style.as_ref()?;
		Some((style.x?, style.y?))
	}

	/// Sets the `x`/`y` hints, keeping any other style hints.
	pub fn set_position(&mut self, x: f64, y: f64) {
		let style = self.style.get_or_insert_with(StyleHints::default);
		style.x = Some(x);
		style.y = Some(y);
	}
}

/// A directed edge between two nodes.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Edge {
	/// Source node ID.
	pub source: String,
	/// Target node ID.
	pub target: String,
	/// Unknown fields such as `lineWidth`, kept verbatim.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl Edge {
	/// An edge with no extra keys.
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			extra: Map::new(),
		}
	}

	/// The `(source, target)` pair used for duplicate suppression.
	pub fn key(&self) -> (&str, &str) {
		(&self.source, &self.target)
	}
}

/// Complete graph data: nodes and edges.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct GraphData {
	/// Top-level nodes.
	#[serde(default)]
	pub nodes: Vec<Node>,
	/// Edges between top-level nodes.
	#[serde(default)]
	pub edges: Vec<Edge>,
}

impl GraphData {
	/// Wraps nodes and edges.
	pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
		Self { nodes, edges }
	}

	/// Copy of this graph with every expansion marker cleared, nested
	/// children included.
	pub fn collapsed(&self) -> Self {
		let mut copy = self.clone();
		let mut stack: Vec<&mut Node> = copy.nodes.iter_mut().collect();
		while let Some(node) = stack.pop() {
			node.is_expanded = false;
			if let Some(children) = node.children.as_mut() {
				stack.extend(children.nodes.iter_mut());
			}
		}
		copy
	}
}
