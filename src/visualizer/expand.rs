//! Expansion planning: locating a clicked node's record and merging its
//! children into the visible graph.
//!
//! Everything here is pure. The controller computes the next visible dataset
//! first and only then touches the engine, so a failed plan leaves the
//! visible graph as it was.

use std::collections::HashSet;

use log::debug;

use super::data::{Edge, GraphData, Node};

/// Horizontal and vertical step between revealed siblings.
pub const CHILD_SPREAD: f64 = 10.0;
/// Extra downward offset of revealed children below their parent.
pub const CHILD_DROP: f64 = 50.0;

/// Depth-first search (pre-order) through nested children for `id`.
pub fn find_node<'a>(nodes: &'a [Node], id: &str) -> Option<&'a Node> {
	let mut stack: Vec<&Node> = nodes.iter().rev().collect();
	while let Some(node) = stack.pop() {
		if node.id == id {
			return Some(node);
		}
		if let Some(children) = &node.children {
			stack.extend(children.nodes.iter().rev());
		}
	}
	None
}

/// Result of merging a children graph into the visible graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Expansion {
	/// The complete next visible dataset.
	pub data: GraphData,
	/// Children added to the visible graph.
	pub admitted_nodes: usize,
	/// Child edges added to the visible graph.
	pub admitted_edges: usize,
}

/// Merges `children` into the visible graph below the node `parent_id`
/// rendered at `origin`.
///
/// Children whose id is already visible are skipped, as are edges whose
/// `(source, target)` pair is already visible or whose endpoints would not be
/// visible afterwards. Admitted nodes fan out diagonally beneath the parent.
pub fn expand(
	visible_nodes: Vec<Node>,
	visible_edges: Vec<Edge>,
	parent_id: &str,
	origin: (f64, f64),
	children: &GraphData,
) -> Expansion {
	let mut ids: HashSet<String> = visible_nodes.iter().map(|n| n.id.clone()).collect();
	let mut nodes = visible_nodes;
	for node in nodes.iter_mut().filter(|n| n.id == parent_id) {
		node.is_expanded = true;
	}

	let mut admitted_nodes = 0;
	for child in &children.nodes {
		if !ids.insert(child.id.clone()) {
			debug!("graph-unfold: child {} already visible, skipped", child.id);
			continue;
		}
		let step = admitted_nodes as f64;
		let mut node = child.clone();
		node.set_position(
			origin.0 + CHILD_SPREAD * step,
			origin.1 + CHILD_SPREAD * step + CHILD_DROP,
		);
		nodes.push(node);
		admitted_nodes += 1;
	}

	let mut pairs: HashSet<(&str, &str)> = visible_edges.iter().map(Edge::key).collect();
	let admitted: Vec<&Edge> = children
		.edges
		.iter()
		.filter(|edge| {
			if !ids.contains(&edge.source) || !ids.contains(&edge.target) {
				debug!(
					"graph-unfold: edge {} -> {} has no visible endpoint, skipped",
					edge.source, edge.target
				);
				return false;
			}
			pairs.insert(edge.key())
		})
		.collect();
	let admitted_edges = admitted.len();
	let mut edges = visible_edges;
	edges.extend(admitted.into_iter().cloned());

	Expansion {
		data: GraphData::new(nodes, edges),
		admitted_nodes,
		admitted_edges,
	}
}
