//! Sample org chart shown when the page embeds no graph data.

use crate::visualizer::data::{Edge, GraphData, Node};
use crate::visualizer::options::NodeAttr;

/// Node fills per theme: leader, team, then members ending in A, B and C.
const PALETTES: [[&str; 5]; 2] = [
	["#b1c8a7", "#c5dcb4", "#d9e7c4", "#e2f0d9", "#f0f7e0"],
	["#a99fd5", "#B098CD", "#d1c6e7", "#D7C9DE", "#C4B0D5"],
];

/// Number of built-in themes.
pub fn palette_count() -> usize {
	PALETTES.len()
}

/// Fill accessor coloring nodes by layer, and members by label suffix.
pub fn layer_fill(theme: usize) -> NodeAttr<String> {
	let palette = PALETTES[theme % PALETTES.len()];
	NodeAttr::computed(move |node| {
		let slot = match node.layer {
			Some(2) => 1,
			Some(3) if node.label.ends_with('A') => 2,
			Some(3) if node.label.ends_with('B') => 3,
			Some(3) if node.label.ends_with('C') => 4,
			_ => 0,
		};
		palette[slot].to_string()
	})
}

fn member(id: &str, label: &str) -> Node {
	let mut node = Node::new(id, label).with_layer(3);
	node.size = Some(30.0);
	node
}

fn team(id: &str, label: &str, members: &[(&str, &str)]) -> Node {
	let mut node = Node::new(id, label).with_layer(2).with_children(GraphData::new(
		members.iter().map(|(m, l)| member(m, l)).collect(),
		members.iter().map(|(m, _)| Edge::new(id, *m)).collect(),
	));
	node.size = Some(30.0);
	node
}

/// One leader with three expandable teams.
pub fn org_chart() -> GraphData {
	let mut leader = Node::new("L1_1", "Leader A").with_layer(1);
	leader.size = Some(36.0);
	GraphData::new(
		vec![
			leader,
			team(
				"L2_1",
				"Team A",
				&[("L3_1", "Member A"), ("L3_2", "Member B"), ("L3_3", "Member C")],
			),
			team("L2_2", "Team B", &[("L3_4", "Member A"), ("L3_5", "Member B")]),
			team(
				"L2_3",
				"Team C",
				&[("L3_6", "Member A"), ("L3_7", "Member B"), ("L3_8", "Member C")],
			),
		],
		vec![
			Edge::new("L1_1", "L2_1"),
			Edge::new("L1_1", "L2_2"),
			Edge::new("L1_1", "L2_3"),
		],
	)
}
