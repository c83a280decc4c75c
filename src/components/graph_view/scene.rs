//! Simulation state behind the canvas engine.
//!
//! Wraps the `force_graph` physics simulation with the engine's dataset, the
//! style accessors resolved per node, the pan/zoom transform and pointer
//! interaction tracking. `force_graph` supplies charge repulsion; link
//! distance, radial layering, collision and centering are applied on top as
//! small position corrections after each step. These only approximate the
//! configured forces, enough to keep layers and links readable.

use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use crate::visualizer::data::{Edge, GraphData, Node};
use crate::visualizer::engine::{Easing, ZoomAnimation};
use crate::visualizer::options::{EdgeStyle, LayoutOptions, NodeStyle};
use crate::visualizer::toolbar::{MAX_ZOOM, MIN_ZOOM};

/// Frames the layout keeps running after it is (re)started.
const SETTLE_TICKS: u32 = 300;
/// Scales `many_body` strength into `force_graph` charge.
const CHARGE_SCALE: f64 = 2.5;
/// Upper bound on the share of link length error corrected per tick.
const LINK_RATE: f64 = 0.1;
/// Pointer travel (screen px) below which a press counts as a click.
const CLICK_SLOP: f64 = 3.0;

/// Per-node display and layout values resolved from the style accessors.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	/// Node id.
	pub id: String,
	/// Resolved label text.
	pub label: String,
	/// Resolved CSS fill.
	pub fill: String,
	/// Half the resolved size.
	pub radius: f64,
	radial_strength: f64,
	radial_radius: f64,
}

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal pan in screen pixels.
	pub x: f64,
	/// Vertical pan in screen pixels.
	pub y: f64,
	/// Zoom factor (1.0 = 100%).
	pub k: f64,
}

#[derive(Clone, Debug)]
struct Link {
	source: DefaultNodeIdx,
	target: DefaultNodeIdx,
	distance: f64,
	strength: f64,
}

#[derive(Clone, Debug)]
enum Pointer {
	Idle,
	Node {
		idx: DefaultNodeIdx,
		start: (f64, f64),
		node_start: (f32, f32),
		moved: bool,
	},
	Pan {
		start: (f64, f64),
		transform_start: (f64, f64),
		moved: bool,
	},
}

#[derive(Clone, Copy, Debug)]
struct ZoomTween {
	from: f64,
	to: f64,
	start_ms: f64,
	duration_ms: f64,
	easing: Easing,
}

/// A press and release on the same node without dragging it.
#[derive(Clone, Debug, PartialEq)]
pub struct Click {
	/// Clicked node.
	pub id: String,
	/// Node position in graph coordinates.
	pub x: f64,
	/// See `x`.
	pub y: f64,
}

/// Which pointer interactions are enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct Interactions {
	/// `drag-element-force`
	pub drag_nodes: bool,
	/// Keep dragged nodes pinned where they were dropped.
	pub pin_dropped: bool,
	/// `drag-canvas`
	pub pan: bool,
	/// `click-select`
	pub select: bool,
}

/// Everything the canvas engine draws, plus the layout that moves it.
pub struct Scene {
	/// Simulation nodes carry [`NodeInfo`]; edges carry nothing.
	pub graph: ForceGraph<NodeInfo, ()>,
	data: GraphData,
	index: HashMap<String, DefaultNodeIdx>,
	links: Vec<Link>,
	/// Node style the per-node values are resolved from.
	pub node_style: NodeStyle,
	/// Edge style used when drawing.
	pub edge_style: EdgeStyle,
	layout: LayoutOptions,
	/// Enabled pointer interactions.
	pub interactions: Interactions,
	/// Current pan and zoom.
	pub transform: ViewTransform,
	/// Viewport width in screen pixels.
	pub width: f64,
	/// Viewport height in screen pixels.
	pub height: f64,
	/// Whether `tick` still advances the simulation.
	pub layout_running: bool,
	settle_ticks: u32,
	/// Node highlighted by `click-select`.
	pub selected: Option<String>,
	pointer: Pointer,
	zoom_tween: Option<ZoomTween>,
}

impl Scene {
	/// An empty scene with the given styles, layout and interactions.
	pub fn new(
		node_style: NodeStyle,
		edge_style: EdgeStyle,
		layout: LayoutOptions,
		interactions: Interactions,
		width: f64,
		height: f64,
	) -> Self {
		Self {
			graph: ForceGraph::new(simulation_parameters(&layout, &GraphData::default())),
			data: GraphData::default(),
			index: HashMap::new(),
			links: Vec::new(),
			node_style,
			edge_style,
			layout,
			interactions,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			width,
			height,
			layout_running: false,
			settle_ticks: 0,
			selected: None,
			pointer: Pointer::Idle,
			zoom_tween: None,
		}
	}

	/// Replaces the dataset. Nodes keep their style-hint position, else the
	/// position they already had, else start on a ring for their layer.
	pub fn set_data(&mut self, data: GraphData) {
		let previous = self.positions();
		let mut graph = ForceGraph::new(simulation_parameters(&self.layout, &data));
		let mut index = HashMap::new();
		let count = data.nodes.len().max(1) as f64;

		for (i, node) in data.nodes.iter().enumerate() {
			let radial_radius = self.layout.radial.radius.resolve(node);
			let (x, y) = node
				.position()
				.or_else(|| previous.get(&node.id).copied())
				.unwrap_or_else(|| {
					let angle = i as f64 * 2.0 * PI / count;
					(
						self.layout.radial.x + radial_radius * angle.cos(),
						self.layout.radial.y + radial_radius * angle.sin(),
					)
				});
			let idx = graph.add_node(NodeData {
				x: x as f32,
				y: y as f32,
				mass: 10.0,
				is_anchor: node.style.as_ref().and_then(|s| s.fixed).unwrap_or(false),
				user_data: NodeInfo {
					id: node.id.clone(),
					label: self.node_style.label_text.resolve(node),
					fill: self.node_style.fill.resolve(node),
					radius: self.node_style.size.resolve(node) / 2.0,
					radial_strength: self.layout.radial.strength.resolve(node),
					radial_radius,
				},
			});
			index.insert(node.id.clone(), idx);
		}

		let records: HashMap<&str, &Node> = data.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
		let mut links = Vec::new();
		for edge in &data.edges {
			let (Some(&source), Some(&target)) = (index.get(&edge.source), index.get(&edge.target))
			else {
				continue;
			};
			graph.add_edge(source, target, EdgeData::default());
			let (s, t) = (records.get(edge.source.as_str()).copied(), records.get(edge.target.as_str()).copied());
			links.push(Link {
				source,
				target,
				distance: self.layout.link.distance.resolve(s, t),
				strength: self.layout.link.strength.resolve(s, t),
			});
		}

		self.graph = graph;
		self.index = index;
		self.links = links;
		self.data = data;
		self.pointer = Pointer::Idle;
		if self.selected.as_ref().is_some_and(|id| !self.index.contains_key(id)) {
			self.selected = None;
		}
	}

	/// Drops the dataset and restarts the simulation empty.
	pub fn clear(&mut self) {
		self.graph = ForceGraph::new(simulation_parameters(&self.layout, &GraphData::default()));
		self.data = GraphData::default();
		self.index.clear();
		self.links.clear();
		self.pointer = Pointer::Idle;
		self.selected = None;
		self.layout_running = false;
	}

	/// Runs the layout for another settle period.
	pub fn start_layout(&mut self) {
		self.layout_running = true;
		self.settle_ticks = SETTLE_TICKS;
	}

	/// Freezes nodes where they are.
	pub fn stop_layout(&mut self) {
		self.layout_running = false;
		self.settle_ticks = 0;
	}

	/// Advances the layout by `dt` seconds and any zoom animation to `now_ms`.
	pub fn tick(&mut self, dt: f32, now_ms: f64) {
		if self.layout_running {
			self.graph.update(dt);
			self.apply_corrections();
			self.settle_ticks = self.settle_ticks.saturating_sub(1);
			if self.settle_ticks == 0 {
				self.layout_running = false;
			}
		}

		if let Some(tween) = self.zoom_tween {
			let t = if tween.duration_ms <= 0.0 {
				1.0
			} else {
				(now_ms - tween.start_ms) / tween.duration_ms
			};
			let k = tween.from + (tween.to - tween.from) * tween.easing.apply(t);
			self.zoom_at(k, (self.width / 2.0, self.height / 2.0));
			if t >= 1.0 {
				self.zoom_tween = None;
			}
		}
	}

	fn apply_corrections(&mut self) {
		let mut positions: HashMap<DefaultNodeIdx, (f64, f64, f64)> = HashMap::new();
		self.graph.visit_nodes(|node| {
			positions.insert(node.index(), (node.x() as f64, node.y() as f64, node.data.user_data.radius));
		});
		let mut deltas: HashMap<DefaultNodeIdx, (f64, f64)> = HashMap::new();
		let mut push = |idx: DefaultNodeIdx, dx: f64, dy: f64| {
			let d = deltas.entry(idx).or_insert((0.0, 0.0));
			d.0 += dx;
			d.1 += dy;
		};

		for link in &self.links {
			let (Some(a), Some(b)) = (positions.get(&link.source), positions.get(&link.target)) else {
				continue;
			};
			let (dx, dy) = (b.0 - a.0, b.1 - a.1);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < 1e-3 {
				continue;
			}
			let f = (dist - link.distance) / dist * link.strength * LINK_RATE * 0.5;
			push(link.source, dx * f, dy * f);
			push(link.target, -dx * f, -dy * f);
		}

		let (ox, oy) = (self.layout.radial.x, self.layout.radial.y);
		self.graph.visit_nodes(|node| {
			let info = &node.data.user_data;
			if info.radial_strength == 0.0 {
				return;
			}
			let (dx, dy) = (node.x() as f64 - ox, node.y() as f64 - oy);
			let r = (dx * dx + dy * dy).sqrt();
			if r < 1e-3 {
				return;
			}
			let f = (info.radial_radius - r) / r * info.radial_strength;
			push(node.index(), dx * f, dy * f);
		});

		let collide = &self.layout.collide;
		if collide.strength > 0.0 && collide.radius > 0.0 {
			let nodes: Vec<(DefaultNodeIdx, (f64, f64, f64))> =
				positions.iter().map(|(idx, p)| (*idx, *p)).collect();
			let min = collide.radius * 2.0;
			for (i, (a_idx, a)) in nodes.iter().enumerate() {
				for (b_idx, b) in &nodes[i + 1..] {
					let (dx, dy) = (b.0 - a.0, b.1 - a.1);
					let dist = (dx * dx + dy * dy).sqrt();
					if dist >= min || dist < 1e-3 {
						continue;
					}
					let f = (min - dist) / dist * collide.strength * 0.5;
					push(*a_idx, -dx * f, -dy * f);
					push(*b_idx, dx * f, dy * f);
				}
			}
		}

		let center = self.layout.center.strength;
		if center > 0.0 && !positions.is_empty() {
			let n = positions.len() as f64;
			let (sx, sy) = positions.values().fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
			let (shift_x, shift_y) = ((ox - sx / n) * center, (oy - sy / n) * center);
			for idx in positions.keys() {
				push(*idx, shift_x, shift_y);
			}
		}

		self.graph.visit_nodes_mut(|node| {
			if node.data.is_anchor {
				return;
			}
			if let Some((dx, dy)) = deltas.get(&node.index()) {
				node.data.x += *dx as f32;
				node.data.y += *dy as f32;
			}
		});
	}

	fn positions(&self) -> HashMap<String, (f64, f64)> {
		let mut positions = HashMap::new();
		self.graph.visit_nodes(|node| {
			positions.insert(node.data.user_data.id.clone(), (node.x() as f64, node.y() as f64));
		});
		positions
	}

	/// Dataset records with their current simulated positions written into the
	/// style hints.
	pub fn nodes(&self) -> Vec<Node> {
		let positions = self.positions();
		self.data
			.nodes
			.iter()
			.map(|node| {
				let mut node = node.clone();
				if let Some(&(x, y)) = positions.get(&node.id) {
					node.set_position(x, y);
				}
				node
			})
			.collect()
	}

	/// Record of node `id` with its current position.
	pub fn node(&self, id: &str) -> Option<Node> {
		let idx = *self.index.get(id)?;
		let mut node = self.data.nodes.iter().find(|n| n.id == id)?.clone();
		self.graph.visit_nodes(|n| {
			if n.index() == idx {
				node.set_position(n.x() as f64, n.y() as f64);
			}
		});
		Some(node)
	}

	/// Edges as given.
	pub fn edges(&self) -> &[Edge] {
		&self.data.edges
	}

	/// Updates the viewport size.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	/// Converts screen coordinates to graph coordinates.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under the screen point, if any.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			if (dx * dx + dy * dy).sqrt() < node.data.user_data.radius.max(4.0) {
				found = Some(node.index());
			}
		});
		found
	}

	/// Sets the zoom factor, keeping the screen point `anchor` fixed.
	pub fn zoom_at(&mut self, k: f64, anchor: (f64, f64)) {
		let k = k.clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = k / self.transform.k;
		self.transform.x = anchor.0 - (anchor.0 - self.transform.x) * ratio;
		self.transform.y = anchor.1 - (anchor.1 - self.transform.y) * ratio;
		self.transform.k = k;
	}

	/// Zooms about the viewport center, tweening when `animation` has a
	/// duration.
	pub fn zoom_to(&mut self, level: f64, animation: ZoomAnimation, now_ms: f64) {
		if animation.duration_ms == 0 {
			self.zoom_tween = None;
			self.zoom_at(level, (self.width / 2.0, self.height / 2.0));
			return;
		}
		self.zoom_tween = Some(ZoomTween {
			from: self.transform.k,
			to: level.clamp(MIN_ZOOM, MAX_ZOOM),
			start_ms: now_ms,
			duration_ms: animation.duration_ms as f64,
			easing: animation.easing,
		});
	}

	/// Zoom level the view is at or animating towards.
	pub fn zoom(&self) -> f64 {
		self.zoom_tween.map_or(self.transform.k, |t| t.to)
	}

	/// Translates the view so the graph's bounding box is centered.
	pub fn fit_center(&mut self) {
		let mut bounds: Option<(f64, f64, f64, f64)> = None;
		self.graph.visit_nodes(|node| {
			let (x, y, r) = (node.x() as f64, node.y() as f64, node.data.user_data.radius);
			bounds = Some(match bounds {
				None => (x - r, y - r, x + r, y + r),
				Some((x0, y0, x1, y1)) => (x0.min(x - r), y0.min(y - r), x1.max(x + r), y1.max(y + r)),
			});
		});
		let Some((x0, y0, x1, y1)) = bounds else {
			return;
		};
		let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
		self.transform.x = self.width / 2.0 - cx * self.transform.k;
		self.transform.y = self.height / 2.0 - cy * self.transform.k;
	}

	/// Starts a node drag, or a pan when the press misses every node.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		match self.node_at_position(sx, sy) {
			Some(idx) => {
				let mut node_start = (0.0, 0.0);
				self.graph.visit_nodes(|node| {
					if node.index() == idx {
						node_start = (node.x(), node.y());
					}
				});
				self.pointer = Pointer::Node {
					idx,
					start: (sx, sy),
					node_start,
					moved: false,
				};
			}
			None => {
				self.pointer = Pointer::Pan {
					start: (sx, sy),
					transform_start: (self.transform.x, self.transform.y),
					moved: false,
				};
			}
		}
	}

	/// Follows an active drag or pan.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		let k = self.transform.k;
		let drag_nodes = self.interactions.drag_nodes;
		let pan = self.interactions.pan;
		let mut reheat = false;
		match &mut self.pointer {
			Pointer::Idle => {}
			Pointer::Node {
				idx,
				start,
				node_start,
				moved,
			} => {
				let (dx, dy) = (sx - start.0, sy - start.1);
				if !*moved && (dx * dx + dy * dy).sqrt() < CLICK_SLOP {
					return;
				}
				*moved = true;
				if !drag_nodes {
					return;
				}
				let (idx, (nx, ny)) = (*idx, (node_start.0 + (dx / k) as f32, node_start.1 + (dy / k) as f32));
				self.graph.visit_nodes_mut(|node| {
					if node.index() == idx {
						node.data.x = nx;
						node.data.y = ny;
						node.data.is_anchor = true;
					}
				});
				reheat = true;
			}
			Pointer::Pan {
				start,
				transform_start,
				moved,
			} => {
				let (dx, dy) = (sx - start.0, sy - start.1);
				if !*moved && (dx * dx + dy * dy).sqrt() < CLICK_SLOP {
					return;
				}
				*moved = true;
				if pan {
					self.transform.x = transform_start.0 + dx;
					self.transform.y = transform_start.1 + dy;
				}
			}
		}
		if reheat && !self.layout_running {
			self.start_layout();
		}
	}

	/// Ends the current press. Returns the click if the press neither dragged
	/// nor left its node.
	pub fn pointer_up(&mut self) -> Option<Click> {
		let pointer = std::mem::replace(&mut self.pointer, Pointer::Idle);
		let Pointer::Node { idx, moved, .. } = pointer else {
			return None;
		};
		if moved {
			if self.interactions.drag_nodes && !self.interactions.pin_dropped {
				self.graph.visit_nodes_mut(|node| {
					if node.index() == idx {
						node.data.is_anchor = false;
					}
				});
			}
			return None;
		}

		let mut click = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				click = Some(Click {
					id: node.data.user_data.id.clone(),
					x: node.x() as f64,
					y: node.y() as f64,
				});
			}
		});
		if self.interactions.select {
			self.selected = click.as_ref().map(|c| c.id.clone());
		}
		click
	}

	/// Abandons the active gesture without a click.
	pub fn pointer_cancel(&mut self) {
		self.pointer = Pointer::Idle;
	}
}

fn simulation_parameters(layout: &LayoutOptions, data: &GraphData) -> SimulationParameters {
	let charge = if data.nodes.is_empty() {
		60.0
	} else {
		data.nodes
			.iter()
			.map(|n| -layout.many_body.strength.resolve(n))
			.sum::<f64>()
			/ data.nodes.len() as f64
	};
	SimulationParameters {
		force_charge: (charge.max(0.0) * CHARGE_SCALE) as f32,
		force_spring: 0.0,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	}
}
