//! Recording render engine used to drive the visualizer in tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use graph_unfold::visualizer::data::{Edge, GraphData, Node};
use graph_unfold::visualizer::engine::{
	EngineConfig, EngineError, EngineFactory, EventHandler, EventKind, GraphEvent,
	NodeClickEvent, Plugin, RenderEngine, ToolbarPlugin, ViewCommand, ZoomAnimation,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
	SetData,
	Render,
	Clear,
	StopLayout,
	ZoomTo(f64),
	FitCenter,
	Destroy,
}

#[derive(Default)]
pub struct SpyState {
	pub created: usize,
	pub destroyed: usize,
	pub fail_create: bool,
	pub fail_ops: HashSet<&'static str>,
	pub nodes: Vec<Node>,
	pub edges: Vec<Edge>,
	pub zoom: f64,
	pub calls: Vec<Call>,
	pub last_config: Option<EngineConfig<&'static str>>,
	generation: usize,
	handlers: Vec<(EventKind, EventHandler)>,
}

/// Shared view into whatever engine the visualizer currently owns.
#[derive(Clone, Default)]
pub struct Spy {
	state: Rc<RefCell<SpyState>>,
}

impl Spy {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with<R>(&self, f: impl FnOnce(&mut SpyState) -> R) -> R {
		f(&mut self.state.borrow_mut())
	}

	pub fn fail(&self, op: &'static str) {
		self.with(|s| s.fail_ops.insert(op));
	}

	pub fn heal(&self) {
		self.with(|s| {
			s.fail_ops.clear();
			s.fail_create = false;
		});
	}

	pub fn node_ids(&self) -> Vec<String> {
		self.with(|s| s.nodes.iter().map(|n| n.id.clone()).collect())
	}

	pub fn edge_pairs(&self) -> Vec<(String, String)> {
		self.with(|s| {
			s.edges
				.iter()
				.map(|e| (e.source.clone(), e.target.clone()))
				.collect()
		})
	}

	pub fn node(&self, id: &str) -> Option<Node> {
		self.with(|s| s.nodes.iter().find(|n| n.id == id).cloned())
	}

	pub fn count(&self, call: &Call) -> usize {
		self.with(|s| s.calls.iter().filter(|c| *c == call).count())
	}

	pub fn clear_calls(&self) {
		self.with(|s| s.calls.clear());
	}

	pub fn toolbar(&self) -> Option<ToolbarPlugin> {
		self.with(|s| {
			s.last_config.as_ref().and_then(|config| {
				config.plugins.iter().map(|p| match p {
					Plugin::Toolbar(toolbar) => toolbar.clone(),
				}).next()
			})
		})
	}

	/// Simulates a toolbar button press on the live engine.
	pub fn press(&self, id: &str) {
		if let Some(toolbar) = self.toolbar() {
			(toolbar.on_click)(id);
		}
	}

	/// Simulates a click on the rendered node `id` at its current position.
	pub fn click(&self, id: &str) {
		let (x, y) = self
			.node(id)
			.and_then(|n| n.position())
			.unwrap_or((0.0, 0.0));
		self.emit(GraphEvent::NodeClick(NodeClickEvent {
			id: id.to_string(),
			x,
			y,
		}));
	}

	/// Delivers `event` to subscribers without holding any borrow, then
	/// applies returned commands.
	pub fn emit(&self, event: GraphEvent) -> Vec<ViewCommand> {
		let (generation, mut handlers) =
			self.with(|s| (s.generation, std::mem::take(&mut s.handlers)));
		let mut commands = Vec::new();
		for (kind, handler) in handlers.iter_mut() {
			if *kind == event.kind() {
				commands.extend(handler(&event));
			}
		}
		self.with(|s| {
			if s.generation == generation {
				handlers.append(&mut s.handlers);
				s.handlers = handlers;
			}
			for command in &commands {
				match command {
					ViewCommand::FitCenter => s.calls.push(Call::FitCenter),
				}
			}
		});
		commands
	}

	fn op(&self, op: &'static str, call: Call) -> Result<(), EngineError> {
		self.with(|s| {
			if s.fail_ops.contains(op) {
				return Err(EngineError::call(op, "injected failure"));
			}
			s.calls.push(call);
			Ok(())
		})
	}
}

pub struct MockFactory {
	pub spy: Spy,
}

impl MockFactory {
	pub fn new(spy: &Spy) -> Self {
		Self {
			spy: spy.clone(),
		}
	}
}

impl EngineFactory for MockFactory {
	type Container = &'static str;
	type Engine = MockEngine;

	fn create(&self, config: EngineConfig<&'static str>) -> Result<MockEngine, EngineError> {
		self.spy.with(|s| {
			if s.fail_create {
				return Err(EngineError::Construction("injected failure".to_string()));
			}
			s.created += 1;
			s.generation += 1;
			s.handlers.clear();
			s.nodes.clear();
			s.edges.clear();
			s.zoom = 1.0;
			s.last_config = Some(config);
			Ok(())
		})?;
		Ok(MockEngine {
			spy: self.spy.clone(),
		})
	}
}

pub struct MockEngine {
	spy: Spy,
}

impl RenderEngine for MockEngine {
	fn set_data(&mut self, data: GraphData) -> Result<(), EngineError> {
		self.spy.op("set_data", Call::SetData)?;
		self.spy.with(|s| {
			s.nodes = data.nodes;
			s.edges = data.edges;
		});
		Ok(())
	}

	fn render(&mut self) -> Result<(), EngineError> {
		self.spy.emit(GraphEvent::BeforeRender);
		self.spy.op("render", Call::Render)
	}

	fn clear(&mut self) -> Result<(), EngineError> {
		self.spy.op("clear", Call::Clear)?;
		self.spy.with(|s| {
			s.nodes.clear();
			s.edges.clear();
		});
		Ok(())
	}

	fn stop_layout(&mut self) -> Result<(), EngineError> {
		self.spy.op("stop_layout", Call::StopLayout)
	}

	fn zoom(&self) -> f64 {
		self.spy.with(|s| s.zoom)
	}

	fn zoom_to(&mut self, level: f64, _animation: ZoomAnimation) -> Result<(), EngineError> {
		self.spy.op("zoom_to", Call::ZoomTo(level))?;
		self.spy.with(|s| s.zoom = level);
		Ok(())
	}

	fn fit_center(&mut self) -> Result<(), EngineError> {
		self.spy.op("fit_center", Call::FitCenter)
	}

	fn destroy(&mut self) -> Result<(), EngineError> {
		self.spy.op("destroy", Call::Destroy)?;
		self.spy.with(|s| {
			s.destroyed += 1;
			s.handlers.clear();
		});
		Ok(())
	}

	fn node_data(&self, id: &str) -> Option<Node> {
		self.spy.node(id)
	}

	fn nodes(&self) -> Vec<Node> {
		self.spy.with(|s| s.nodes.clone())
	}

	fn edges(&self) -> Vec<Edge> {
		self.spy.with(|s| s.edges.clone())
	}

	fn on(&mut self, kind: EventKind, handler: EventHandler) {
		self.spy.with(|s| s.handlers.push((kind, handler)));
	}
}

/// Org chart with two expandable teams under one leader.
pub fn org_chart() -> GraphData {
	let team = |id: &str, members: &[&str]| {
		Node::new(id, format!("Team {id}"))
			.with_layer(2)
			.with_children(GraphData::new(
				members
					.iter()
					.map(|m| Node::new(*m, format!("Member {m}")).with_layer(3))
					.collect(),
				members.iter().map(|m| Edge::new(id, *m)).collect(),
			))
	};
	GraphData::new(
		vec![
			Node::new("L1", "Leader").with_layer(1),
			team("T1", &["M1", "M2"]),
			team("T2", &["M3"]),
		],
		vec![Edge::new("L1", "T1"), Edge::new("L1", "T2")],
	)
}
