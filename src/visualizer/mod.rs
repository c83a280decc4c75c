//! Visualization controller: engine lifecycle, data ingestion and
//! click-to-expand.
//!
//! A [`GraphVisualizer`] owns one render engine at a time. It keeps the
//! caller's full dataset (the canonical data, children included) and pushes
//! only the visible part to the engine. Clicking a node with children merges
//! them into the visible graph; [`GraphVisualizer::reset_graph`] reverts to the
//! top level. Option changes rebuild the engine from scratch.
//!
//! Nothing here panics or returns errors to the caller: unusable states and
//! engine failures are logged and the call becomes a no-op.

pub mod data;
pub mod engine;
pub mod expand;
pub mod options;
pub mod scheduler;
pub mod toolbar;

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, error, info, warn};

use data::GraphData;
use engine::{
	EngineConfig, EngineFactory, EventKind, GraphEvent, NodeClickEvent, Plugin, RenderEngine,
	ToolbarPlugin, ViewCommand,
};
use options::{Options, OptionsPatch};
use scheduler::{Scheduler, TaskId};

/// Delay before the render that follows data ingestion.
pub const RENDER_DELAY: Duration = Duration::ZERO;
/// How long auto-fit stays suppressed after a node click.
pub const CLICK_COOLDOWN: Duration = Duration::from_millis(20);

/// Where a [`GraphVisualizer`] is in its life.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
	/// No engine: not constructed yet, no container, or construction failed.
	#[default]
	Uninitialized,
	/// An engine is being built.
	Initializing,
	/// An engine exists and accepts data.
	Ready,
	/// Torn down for good; every operation is ignored.
	Destroyed,
}

/// State read by engine event handlers without borrowing the controller.
#[derive(Default)]
struct Flags {
	lifecycle: Cell<Lifecycle>,
	/// Set for a short cool-down after a node click.
	interaction_guard: Cell<bool>,
	auto_fit: Cell<bool>,
	/// Set while the ready callback holds the engine.
	notifying: Cell<bool>,
}

impl Flags {
	fn is_destroyed(&self) -> bool {
		self.lifecycle.get() == Lifecycle::Destroyed
	}

	fn should_auto_fit(&self) -> bool {
		self.auto_fit.get() && !self.interaction_guard.get() && !self.is_destroyed()
	}
}

struct State<E> {
	options: Options,
	engine: Option<E>,
	/// Canonical dataset as last given to `set_data`.
	data: Option<GraphData>,
	/// Bumped on every ingestion; deferred renders for older ingestions are
	/// dropped.
	ingest_epoch: u64,
}

/// Operation held back until the ready callback returns.
type Queued<F> = Box<dyn FnOnce(&Rc<Shared<F>>)>;

#[derive(Default)]
struct Timers {
	next_ticket: u64,
	pending: HashMap<u64, TaskId>,
}

pub(crate) struct Shared<F: EngineFactory> {
	factory: F,
	container: Option<F::Container>,
	scheduler: Rc<dyn Scheduler>,
	flags: Flags,
	timers: RefCell<Timers>,
	queued: RefCell<Vec<Queued<F>>>,
	state: RefCell<State<F::Engine>>,
}

/// Manages a render engine showing an expandable graph.
///
/// Cheap to hold; all state lives behind a shared pointer so engine event
/// handlers and deferred tasks can reach it. Handlers only keep weak
/// references, so dropping the visualizer releases everything.
pub struct GraphVisualizer<F: EngineFactory + 'static> {
	shared: Rc<Shared<F>>,
}

impl<F: EngineFactory + 'static> GraphVisualizer<F> {
	/// Resolves `options` over the defaults and builds the engine inside
	/// `container`. Without a container the visualizer stays uninitialized.
	pub fn new(
		container: Option<F::Container>,
		options: Option<OptionsPatch>,
		factory: F,
		scheduler: impl Scheduler + 'static,
	) -> Self {
		let options = Options::resolve(options);
		let shared = Rc::new(Shared {
			factory,
			container,
			scheduler: Rc::new(scheduler),
			flags: Flags::default(),
			timers: RefCell::new(Timers::default()),
			queued: RefCell::new(Vec::new()),
			state: RefCell::new(State {
				options,
				engine: None,
				data: None,
				ingest_epoch: 0,
			}),
		});
		shared.init();
		Self { shared }
	}

	/// (Re)builds the engine and hands it the current data again. Ignored
	/// while initializing or once destroyed.
	pub fn init(&self) {
		self.shared.rebuild();
	}

	/// Stores `data` as the canonical dataset and hands it to the engine. The
	/// render follows on the next turn of the task queue.
	pub fn set_data(&self, data: GraphData) {
		self.shared.set_data(data);
	}

	/// Merges `patch` into the current options and rebuilds the engine,
	/// re-applying the current data.
	pub fn update_options(&self, patch: OptionsPatch) {
		self.shared.update_options(patch);
	}

	/// Collapses every expanded node, showing only the top-level graph.
	pub fn reset_graph(&self) {
		self.shared.reset_graph();
	}

	/// The current engine, if one is alive.
	pub fn graph(&self) -> Option<Ref<'_, F::Engine>> {
		let state = self.shared.state.try_borrow().ok()?;
		Ref::filter_map(state, |s| s.engine.as_ref()).ok()
	}

	/// Tears down the engine and cancels pending work. Safe to call repeatedly.
	pub fn destroy(&self) {
		self.shared.destroy();
	}

	/// Current lifecycle state.
	pub fn lifecycle(&self) -> Lifecycle {
		self.shared.flags.lifecycle.get()
	}

	/// Snapshot of the resolved options.
	pub fn options(&self) -> Option<Options> {
		self.shared.state.try_borrow().ok().map(|s| s.options.clone())
	}

	/// Snapshot of the canonical dataset.
	pub fn data(&self) -> Option<GraphData> {
		self.shared.state.try_borrow().ok()?.data.clone()
	}
}

impl<F: EngineFactory + 'static> Shared<F> {
	fn state_mut(&self, op: &str) -> Option<RefMut<'_, State<F::Engine>>> {
		match self.state.try_borrow_mut() {
			Ok(state) => Some(state),
			Err(_) => {
				warn!("graph-unfold: {} ignored, visualizer is busy", op);
				None
			}
		}
	}

	/// Holds `op` back while the ready callback runs. Returns whether it was
	/// queued.
	fn queue_if_notifying(&self, op: impl FnOnce(&Rc<Self>) + 'static) -> bool {
		if !self.flags.notifying.get() {
			return false;
		}
		self.queued.borrow_mut().push(Box::new(op));
		true
	}

	/// Builds a fresh engine. Returns whether one is now live.
	fn init(self: &Rc<Self>) -> bool {
		match self.flags.lifecycle.get() {
			Lifecycle::Initializing | Lifecycle::Destroyed => return false,
			Lifecycle::Uninitialized | Lifecycle::Ready => {}
		}
		let Some(container) = self.container.clone() else {
			warn!("graph-unfold: no container, graph not initialized");
			return false;
		};
		let Some(mut state) = self.state_mut("init") else {
			return false;
		};

		self.flags.lifecycle.set(Lifecycle::Initializing);
		self.cancel_timers();
		self.flags.interaction_guard.set(false);
		if let Some(mut engine) = state.engine.take() {
			if let Err(e) = engine.destroy() {
				warn!("graph-unfold: failed to destroy previous engine: {}", e);
			}
		}

		let options = &state.options;
		let mut plugins = Vec::new();
		if options.toolbar.enabled {
			plugins.push(Plugin::Toolbar(self.toolbar_plugin(options)));
		}
		let config = EngineConfig {
			container,
			node: options.node_style.clone(),
			edge: options.edge_style.clone(),
			layout: options.layout.clone(),
			behaviors: options.behaviors.clone(),
			plugins,
		};
		let enable_expansion = options.enable_node_expansion;
		self.flags.auto_fit.set(options.auto_fit);

		match self.factory.create(config) {
			Ok(mut engine) => {
				self.subscribe(&mut engine, enable_expansion);
				state.engine = Some(engine);
				self.flags.lifecycle.set(Lifecycle::Ready);
				debug!("graph-unfold: engine initialized");
				true
			}
			Err(e) => {
				error!("graph-unfold: failed to initialize engine: {}", e);
				self.flags.lifecycle.set(Lifecycle::Uninitialized);
				false
			}
		}
	}

	/// `init`, then re-applies the canonical dataset to the new engine.
	fn rebuild(self: &Rc<Self>) {
		if self.queue_if_notifying(|shared| shared.rebuild()) {
			return;
		}
		if !self.init() {
			return;
		}
		let data = self.state.try_borrow().ok().and_then(|s| s.data.clone());
		if let Some(data) = data {
			self.set_data(data);
		}
	}

	fn toolbar_plugin(self: &Rc<Self>, options: &Options) -> ToolbarPlugin {
		let weak = Rc::downgrade(self);
		ToolbarPlugin {
			position: options.toolbar.position,
			items: options.toolbar.items.clone(),
			on_click: Rc::new(move |id: &str| {
				if let Some(shared) = weak.upgrade() {
					shared.dispatch_toolbar(id);
				}
			}),
		}
	}

	fn subscribe(self: &Rc<Self>, engine: &mut F::Engine, enable_expansion: bool) {
		let weak = Rc::downgrade(self);
		engine.on(
			EventKind::BeforeRender,
			Box::new(move |_| {
				let shared = weak.upgrade()?;
				shared.flags.should_auto_fit().then_some(ViewCommand::FitCenter)
			}),
		);

		if enable_expansion {
			let weak = Rc::downgrade(self);
			engine.on(
				EventKind::NodeClick,
				Box::new(move |event| {
					if let (Some(shared), GraphEvent::NodeClick(click)) = (weak.upgrade(), event) {
						shared.handle_node_click(click);
					}
					None
				}),
			);
		}
	}

	/// Runs `task` after `delay` unless the visualizer is destroyed first.
	fn defer(self: &Rc<Self>, delay: Duration, task: impl FnOnce(&Rc<Self>) + 'static) {
		let weak = Rc::downgrade(self);
		let ticket = {
			let mut timers = self.timers.borrow_mut();
			timers.next_ticket += 1;
			timers.next_ticket
		};
		let id = self.scheduler.schedule(
			delay,
			Box::new(move || {
				let Some(shared) = weak.upgrade() else {
					return;
				};
				shared.timers.borrow_mut().pending.remove(&ticket);
				if shared.flags.is_destroyed() {
					return;
				}
				task(&shared);
			}),
		);
		self.timers.borrow_mut().pending.insert(ticket, id);
	}

	fn cancel_timers(&self) {
		let pending: Vec<TaskId> = self.timers.borrow_mut().pending.drain().map(|(_, id)| id).collect();
		for id in pending {
			self.scheduler.cancel(id);
		}
	}

	fn set_data(self: &Rc<Self>, data: GraphData) {
		if self.flags.is_destroyed() {
			warn!("graph-unfold: visualizer destroyed, data ignored");
			return;
		}
		if self.flags.notifying.get() {
			self.queue_if_notifying(move |shared| shared.set_data(data));
			return;
		}
		let Some(mut state) = self.state_mut("set_data") else {
			return;
		};
		let state = &mut *state;
		let Some(engine) = state.engine.as_mut() else {
			warn!("graph-unfold: graph not initialized, data ignored");
			return;
		};

		info!(
			"graph-unfold: ingesting {} nodes, {} edges",
			data.nodes.len(),
			data.edges.len()
		);
		state.data = Some(data.clone());
		state.ingest_epoch += 1;
		let epoch = state.ingest_epoch;
		if let Err(e) = engine.set_data(data) {
			error!("graph-unfold: failed to set data: {}", e);
			return;
		}
		self.defer(RENDER_DELAY, move |shared| shared.commit_render(epoch));
	}

	/// Second half of `set_data`: render, then report readiness.
	fn commit_render(self: &Rc<Self>, epoch: u64) {
		{
			let Some(mut state) = self.state_mut("render") else {
				return;
			};
			if state.ingest_epoch != epoch {
				debug!("graph-unfold: render for superseded data skipped");
				return;
			}
			let Some(engine) = state.engine.as_mut() else {
				return;
			};
			if let Err(e) = engine.render() {
				warn!("graph-unfold: render failed: {}", e);
				return;
			}
		}

		self.notify_ready();
	}

	/// Hands the engine to the ready callback. Operations the callback asks
	/// for run once it has returned and the engine is released.
	fn notify_ready(self: &Rc<Self>) {
		{
			let Ok(state) = self.state.try_borrow() else {
				return;
			};
			let (Some(on_ready), Some(engine)) = (state.options.on_graph_ready.clone(), state.engine.as_ref())
			else {
				return;
			};
			self.flags.notifying.set(true);
			on_ready(engine);
			self.flags.notifying.set(false);
		}

		let queued = std::mem::take(&mut *self.queued.borrow_mut());
		if self.flags.is_destroyed() {
			self.teardown();
			return;
		}
		for op in queued {
			op(self);
		}
	}

	fn handle_node_click(self: &Rc<Self>, click: &NodeClickEvent) {
		if self.flags.is_destroyed() {
			return;
		}
		self.flags.interaction_guard.set(true);

		let resolved = {
			let Some(state) = self.state_mut("node click") else {
				self.flags.interaction_guard.set(false);
				return;
			};
			let already_expanded = state
				.engine
				.as_ref()
				.and_then(|engine| engine.node_data(&click.id))
				.is_some_and(|node| node.is_expanded);
			let record = state
				.data
				.as_ref()
				.and_then(|data| expand::find_node(&data.nodes, &click.id))
				.filter(|node| node.children.is_some())
				.cloned();
			match record {
				Some(record) if !already_expanded && state.engine.is_some() => Some((
					record,
					state.options.on_node_click.clone(),
					state.options.on_node_expand.clone(),
				)),
				_ => None,
			}
		};
		let Some((record, on_click, on_expand)) = resolved else {
			debug!("graph-unfold: click on {} has nothing to expand", click.id);
			self.flags.interaction_guard.set(false);
			return;
		};
		let Some(children) = record.children.as_ref() else {
			self.flags.interaction_guard.set(false);
			return;
		};

		if let Some(on_click) = on_click {
			on_click(click, &record);
		}
		if !self.expand_node(click, children) {
			self.flags.interaction_guard.set(false);
			return;
		}
		if let Some(on_expand) = on_expand {
			on_expand(&click.id, children);
		}

		self.defer(CLICK_COOLDOWN, |shared| shared.flags.interaction_guard.set(false));
	}

	/// Merges `children` into the engine's dataset below the clicked node.
	/// Either the whole merge lands or the previous dataset is restored.
	fn expand_node(&self, click: &NodeClickEvent, children: &GraphData) -> bool {
		if self.flags.is_destroyed() {
			return false;
		}
		let Some(mut state) = self.state_mut("expand") else {
			return false;
		};
		let Some(engine) = state.engine.as_mut() else {
			return false;
		};

		let previous = GraphData::new(engine.nodes(), engine.edges());
		let expansion = expand::expand(
			previous.nodes.clone(),
			previous.edges.clone(),
			&click.id,
			(click.x, click.y),
			children,
		);
		let (admitted_nodes, admitted_edges) = (expansion.admitted_nodes, expansion.admitted_edges);

		let applied = engine
			.clear()
			.and_then(|_| engine.set_data(expansion.data))
			.and_then(|_| engine.stop_layout())
			.and_then(|_| engine.render());
		match applied {
			Ok(()) => {
				info!(
					"graph-unfold: expanded {} (+{} nodes, +{} edges)",
					click.id, admitted_nodes, admitted_edges
				);
				true
			}
			Err(e) => {
				warn!("graph-unfold: failed to expand {}: {}", click.id, e);
				let restored = engine
					.clear()
					.and_then(|_| engine.set_data(previous))
					.and_then(|_| engine.render());
				if let Err(e) = restored {
					error!("graph-unfold: failed to restore graph after expansion: {}", e);
				}
				false
			}
		}
	}

	fn reset_graph(self: &Rc<Self>) {
		if self.flags.is_destroyed() || self.queue_if_notifying(|shared| shared.reset_graph()) {
			return;
		}
		let Some(mut state) = self.state_mut("reset") else {
			return;
		};
		let state = &mut *state;
		let (Some(engine), Some(data)) = (state.engine.as_mut(), state.data.as_ref()) else {
			return;
		};

		let collapsed = data.collapsed();
		let result = engine
			.clear()
			.and_then(|_| engine.set_data(collapsed))
			.and_then(|_| engine.stop_layout())
			.and_then(|_| engine.render())
			.and_then(|_| engine.fit_center());
		match result {
			Ok(()) => info!("graph-unfold: graph reset"),
			Err(e) => warn!("graph-unfold: failed to reset graph: {}", e),
		}
	}

	fn update_options(self: &Rc<Self>, patch: OptionsPatch) {
		match self.flags.lifecycle.get() {
			Lifecycle::Destroyed | Lifecycle::Initializing => return,
			Lifecycle::Uninitialized | Lifecycle::Ready => {}
		}
		if self.flags.notifying.get() {
			self.queue_if_notifying(move |shared| shared.update_options(patch));
			return;
		}
		{
			let Some(mut state) = self.state_mut("update_options") else {
				return;
			};
			state.options = state.options.merged(patch);
		}

		self.teardown();
		self.flags.lifecycle.set(Lifecycle::Uninitialized);
		self.rebuild();
	}

	/// Cancels pending work and destroys the engine, if any.
	fn teardown(&self) {
		self.cancel_timers();
		match self.state.try_borrow_mut() {
			Ok(mut state) => {
				if let Some(mut engine) = state.engine.take() {
					if let Err(e) = engine.destroy() {
						warn!("graph-unfold: failed to destroy engine: {}", e);
					}
				}
			}
			Err(_) => debug!("graph-unfold: engine in use, teardown deferred"),
		}
	}

	fn destroy(&self) {
		self.flags.lifecycle.set(Lifecycle::Destroyed);
		self.flags.interaction_guard.set(false);
		self.teardown();
	}
}

impl<F: EngineFactory> Drop for Shared<F> {
	fn drop(&mut self) {
		for (_, id) in self.timers.get_mut().pending.drain() {
			self.scheduler.cancel(id);
		}
		if let Some(mut engine) = self.state.get_mut().engine.take() {
			if let Err(e) = engine.destroy() {
				warn!("graph-unfold: failed to destroy engine on drop: {}", e);
			}
		}
	}
}
