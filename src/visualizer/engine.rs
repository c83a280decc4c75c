//! Contract between the visualizer and the render engine that draws the graph.
//!
//! The engine owns layout, hit-testing and drawing. The visualizer only pushes
//! whole datasets, asks for renders and view changes, and listens for a pre-render
//! hook and node clicks.

use std::rc::Rc;

use thiserror::Error;
use wasm_bindgen::JsValue;

use super::data::{Edge, GraphData, Node};
use super::options::{Behavior, EdgeStyle, LayoutOptions, NodeStyle, ToolbarPosition};

/// Failure reported by a render engine.
#[derive(Debug, Error)]
pub enum EngineError {
	/// The engine could not be built in its container.
	#[error("engine construction failed: {0}")]
	Construction(String),
	/// An operation on a live engine failed.
	#[error("engine call `{op}` failed: {reason}")]
	Call {
		/// Operation name.
		op: &'static str,
		/// What went wrong.
		reason: String,
	},
	/// A browser API threw.
	#[error("javascript error: {0}")]
	Js(String),
	/// The engine was already torn down.
	#[error("engine has been destroyed")]
	Destroyed,
}

impl EngineError {
	/// Shorthand for [`EngineError::Call`].
	pub fn call(op: &'static str, reason: impl Into<String>) -> Self {
		Self::Call {
			op,
			reason: reason.into(),
		}
	}
}

impl From<JsValue> for EngineError {
	fn from(value: JsValue) -> Self {
		Self::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
	}
}

/// Event types handlers subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
	/// Fired at the start of every `render` call.
	BeforeRender,
	/// A node was clicked, not dragged.
	NodeClick,
}

/// A click on a rendered node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeClickEvent {
	/// Id of the clicked node.
	pub id: String,
	/// Rendered position of the node at click time.
	pub x: f64,
	/// See `x`.
	pub y: f64,
}

/// An event delivered to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
	/// See [`EventKind::BeforeRender`].
	BeforeRender,
	/// See [`EventKind::NodeClick`].
	NodeClick(NodeClickEvent),
}

impl GraphEvent {
	/// The subscription this event is delivered to.
	pub fn kind(&self) -> EventKind {
		match self {
			Self::BeforeRender => EventKind::BeforeRender,
			Self::NodeClick(_) => EventKind::NodeClick,
		}
	}
}

/// Follow-up a handler asks the engine to perform once it returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewCommand {
	/// Center the graph in the viewport.
	FitCenter,
}

/// Event subscriber.
///
/// Engines must not hold any internal borrow while a handler runs: node-click
/// handlers call straight back into the engine.
pub type EventHandler = Box<dyn FnMut(&GraphEvent) -> Option<ViewCommand>>;

/// Progress curve of an animated transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Easing {
	/// Constant speed.
	Linear,
	/// Smoothstep: slow start and end.
	EaseInOut,
}

impl Easing {
	/// Maps linear progress `t` in [0, 1] to eased progress.
	pub fn apply(self, t: f64) -> f64 {
		let t = t.clamp(0.0, 1.0);
		match self {
			Self::Linear => t,
			Self::EaseInOut => t * t * (3.0 - 2.0 * t),
		}
	}
}

/// Transition used by [`RenderEngine::zoom_to`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomAnimation {
	/// Length of the transition; zero jumps straight to the target.
	pub duration_ms: u32,
	/// Progress curve.
	pub easing: Easing,
}

/// Toolbar widget the engine draws on behalf of the visualizer.
#[derive(Clone)]
pub struct ToolbarPlugin {
	/// Corner of the container.
	pub position: ToolbarPosition,
	/// Item ids, in display order.
	pub items: Vec<String>,
	/// Invoked with the id of the clicked item.
	pub on_click: Rc<dyn Fn(&str)>,
}

impl std::fmt::Debug for ToolbarPlugin {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ToolbarPlugin")
			.field("position", &self.position)
			.field("items", &self.items)
			.finish_non_exhaustive()
	}
}

/// Extra widgets mounted alongside the graph.
#[derive(Clone, Debug)]
pub enum Plugin {
	/// Zoom, fit and reset buttons.
	Toolbar(ToolbarPlugin),
}

/// Everything an engine needs at construction.
#[derive(Clone, Debug)]
pub struct EngineConfig<C> {
	/// Host element the engine draws into.
	pub container: C,
	/// Node appearance.
	pub node: NodeStyle,
	/// Edge appearance.
	pub edge: EdgeStyle,
	/// Force layout parameters.
	pub layout: LayoutOptions,
	/// Enabled interactions.
	pub behaviors: Vec<Behavior>,
	/// Widgets to mount.
	pub plugins: Vec<Plugin>,
}

impl<C> EngineConfig<C> {
	/// Whether a behavior of type `kind` is enabled.
	pub fn has_behavior(&self, kind: &str) -> bool {
		self.behaviors.iter().any(|b| b.kind() == kind)
	}
}

/// A live graph renderer.
pub trait RenderEngine {
	/// Replaces the engine's dataset wholesale.
	fn set_data(&mut self, data: GraphData) -> Result<(), EngineError>;
	/// Draws the current dataset, firing [`EventKind::BeforeRender`] first.
	fn render(&mut self) -> Result<(), EngineError>;
	/// Drops all rendered elements and the current dataset.
	fn clear(&mut self) -> Result<(), EngineError>;
	/// Halts any running layout animation.
	fn stop_layout(&mut self) -> Result<(), EngineError>;
	/// Current zoom level, 1.0 being unscaled.
	fn zoom(&self) -> f64;
	/// Zooms about the viewport center.
	fn zoom_to(&mut self, level: f64, animation: ZoomAnimation) -> Result<(), EngineError>;
	/// Centers the graph in the viewport.
	fn fit_center(&mut self) -> Result<(), EngineError>;
	/// Releases every resource. The engine is unusable afterwards.
	fn destroy(&mut self) -> Result<(), EngineError>;
	/// Record of node `id` as rendered, position included.
	fn node_data(&self, id: &str) -> Option<Node>;
	/// Every rendered node.
	fn nodes(&self) -> Vec<Node>;
	/// Every rendered edge.
	fn edges(&self) -> Vec<Edge>;
	/// Subscribes `handler` to events of `kind`.
	fn on(&mut self, kind: EventKind, handler: EventHandler);
}

/// Builds engines for a particular host container type.
pub trait EngineFactory {
	/// Host element handle.
	type Container: Clone;
	/// Engine built by this factory.
	type Engine: RenderEngine + 'static;

	/// Builds an engine inside `config.container`.
	fn create(&self, config: EngineConfig<Self::Container>) -> Result<Self::Engine, EngineError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ease_in_out_is_symmetric() {
		assert_eq!(Easing::EaseInOut.apply(0.0), 0.0);
		assert_eq!(Easing::EaseInOut.apply(1.0), 1.0);
		assert_eq!(Easing::EaseInOut.apply(0.5), 0.5);
		assert!(Easing::EaseInOut.apply(0.25) < 0.25);
		assert_eq!(Easing::Linear.apply(2.0), 1.0);
	}

	#[test]
	fn event_kinds() {
		assert_eq!(GraphEvent::BeforeRender.kind(), EventKind::BeforeRender);
		let click = GraphEvent::NodeClick(NodeClickEvent {
			id: "A".into(),
			x: 0.0,
			y: 0.0,
		});
		assert_eq!(click.kind(), EventKind::NodeClick);
	}
}
