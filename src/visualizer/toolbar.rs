//! Toolbar commands and their dispatch onto the engine.

use std::rc::Rc;

use log::{debug, warn};

use super::engine::{Easing, EngineError, EngineFactory, RenderEngine, ZoomAnimation};
use super::{GraphVisualizer, Shared};

/// Multiplier applied per zoom step.
pub const ZOOM_STEP: f64 = 1.2;
/// Lowest zoom level the toolbar steps down to.
pub const MIN_ZOOM: f64 = 0.5;
/// Highest zoom level the toolbar steps up to.
pub const MAX_ZOOM: f64 = 3.0;
/// Tween used for toolbar zoom steps.
pub const ZOOM_ANIMATION: ZoomAnimation = ZoomAnimation {
	duration_ms: 300,
	easing: Easing::EaseInOut,
};

/// Action behind a toolbar item id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolbarCommand {
	/// `zoom-in`
	ZoomIn,
	/// `zoom-out`
	ZoomOut,
	/// `auto-fit`: fit the graph into view.
	AutoFit,
	/// `reset`: collapse to the top-level graph.
	Reset,
	/// Caller-declared item with no built-in action.
	Custom(String),
}

impl ToolbarCommand {
	/// Maps an item id to its command; unknown ids become `Custom`.
	pub fn parse(id: &str) -> Self {
		match id {
			"zoom-in" => Self::ZoomIn,
			"zoom-out" => Self::ZoomOut,
			"auto-fit" => Self::AutoFit,
			"reset" => Self::Reset,
			other => Self::Custom(other.to_string()),
		}
	}
}

/// Zoom level after one step in or out from `current`, clamped to the
/// supported range.
pub fn zoom_step(current: f64, zoom_in: bool) -> f64 {
	let next = if zoom_in {
		current * ZOOM_STEP
	} else {
		current / ZOOM_STEP
	};
	next.clamp(MIN_ZOOM, MAX_ZOOM)
}

impl<F: EngineFactory + 'static> Shared<F> {
	pub(super) fn dispatch_toolbar(self: &Rc<Self>, id: &str) {
		if self.flags.is_destroyed() {
			debug!("graph-unfold: toolbar `{}` ignored, visualizer destroyed", id);
			return;
		}
		let owned = id.to_string();
		if self.queue_if_notifying(move |shared| shared.dispatch_toolbar(&owned)) {
			return;
		}

		let command = ToolbarCommand::parse(id);
		let result = match &command {
			ToolbarCommand::Reset => {
				self.reset_graph();
				return;
			}
			ToolbarCommand::Custom(id) => {
				warn!("graph-unfold: unknown toolbar item `{}`", id);
				return;
			}
			ToolbarCommand::ZoomIn | ToolbarCommand::ZoomOut | ToolbarCommand::AutoFit => {
				let Some(mut state) = self.state_mut("toolbar") else {
					return;
				};
				let Some(engine) = state.engine.as_mut() else {
					return;
				};
				apply_view_command(engine, &command)
			}
		};
		if let Err(e) = result {
			warn!("graph-unfold: toolbar `{}` failed: {}", id, e);
		}
	}
}

fn apply_view_command<E: RenderEngine>(
	engine: &mut E,
	command: &ToolbarCommand,
) -> Result<(), EngineError> {
	match command {
		ToolbarCommand::ZoomIn => engine.zoom_to(zoom_step(engine.zoom(), true), ZOOM_ANIMATION),
		ToolbarCommand::ZoomOut => engine.zoom_to(zoom_step(engine.zoom(), false), ZOOM_ANIMATION),
		ToolbarCommand::AutoFit => engine.fit_center(),
		ToolbarCommand::Reset | ToolbarCommand::Custom(_) => Ok(()),
	}
}

impl<F: EngineFactory + 'static> GraphVisualizer<F> {
	/// Runs the toolbar command `id` (`zoom-in`, `zoom-out`, `auto-fit`,
	/// `reset`). Unknown ids are logged and ignored.
	pub fn dispatch_toolbar(&self, id: &str) {
		self.shared.dispatch_toolbar(id);
	}
}
