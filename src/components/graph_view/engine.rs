//! Canvas render engine driving the visualizer in the browser.
//!
//! The engine owns the canvas listeners, the `requestAnimationFrame` loop and
//! the simulation [`Scene`]. Listener and frame closures only hold weak
//! references to the engine state, and no internal borrow is held while a
//! subscriber runs, so subscribers may call straight back into the engine.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Event, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::render;
use super::scene::{Interactions, Scene};
use super::theme::CanvasTheme;
use super::toolbar::ToolbarDom;
use crate::visualizer::data::{Edge, GraphData, Node};
use crate::visualizer::engine::{
	EngineConfig, EngineError, EngineFactory, EventHandler, EventKind, GraphEvent, NodeClickEvent,
	Plugin, RenderEngine, ViewCommand, ZoomAnimation,
};

/// Seconds of simulated time per animation frame.
const FRAME_DT: f32 = 0.016;
/// Zoom change per wheel notch.
const WHEEL_FACTOR: f64 = 1.1;

/// Builds [`CanvasEngine`]s on a canvas element.
#[derive(Clone, Debug, Default)]
pub struct CanvasEngineFactory {
	/// Look shared by every engine this factory builds.
	pub theme: CanvasTheme,
}

impl EngineFactory for CanvasEngineFactory {
	type Container = HtmlCanvasElement;
	type Engine = CanvasEngine;

	fn create(&self, config: EngineConfig<HtmlCanvasElement>) -> Result<CanvasEngine, EngineError> {
		CanvasEngine::new(config, self.theme.clone())
	}
}

type Listener = Closure<dyn FnMut(Event)>;

struct Inner {
	canvas: HtmlCanvasElement,
	ctx: CanvasRenderingContext2d,
	theme: CanvasTheme,
	scene: RefCell<Scene>,
	handlers: RefCell<Vec<(EventKind, EventHandler)>>,
	frame: RefCell<Option<Closure<dyn FnMut()>>>,
	frame_request: Cell<Option<i32>>,
	listeners: RefCell<Vec<(&'static str, Listener)>>,
	toolbar: RefCell<Option<ToolbarDom>>,
	destroyed: Cell<bool>,
}

/// Force-directed graph drawn on an HTML canvas.
pub struct CanvasEngine {
	inner: Rc<Inner>,
}

fn now_ms() -> f64 {
	web_sys::window()
		.and_then(|w| w.performance())
		.map(|p| p.now())
		.unwrap_or(0.0)
}

fn modifier_flag(config: &EngineConfig<HtmlCanvasElement>, kind: &str, key: &str) -> bool {
	config
		.behaviors
		.iter()
		.filter(|b| b.kind() == kind)
		.any(|b| b.modifier(key).and_then(|v| v.as_bool()).unwrap_or(false))
}

impl CanvasEngine {
	fn new(config: EngineConfig<HtmlCanvasElement>, theme: CanvasTheme) -> Result<Self, EngineError> {
		let canvas = config.container.clone();
		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")?
			.ok_or_else(|| EngineError::Construction("2d context unavailable".to_string()))?
			.dyn_into()
			.map_err(|_| EngineError::Construction("unexpected context type".to_string()))?;

		let interactions = Interactions {
			drag_nodes: config.has_behavior("drag-element-force") || config.has_behavior("drag-element"),
			pin_dropped: modifier_flag(&config, "drag-element-force", "fixed"),
			pan: config.has_behavior("drag-canvas"),
			select: config.has_behavior("click-select"),
		};
		let scene = Scene::new(
			config.node.clone(),
			config.edge.clone(),
			config.layout.clone(),
			interactions,
			canvas.width() as f64,
			canvas.height() as f64,
		);

		let inner = Rc::new(Inner {
			canvas,
			ctx,
			theme,
			scene: RefCell::new(scene),
			handlers: RefCell::new(Vec::new()),
			frame: RefCell::new(None),
			frame_request: Cell::new(None),
			listeners: RefCell::new(Vec::new()),
			toolbar: RefCell::new(None),
			destroyed: Cell::new(false),
		});

		let engine = Self { inner };
		engine.attach_pointer_listeners()?;
		if config.has_behavior("zoom-canvas") {
			engine.attach_wheel_zoom()?;
		}
		for plugin in &config.plugins {
			match plugin {
				Plugin::Toolbar(toolbar) => match ToolbarDom::mount(&engine.inner.canvas, toolbar) {
					Ok(dom) => *engine.inner.toolbar.borrow_mut() = Some(dom),
					Err(e) => warn!("graph-unfold: toolbar unavailable: {}", e),
				},
			}
		}
		engine.start_frames();
		debug!("graph-unfold: canvas engine created");
		Ok(engine)
	}

	fn listen(&self, event: &'static str, mut f: impl FnMut(&Inner, &Event) + 'static) -> Result<(), EngineError> {
		let weak: Weak<Inner> = Rc::downgrade(&self.inner);
		let listener = Listener::new(move |ev: Event| {
			if let Some(inner) = weak.upgrade() {
				if !inner.destroyed.get() {
					f(&inner, &ev);
				}
			}
		});
		self.inner
			.canvas
			.add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())?;
		self.inner.listeners.borrow_mut().push((event, listener));
		Ok(())
	}

	fn attach_pointer_listeners(&self) -> Result<(), EngineError> {
		self.listen("mousedown", |inner, ev| {
			if let Some((x, y)) = inner.pointer(ev) {
				inner.scene.borrow_mut().pointer_down(x, y);
			}
		})?;
		self.listen("mousemove", |inner, ev| {
			if let Some((x, y)) = inner.pointer(ev) {
				inner.scene.borrow_mut().pointer_move(x, y);
			}
		})?;
		self.listen("mouseup", |inner, _| {
			let click = inner.scene.borrow_mut().pointer_up();
			if let Some(click) = click {
				debug!("graph-unfold: node {} clicked", click.id);
				inner.emit(&GraphEvent::NodeClick(NodeClickEvent {
					id: click.id,
					x: click.x,
					y: click.y,
				}));
			}
		})?;
		self.listen("mouseleave", |inner, _| {
			inner.scene.borrow_mut().pointer_cancel();
		})
	}

	fn attach_wheel_zoom(&self) -> Result<(), EngineError> {
		self.listen("wheel", |inner, ev| {
			ev.prevent_default();
			let Some(wheel) = ev.dyn_ref::<WheelEvent>() else {
				return;
			};
			let Some(anchor) = inner.pointer(ev) else {
				return;
			};
			let factor = if wheel.delta_y() > 0.0 {
				1.0 / WHEEL_FACTOR
			} else {
				WHEEL_FACTOR
			};
			let mut scene = inner.scene.borrow_mut();
			let k = scene.transform.k * factor;
			scene.zoom_at(k, anchor);
		})
	}

	fn start_frames(&self) {
		let weak = Rc::downgrade(&self.inner);
		*self.inner.frame.borrow_mut() = Some(Closure::new(move || {
			if let Some(inner) = weak.upgrade() {
				inner.frame();
			}
		}));
		self.inner.request_frame();
	}

	fn live(&self) -> Result<&Inner, EngineError> {
		if self.inner.destroyed.get() {
			Err(EngineError::Destroyed)
		} else {
			Ok(&self.inner)
		}
	}

	/// Adapts the viewport to a resized canvas.
	pub fn resize(&self, width: f64, height: f64) {
		self.inner.canvas.set_width(width as u32);
		self.inner.canvas.set_height(height as u32);
		self.inner.scene.borrow_mut().resize(width, height);
		self.inner.draw();
	}
}

impl Inner {
	/// Pointer position relative to the canvas.
	fn pointer(&self, ev: &Event) -> Option<(f64, f64)> {
		let mouse = ev.dyn_ref::<MouseEvent>()?;
		let rect = self.canvas.get_bounding_client_rect();
		Some((
			mouse.client_x() as f64 - rect.left(),
			mouse.client_y() as f64 - rect.top(),
		))
	}

	/// Delivers `event` to subscribers, then applies the view commands they
	/// returned.
	fn emit(&self, event: &GraphEvent) {
		let mut handlers = std::mem::take(&mut *self.handlers.borrow_mut());
		let mut commands = Vec::new();
		for (kind, handler) in handlers.iter_mut() {
			if *kind == event.kind() {
				commands.extend(handler(event));
			}
		}
		if self.destroyed.get() {
			return;
		}
		{
			let mut slot = self.handlers.borrow_mut();
			handlers.append(&mut slot);
			*slot = handlers;
		}
		for command in commands {
			match command {
				ViewCommand::FitCenter => self.scene.borrow_mut().fit_center(),
			}
		}
	}

	fn request_frame(&self) {
		if self.destroyed.get() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		if let Some(callback) = self.frame.borrow().as_ref() {
			match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
				Ok(id) => self.frame_request.set(Some(id)),
				Err(e) => warn!("graph-unfold: requestAnimationFrame failed: {:?}", e),
			}
		}
	}

	fn frame(&self) {
		self.frame_request.set(None);
		if self.destroyed.get() {
			return;
		}
		self.scene.borrow_mut().tick(FRAME_DT, now_ms());
		self.draw();
		self.request_frame();
	}

	fn draw(&self) {
		if let Err(e) = self.try_draw() {
			warn!("graph-unfold: draw failed: {}", e);
		}
	}

	fn try_draw(&self) -> Result<(), EngineError> {
		let scene = self.scene.borrow();
		render::render(&scene, &self.ctx, &self.theme)?;
		Ok(())
	}

	fn teardown(&self) {
		if self.destroyed.replace(true) {
			return;
		}
		if let (Some(id), Some(window)) = (self.frame_request.take(), web_sys::window()) {
			let _ = window.cancel_animation_frame(id);
		}
		for (event, listener) in self.listeners.borrow_mut().drain(..) {
			let _ = self
				.canvas
				.remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref());
		}
		if let Some(toolbar) = self.toolbar.borrow_mut().take() {
			toolbar.remove();
		}
		self.handlers.borrow_mut().clear();
		self.frame.borrow_mut().take();
		self.ctx.clear_rect(0.0, 0.0, self.canvas.width() as f64, self.canvas.height() as f64);
		debug!("graph-unfold: canvas engine destroyed");
	}
}

impl RenderEngine for CanvasEngine {
	fn set_data(&mut self, data: GraphData) -> Result<(), EngineError> {
		self.live()?.scene.borrow_mut().set_data(data);
		Ok(())
	}

	fn render(&mut self) -> Result<(), EngineError> {
		let inner = self.live()?;
		inner.emit(&GraphEvent::BeforeRender);
		inner.scene.borrow_mut().start_layout();
		inner.try_draw()
	}

	fn clear(&mut self) -> Result<(), EngineError> {
		let inner = self.live()?;
		inner.scene.borrow_mut().clear();
		inner.try_draw()
	}

	fn stop_layout(&mut self) -> Result<(), EngineError> {
		self.live()?.scene.borrow_mut().stop_layout();
		Ok(())
	}

	fn zoom(&self) -> f64 {
		self.inner.scene.borrow().zoom()
	}

	fn zoom_to(&mut self, level: f64, animation: ZoomAnimation) -> Result<(), EngineError> {
		self.live()?
			.scene
			.borrow_mut()
			.zoom_to(level, animation, now_ms());
		Ok(())
	}

	fn fit_center(&mut self) -> Result<(), EngineError> {
		self.live()?.scene.borrow_mut().fit_center();
		Ok(())
	}

	fn destroy(&mut self) -> Result<(), EngineError> {
		self.inner.teardown();
		Ok(())
	}

	fn node_data(&self, id: &str) -> Option<Node> {
		self.inner.scene.borrow().node(id)
	}

	fn nodes(&self) -> Vec<Node> {
		self.inner.scene.borrow().nodes()
	}

	fn edges(&self) -> Vec<Edge> {
		self.inner.scene.borrow().edges().to_vec()
	}

	fn on(&mut self, kind: EventKind, handler: EventHandler) {
		if !self.inner.destroyed.get() {
			self.inner.handlers.borrow_mut().push((kind, handler));
		}
	}
}

impl Drop for CanvasEngine {
	fn drop(&mut self) {
		self.inner.teardown();
	}
}
