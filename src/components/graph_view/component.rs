//! Leptos component hosting a [`GraphVisualizer`] on a canvas.
//!
//! The visualizer is built once the canvas is mounted, receives the `data`
//! signal's value whenever it changes, and is destroyed when the component is
//! cleaned up. A [`GraphHandle`] gives the surrounding view access to the
//! imperative operations (reset, option updates, toolbar commands).

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, Window};

use super::engine::CanvasEngineFactory;
use crate::visualizer::GraphVisualizer;
use crate::visualizer::data::GraphData;
use crate::visualizer::options::OptionsPatch;
use crate::visualizer::scheduler::TimeoutScheduler;

type CanvasVisualizer = GraphVisualizer<CanvasEngineFactory>;

/// Copyable reference to the visualizer inside a [`GraphView`].
///
/// Calls made before the view has mounted (or after it was cleaned up) are
/// ignored.
#[derive(Clone, Copy)]
pub struct GraphHandle {
	inner: StoredValue<Option<CanvasVisualizer>, LocalStorage>,
}

impl Default for GraphHandle {
	fn default() -> Self {
		Self::new()
	}
}

impl GraphHandle {
	/// A handle not yet attached to any view.
	pub fn new() -> Self {
		Self {
			inner: StoredValue::new_local(None),
		}
	}

	fn with(&self, f: impl FnOnce(&CanvasVisualizer)) {
		self.inner.try_with_value(|v| {
			if let Some(v) = v {
				f(v);
			}
		});
	}

	/// See [`GraphVisualizer::reset_graph`].
	pub fn reset_graph(&self) {
		self.with(|v| v.reset_graph());
	}

	/// See [`GraphVisualizer::update_options`].
	pub fn update_options(&self, patch: OptionsPatch) {
		self.with(move |v| v.update_options(patch));
	}

	/// See [`GraphVisualizer::dispatch_toolbar`].
	pub fn dispatch_toolbar(&self, id: &str) {
		self.with(|v| v.dispatch_toolbar(id));
	}

	fn is_mounted(&self) -> bool {
		self.inner.try_with_value(|v| v.is_some()).unwrap_or(false)
	}

	fn mount(&self, visualizer: CanvasVisualizer) {
		self.inner.try_set_value(Some(visualizer));
	}

	fn unmount(&self) {
		if let Some(Some(visualizer)) = self.inner.try_update_value(|v| v.take()) {
			visualizer.destroy();
		}
	}
}

fn viewport_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn parent_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|(w, h)| *w > 0.0 && *h > 0.0)
		.unwrap_or((800.0, 600.0))
}

/// Renders an expandable graph on a canvas element.
///
/// The component sizes itself to its parent container by default; set
/// `fullscreen = true` to fill the viewport and follow window resizes.
#[component]
pub fn GraphView(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(optional)] options: Option<OptionsPatch>,
	#[prop(optional)] handle: Option<GraphHandle>,
	#[prop(default = false)] fullscreen: bool,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let handle = handle.unwrap_or_default();
	let options = StoredValue::new_local(options);
	let resize_cb = StoredValue::new_local(None::<Closure<dyn FnMut()>>);

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let data = data.get();
		if handle.is_mounted() {
			handle.with(|v| v.set_data(data));
			return;
		}

		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			warn!("graph-unfold: no window, graph not mounted");
			return;
		};
		let (w, h) = if fullscreen {
			viewport_size(&window).unwrap_or_else(|| parent_size(&canvas))
		} else {
			parent_size(&canvas)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let options = options.try_update_value(|o| o.take()).flatten();
		let visualizer = GraphVisualizer::new(
			Some(canvas),
			options,
			CanvasEngineFactory::default(),
			TimeoutScheduler::new(),
		);
		visualizer.set_data(data);
		handle.mount(visualizer);

		if fullscreen {
			let resize = Closure::<dyn FnMut()>::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(viewport_size) else {
					return;
				};
				handle.with(|v| {
					if let Some(engine) = v.graph() {
						engine.resize(nw, nh);
					}
				});
			});
			if let Err(e) =
				window.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())
			{
				warn!("graph-unfold: resize listener failed: {:?}", e);
			}
			resize_cb.try_set_value(Some(resize));
		}
	});

	on_cleanup(move || {
		if let Some(Some(resize)) = resize_cb.try_update_value(|r| r.take()) {
			if let Some(window) = web_sys::window() {
				let _ = window
					.remove_event_listener_with_callback("resize", resize.as_ref().unchecked_ref());
			}
		}
		handle.unmount();
	});

	view! {
		<div class="graph-unfold" style="position: relative; width: 100%; height: 100%;">
			<canvas node_ref=canvas_ref class="graph-unfold-canvas" style="display: block;" />
		</div>
	}
}
