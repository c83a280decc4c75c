//! DOM toolbar overlaid on the canvas.

use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, HtmlCanvasElement};

use crate::visualizer::engine::{EngineError, ToolbarPlugin};
use crate::visualizer::options::ToolbarPosition;

const BAR_STYLE: &str = "position: absolute; display: flex; gap: 4px; padding: 4px; \
	background: rgba(255, 255, 255, 0.9); border-radius: 4px; \
	box-shadow: 0 1px 4px rgba(0, 0, 0, 0.2); z-index: 1;";
const BUTTON_STYLE: &str = "min-width: 28px; height: 28px; border: none; \
	background: transparent; cursor: pointer; font-size: 14px;";

/// Buttons mounted next to the canvas; removed again by [`ToolbarDom::remove`].
pub struct ToolbarDom {
	root: Element,
	buttons: Vec<(Element, Closure<dyn FnMut(Event)>)>,
}

fn corner(position: ToolbarPosition) -> &'static str {
	match position {
		ToolbarPosition::TopLeft => "top: 8px; left: 8px;",
		ToolbarPosition::TopRight => "top: 8px; right: 8px;",
		ToolbarPosition::BottomLeft => "bottom: 8px; left: 8px;",
		ToolbarPosition::BottomRight => "bottom: 8px; right: 8px;",
	}
}

fn caption(id: &str) -> (&str, &str) {
	match id {
		"zoom-in" => ("+", "Zoom in"),
		"zoom-out" => ("\u{2212}", "Zoom out"),
		"auto-fit" => ("\u{2922}", "Fit to view"),
		"reset" => ("\u{27f2}", "Collapse all"),
		other => (other, other),
	}
}

impl ToolbarDom {
	/// Builds the toolbar inside the canvas's parent element.
	pub fn mount(canvas: &HtmlCanvasElement, plugin: &ToolbarPlugin) -> Result<Self, EngineError> {
		let parent = canvas
			.parent_element()
			.ok_or_else(|| EngineError::call("toolbar", "canvas has no parent element"))?;
		let document = canvas
			.owner_document()
			.ok_or_else(|| EngineError::call("toolbar", "canvas is not attached to a document"))?;

		let root = document.create_element("div")?;
		root.set_class_name("graph-unfold-toolbar");
		root.set_attribute("style", &format!("{BAR_STYLE} {}", corner(plugin.position)))?;

		let mut buttons = Vec::with_capacity(plugin.items.len());
		for item in &plugin.items {
			let (text, title) = caption(item);
			let button = document.create_element("button")?;
			button.set_text_content(Some(text));
			button.set_attribute("title", title)?;
			button.set_attribute("style", BUTTON_STYLE)?;
			button.set_attribute("data-item", item)?;

			let (on_click, id) = (plugin.on_click.clone(), item.clone());
			let listener = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
				ev.stop_propagation();
				on_click(&id);
			});
			button.add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())?;
			root.append_child(&button)?;
			buttons.push((button, listener));
		}

		parent.append_child(&root)?;
		Ok(Self { root, buttons })
	}

	/// Detaches the buttons and their listeners.
	pub fn remove(self) {
		for (button, listener) in &self.buttons {
			let _ = button.remove_event_listener_with_callback("click", listener.as_ref().unchecked_ref());
		}
		self.root.remove();
	}
}
