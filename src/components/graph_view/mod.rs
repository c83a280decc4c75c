//! Canvas host for the graph visualizer.
//!
//! Provides a [`CanvasEngine`] implementing the visualizer's render-engine
//! contract on top of a `force_graph` simulation, and the [`GraphView`]
//! Leptos component that mounts a visualizer on a canvas:
//! - Force-directed layout with link distance, radial layering and collision
//! - Click to expand, drag nodes, wheel zoom, optional canvas panning
//! - DOM toolbar with zoom, fit and collapse buttons
//!
//! # Example
//!
//! ```ignore
//! use graph_unfold::components::graph_view::{GraphHandle, GraphView};
//!
//! let handle = GraphHandle::new();
//! view! {
//!     <GraphView data=data handle=handle fullscreen=true />
//!     <button on:click=move |_| handle.reset_graph()>"Collapse"</button>
//! }
//! ```

mod component;
mod engine;
mod render;
mod scene;
pub mod theme;
mod toolbar;

pub use component::{GraphHandle, GraphView};
pub use engine::{CanvasEngine, CanvasEngineFactory};
pub use theme::CanvasTheme;
