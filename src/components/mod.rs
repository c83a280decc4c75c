//! Browser-side components.

pub mod graph_view;
