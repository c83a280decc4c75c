//! Visualizer configuration: defaults and caller overrides.
//!
//! [`Options`] is the fully resolved configuration. Callers describe changes
//! with an [`OptionsPatch`], which mirrors the same tree with every field
//! optional. Merging walks the tree: nested sections merge field by field,
//! everything else (closures, lists, scalars) replaces the current value.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::data::{GraphData, Node};
use super::engine::{NodeClickEvent, RenderEngine};

/// Called with the click event and the full record of the clicked node.
pub type NodeClickCallback = Rc<dyn Fn(&NodeClickEvent, &Node)>;
/// Called with the expanded node's id and the children that were merged in.
pub type NodeExpandCallback = Rc<dyn Fn(&str, &GraphData)>;
/// Called once the first render after `set_data` has completed.
pub type GraphReadyCallback = Rc<dyn Fn(&dyn RenderEngine)>;

/// A style value that is either fixed or computed from the node record.
pub enum NodeAttr<T> {
	/// Same value for every node.
	Fixed(T),
	/// Evaluated per node.
	Computed(Rc<dyn Fn(&Node) -> T>),
}

impl<T: Clone> NodeAttr<T> {
	/// Wraps a per-node accessor.
	pub fn computed(f: impl Fn(&Node) -> T + 'static) -> Self {
		Self::Computed(Rc::new(f))
	}

	/// Value for `node`.
	pub fn resolve(&self, node: &Node) -> T {
		match self {
			Self::Fixed(value) => value.clone(),
			Self::Computed(f) => f(node),
		}
	}
}

impl<T: Clone> Clone for NodeAttr<T> {
	fn clone(&self) -> Self {
		match self {
			Self::Fixed(value) => Self::Fixed(value.clone()),
			Self::Computed(f) => Self::Computed(Rc::clone(f)),
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for NodeAttr<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
			Self::Computed(_) => f.write_str("Computed(..)"),
		}
	}
}

/// JSON can only carry fixed values.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for NodeAttr<T> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		T::deserialize(deserializer).map(Self::Fixed)
	}
}

impl From<&str> for NodeAttr<String> {
	fn from(value: &str) -> Self {
		Self::Fixed(value.to_string())
	}
}

impl From<f64> for NodeAttr<f64> {
	fn from(value: f64) -> Self {
		Self::Fixed(value)
	}
}

/// A link force parameter, fixed or computed from the link's endpoints.
///
/// Endpoints are `None` while the layout has not resolved them yet.
#[derive(Clone)]
pub enum LinkAttr {
	/// Same value for every link.
	Fixed(f64),
	/// Evaluated from the source and target records.
	Computed(Rc<dyn Fn(Option<&Node>, Option<&Node>) -> f64>),
}

impl LinkAttr {
	/// Wraps a per-link accessor.
	pub fn computed(f: impl Fn(Option<&Node>, Option<&Node>) -> f64 + 'static) -> Self {
		Self::Computed(Rc::new(f))
	}

	/// Value for the link between `source` and `target`.
	pub fn resolve(&self, source: Option<&Node>, target: Option<&Node>) -> f64 {
		match self {
			Self::Fixed(value) => *value,
			Self::Computed(f) => f(source, target),
		}
	}
}

impl fmt::Debug for LinkAttr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
			Self::Computed(_) => f.write_str("Computed(..)"),
		}
	}
}

impl<'de> Deserialize<'de> for LinkAttr {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		f64::deserialize(deserializer).map(Self::Fixed)
	}
}

/// An interaction behavior enabled on the engine.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Behavior {
	/// Bare type tag, e.g. `"zoom-canvas"`.
	Named(String),
	/// Type tag plus modifiers, e.g. `{ "type": "click-select", "state": "active" }`.
	Configured {
		/// Type tag.
		#[serde(rename = "type")]
		kind: String,
		/// Every other key of the object.
		#[serde(flatten)]
		modifiers: Map<String, Value>,
	},
}

impl Behavior {
	/// A configured behavior from a tag and modifier pairs.
	pub fn configured(kind: &str, modifiers: &[(&str, Value)]) -> Self {
		Self::Configured {
			kind: kind.to_string(),
			modifiers: modifiers
				.iter()
				.map(|(k, v)| (k.to_string(), v.clone()))
				.collect(),
		}
	}

	/// The type tag, whichever form the behavior takes.
	pub fn kind(&self) -> &str {
		match self {
			Self::Named(kind) => kind,
			Self::Configured { kind, .. } => kind,
		}
	}

	/// A modifier of a configured behavior.
	pub fn modifier(&self, key: &str) -> Option<&Value> {
		match self {
			Self::Named(_) => None,
			Self::Configured { modifiers, .. } => modifiers.get(key),
		}
	}
}

/// Corner of the container the toolbar is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolbarPosition {
	/// `top-left`
	#[default]
	TopLeft,
	/// `top-right`
	TopRight,
	/// `bottom-left`
	BottomLeft,
	/// `bottom-right`
	BottomRight,
}

/// How nodes are drawn.
#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Node diameter.
	pub size: NodeAttr<f64>,
	/// CSS fill color.
	pub fill: NodeAttr<String>,
	/// Label shown next to the node.
	pub label_text: NodeAttr<String>,
	/// Label anchor relative to the node, e.g. `"bottom"` or `"center"`.
	pub label_placement: String,
	/// CSS label color.
	pub label_fill: String,
	/// Engine-specific style keys passed through as-is.
	pub extra: Map<String, Value>,
}

/// How edges are drawn.
#[derive(Clone, Debug)]
pub struct EdgeStyle {
	/// CSS stroke color.
	pub stroke: String,
	/// Engine-specific style keys, e.g. `lineWidth`.
	pub extra: Map<String, Value>,
}

/// Spring between linked nodes.
#[derive(Clone, Debug)]
pub struct LinkForce {
	/// Rest length.
	pub distance: LinkAttr,
	/// Share of the length error corrected per tick.
	pub strength: LinkAttr,
}

/// Charge between every pair of nodes; negative repels.
#[derive(Clone, Debug)]
pub struct ManyBodyForce {
	/// Charge per node.
	pub strength: NodeAttr<f64>,
}

/// Keeps nodes from overlapping.
#[derive(Clone, Debug, PartialEq)]
pub struct CollideForce {
	/// Exclusion radius around each node.
	pub radius: f64,
	/// Share of the overlap resolved per tick.
	pub strength: f64,
}

/// Pulls the graph's centroid to the middle of the view.
#[derive(Clone, Debug, PartialEq)]
pub struct CenterForce {
	/// Share of the offset corrected per tick.
	pub strength: f64,
}

/// Pulls nodes towards a ring of `radius` around (`x`, `y`).
#[derive(Clone, Debug)]
pub struct RadialForce {
	/// Pull per node.
	pub strength: NodeAttr<f64>,
	/// Ring radius per node.
	pub radius: NodeAttr<f64>,
	/// Ring center, x.
	pub x: f64,
	/// Ring center, y.
	pub y: f64,
}

/// Force layout parameters.
#[derive(Clone, Debug)]
pub struct LayoutOptions {
	/// Layout algorithm name understood by the engine.
	pub kind: String,
	/// Link springs.
	pub link: LinkForce,
	/// Node charge.
	pub many_body: ManyBodyForce,
	/// Overlap avoidance.
	pub collide: CollideForce,
	/// Centering.
	pub center: CenterForce,
	/// Layer rings.
	pub radial: RadialForce,
	/// Engine-specific layout keys.
	pub extra: Map<String, Value>,
}

/// Built-in toolbar plugin settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolbarOptions {
	/// Mount the toolbar at all.
	pub enabled: bool,
	/// Corner the toolbar sits in.
	pub position: ToolbarPosition,
	/// Command ids, in display order.
	pub items: Vec<String>,
}

/// Fully resolved visualizer configuration.
#[derive(Clone)]
pub struct Options {
	/// Node appearance.
	pub node_style: NodeStyle,
	/// Edge appearance.
	pub edge_style: EdgeStyle,
	/// Force layout parameters.
	pub layout: LayoutOptions,
	/// Interactions enabled on the engine.
	pub behaviors: Vec<Behavior>,
	/// Toolbar plugin settings.
	pub toolbar: ToolbarOptions,
	/// Fit the view before each render, except right after a node click.
	pub auto_fit: bool,
	/// Reveal a node's children when it is clicked.
	pub enable_node_expansion: bool,
	/// See [`NodeClickCallback`].
	pub on_node_click: Option<NodeClickCallback>,
	/// See [`NodeExpandCallback`].
	pub on_node_expand: Option<NodeExpandCallback>,
	/// See [`GraphReadyCallback`].
	pub on_graph_ready: Option<GraphReadyCallback>,
}

impl fmt::Debug for Options {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Options")
			.field("node_style", &self.node_style)
			.field("edge_style", &self.edge_style)
			.field("layout", &self.layout)
			.field("behaviors", &self.behaviors)
			.field("toolbar", &self.toolbar)
			.field("auto_fit", &self.auto_fit)
			.field("enable_node_expansion", &self.enable_node_expansion)
			.field("on_node_click", &self.on_node_click.is_some())
			.field("on_node_expand", &self.on_node_expand.is_some())
			.field("on_graph_ready", &self.on_graph_ready.is_some())
			.finish()
	}
}

fn layer_of(node: Option<&Node>) -> Option<i64> {
	node.and_then(|n| n.layer)
}

impl Default for Options {
	fn default() -> Self {
		Self {
			node_style: NodeStyle {
				size: NodeAttr::computed(|d| d.size.filter(|s| *s > 0.0).unwrap_or(30.0)),
				fill: NodeAttr::computed(|d| {
					d.color
						.clone()
						.filter(|c| !c.is_empty())
						.unwrap_or_else(|| "#FF6B6B".to_string())
				}),
				label_text: NodeAttr::computed(|d| d.label.clone()),
				label_placement: "center".to_string(),
				label_fill: "#333".to_string(),
				extra: Map::new(),
			},
			edge_style: EdgeStyle {
				stroke: "#aaa".to_string(),
				extra: Map::new(),
			},
			layout: LayoutOptions {
				kind: "d3-force".to_string(),
				link: LinkForce {
					distance: LinkAttr::computed(|source, target| {
						match (source, target) {
							(Some(_), Some(_)) if layer_of(source) == Some(1) => 120.0,
							_ => 100.0,
						}
					}),
					strength: LinkAttr::Fixed(0.7),
				},
				many_body: ManyBodyForce {
					strength: NodeAttr::computed(|d| if d.layer == Some(1) { -60.0 } else { -30.0 }),
				},
				collide: CollideForce {
					radius: 40.0,
					strength: 0.8,
				},
				center: CenterForce { strength: 0.0 },
				radial: RadialForce {
					strength: NodeAttr::computed(|d| match d.layer {
						Some(1) => 0.0,
						Some(2) => 0.001,
						_ => 0.01,
					}),
					radius: NodeAttr::computed(|d| match d.layer {
						Some(1) => 15.0,
						Some(2) => 210.0,
						_ => 360.0,
					}),
					x: 0.0,
					y: 0.0,
				},
				extra: Map::new(),
			},
			behaviors: vec![
				Behavior::configured("drag-element-force", &[("fixed", Value::Bool(true))]),
				Behavior::configured("click-select", &[("state", Value::from("active"))]),
				Behavior::Named("zoom-canvas".to_string()),
			],
			toolbar: ToolbarOptions {
				enabled: true,
				position: ToolbarPosition::TopLeft,
				items: ["zoom-in", "zoom-out", "auto-fit", "reset"]
					.into_iter()
					.map(String::from)
					.collect(),
			},
			auto_fit: true,
			enable_node_expansion: true,
			on_node_click: None,
			on_node_expand: None,
			on_graph_ready: None,
		}
	}
}

/// Overrides for [`NodeStyle`]; each field mirrors the resolved one.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeStylePatch {
	pub size: Option<NodeAttr<f64>>,
	pub fill: Option<NodeAttr<String>>,
	pub label_text: Option<NodeAttr<String>>,
	pub label_placement: Option<String>,
	pub label_fill: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Overrides for [`EdgeStyle`]; each field mirrors the resolved one.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EdgeStylePatch {
	pub stroke: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Overrides for [`LinkForce`]; each field mirrors the resolved one.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkForcePatch {
	pub distance: Option<LinkAttr>,
	pub strength: Option<LinkAttr>,
}

/// Overrides for [`ManyBodyForce`]; each field mirrors the resolved one.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ManyBodyForcePatch {
	pub strength: Option<NodeAttr<f64>>,
}

/// Overrides for [`CollideForce`]; each field mirrors the resolved one.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CollideForcePatch {
	pub radius: Option<f64>,
	pub strength: Option<f64>,
}

/// Overrides for [`CenterForce`]; each field mirrors the resolved one.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CenterForcePatch {
	pub strength: Option<f64>,
}

/// Overrides for [`RadialForce`]; each field mirrors the resolved one.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RadialForcePatch {
	pub strength: Option<NodeAttr<f64>>,
	pub radius: Option<NodeAttr<f64>>,
	pub x: Option<f64>,
	pub y: Option<f64>,
}

/// Overrides for [`LayoutOptions`]; each field mirrors the resolved one.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutPatch {
	#[serde(rename = "type")]
	pub kind: Option<String>,
	pub link: Option<LinkForcePatch>,
	pub many_body: Option<ManyBodyForcePatch>,
	pub collide: Option<CollideForcePatch>,
	pub center: Option<CenterForcePatch>,
	pub radial: Option<RadialForcePatch>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Overrides for [`ToolbarOptions`]; each field mirrors the resolved one.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ToolbarPatch {
	pub enabled: Option<bool>,
	pub position: Option<ToolbarPosition>,
	pub items: Option<Vec<String>>,
}

/// Caller overrides for [`Options`]. Absent fields keep the current value.
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct OptionsPatch {
	pub node_style: Option<NodeStylePatch>,
	pub edge_style: Option<EdgeStylePatch>,
	pub layout: Option<LayoutPatch>,
	pub behaviors: Option<Vec<Behavior>>,
	pub toolbar: Option<ToolbarPatch>,
	pub auto_fit: Option<bool>,
	pub enable_node_expansion: Option<bool>,
	#[serde(skip)]
	pub on_node_click: Option<NodeClickCallback>,
	#[serde(skip)]
	pub on_node_expand: Option<NodeExpandCallback>,
	#[serde(skip)]
	pub on_graph_ready: Option<GraphReadyCallback>,
}

impl fmt::Debug for OptionsPatch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OptionsPatch")
			.field("node_style", &self.node_style)
			.field("edge_style", &self.edge_style)
			.field("layout", &self.layout)
			.field("behaviors", &self.behaviors)
			.field("toolbar", &self.toolbar)
			.field("auto_fit", &self.auto_fit)
			.field("enable_node_expansion", &self.enable_node_expansion)
			.finish_non_exhaustive()
	}
}

/// Copies every present patch field over the target field.
macro_rules! overlay {
	($target:expr, $patch:expr; $($field:ident),+ $(,)?) => {
		$(
			if let Some(value) = $patch.$field {
				$target.$field = value;
			}
		)+
	};
}

/// Recursive merge for pass-through JSON. Objects merge key by key, any other
/// value replaces.
fn merge_json(target: &mut Map<String, Value>, patch: Map<String, Value>) {
	for (key, value) in patch {
		match (target.get_mut(&key), value) {
			(Some(Value::Object(existing)), Value::Object(nested)) => merge_json(existing, nested),
			(_, Value::Object(nested)) => {
				let mut fresh = Map::new();
				merge_json(&mut fresh, nested);
				target.insert(key, Value::Object(fresh));
			}
			(_, value) => {
				target.insert(key, value);
			}
		}
	}
}

impl NodeStyle {
	fn apply(&mut self, patch: NodeStylePatch) {
		overlay!(self, patch; size, fill, label_text, label_placement, label_fill);
		merge_json(&mut self.extra, patch.extra);
	}
}

impl EdgeStyle {
	fn apply(&mut self, patch: EdgeStylePatch) {
		overlay!(self, patch; stroke);
		merge_json(&mut self.extra, patch.extra);
	}
}

impl LayoutOptions {
	fn apply(&mut self, patch: LayoutPatch) {
		overlay!(self, patch; kind);
		if let Some(link) = patch.link {
			overlay!(self.link, link; distance, strength);
		}
		if let Some(many_body) = patch.many_body {
			overlay!(self.many_body, many_body; strength);
		}
		if let Some(collide) = patch.collide {
			overlay!(self.collide, collide; radius, strength);
		}
		if let Some(center) = patch.center {
			overlay!(self.center, center; strength);
		}
		if let Some(radial) = patch.radial {
			overlay!(self.radial, radial; strength, radius, x, y);
		}
		merge_json(&mut self.extra, patch.extra);
	}
}

impl Options {
	/// Resolves caller overrides against the built-in defaults.
	pub fn resolve(patch: Option<OptionsPatch>) -> Self {
		let mut options = Self::default();
		if let Some(patch) = patch {
			options.apply(patch);
		}
		options
	}

	/// Returns a copy of `self` with `patch` merged on top.
	pub fn merged(&self, patch: OptionsPatch) -> Self {
		let mut options = self.clone();
		options.apply(patch);
		options
	}

	/// Merges `patch` into `self` in place.
	pub fn apply(&mut self, patch: OptionsPatch) {
		if let Some(node_style) = patch.node_style {
			self.node_style.apply(node_style);
		}
		if let Some(edge_style) = patch.edge_style {
			self.edge_style.apply(edge_style);
		}
		if let Some(layout) = patch.layout {
			self.layout.apply(layout);
		}
		if let Some(toolbar) = patch.toolbar {
			overlay!(self.toolbar, toolbar; enabled, position, items);
		}
		overlay!(self, patch; behaviors, auto_fit, enable_node_expansion);
		if let Some(callback) = patch.on_node_click {
			self.on_node_click = Some(callback);
		}
		if let Some(callback) = patch.on_node_expand {
			self.on_node_expand = Some(callback);
		}
		if let Some(callback) = patch.on_graph_ready {
			self.on_graph_ready = Some(callback);
		}
	}
}
