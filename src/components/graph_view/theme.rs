//! Colors and fixed visual parameters of the canvas engine.
//!
//! Per-node colors come from the visualizer's style accessors as CSS strings;
//! this module parses them so nodes can be drawn with a shaded gradient.

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	#[allow(missing_docs)]
	pub r: u8,
	#[allow(missing_docs)]
	pub g: u8,
	#[allow(missing_docs)]
	pub b: u8,
	/// Opacity in [0, 1].
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with opacity `a`.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same color with opacity `a`.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Lighten the color by a factor (0.0 = unchanged, 1.0 = white)
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 + (255.0 - self.r as f64) * f) as u8,
			g: (self.g as f64 + (255.0 - self.g as f64) * f) as u8,
			b: (self.b as f64 + (255.0 - self.b as f64) * f) as u8,
			a: self.a,
		}
	}

	/// Darken the color by a factor (0.0 = unchanged, 1.0 = black)
	pub fn darken(self, factor: f64) -> Self {
		let f = 1.0 - factor.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * f) as u8,
			g: (self.g as f64 * f) as u8,
			b: (self.b as f64 * f) as u8,
			a: self.a,
		}
	}

	/// `#rrggbb` when opaque, `rgba(..)` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

const FALLBACK: Color = Color::rgb(128, 128, 128);

/// Parses a CSS color string into a [`Color`].
/// Supports hex (`#RGB`, `#RRGGBB`) and `rgb()`/`rgba()` functional notation;
/// anything else falls back to mid gray.
pub fn parse_color(color_str: &str) -> Color {
	let color_str = color_str.trim();
	if let Some(hex) = color_str.strip_prefix('#') {
		let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(128);
		return match hex.len() {
			_ if !hex.is_ascii() => FALLBACK,
			3 => {
				let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
				Color::rgb(expand(0), expand(1), expand(2))
			}
			6 => Color::rgb(channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
			_ => FALLBACK,
		};
	}
	if color_str.starts_with("rgb") {
		let nums: Vec<&str> = color_str
			.trim_start_matches("rgba(")
			.trim_start_matches("rgb(")
			.trim_end_matches(')')
			.split(',')
			.collect();
		let channel = |i: usize| {
			nums.get(i)
				.and_then(|s| s.trim().parse().ok())
				.unwrap_or(128)
		};
		let a = nums
			.get(3)
			.and_then(|s| s.trim().parse().ok())
			.unwrap_or(1.0);
		return Color::rgba(channel(0), channel(1), channel(2), a);
	}
	FALLBACK
}

/// Fixed look of the canvas outside of per-node styling.
#[derive(Clone, Debug)]
pub struct CanvasTheme {
	/// Canvas fill behind the graph.
	pub background: Color,
	/// Edge stroke width unless an edge sets `lineWidth`.
	pub edge_width: f64,
	/// Ring drawn around the selected node.
	pub selection: Color,
	/// CSS font for node labels.
	pub label_font: String,
	/// Shade nodes with a radial gradient instead of a flat fill.
	pub node_gradient: bool,
	/// Outline around every node.
	pub node_border: Color,
}

impl Default for CanvasTheme {
	fn default() -> Self {
		Self {
			background: Color::rgb(250, 250, 250),
			edge_width: 1.5,
			selection: Color::rgb(25, 118, 210),
			label_font: "12px sans-serif".to_string(),
			node_gradient: true,
			node_border: Color::rgba(255, 255, 255, 0.8),
		}
	}
}
