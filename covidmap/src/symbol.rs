//! Visual parameters of the features the session puts on the map.
//!
//! Engines decide how to draw them; these values only describe what should be
//! drawn.

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);

    /// Creates a color from its components.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Symbol of a marker cluster: the marker icon with the member count on top.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSymbol {
    /// Text drawn over the icon.
    pub label: String,
    /// Icon anchor: horizontal fraction of the icon width, vertical offset in pixels.
    pub icon_anchor: [f32; 2],
    /// Icon opacity.
    pub icon_opacity: f32,
    /// Vertical text offset in pixels.
    pub text_offset_y: f32,
    /// Text scale.
    pub text_scale: f32,
    /// Text fill.
    pub text_fill: Color,
    /// Text outline.
    pub text_stroke: Color,
    /// Text outline width in pixels.
    pub text_stroke_width: f32,
}

impl ClusterSymbol {
    /// Symbol for a cluster with `size` members.
    pub fn for_size(size: usize) -> Self {
        Self {
            label: size.to_string(),
            icon_anchor: [0.5, 48.0],
            icon_opacity: 0.95,
            text_offset_y: -12.0,
            text_scale: 1.1,
            text_fill: Color::WHITE,
            text_stroke: Color::BLACK,
            text_stroke_width: 2.0,
        }
    }
}

/// Symbol of the dot that shows the device position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserPositionSymbol {
    /// Radius in pixels.
    pub radius: f32,
    /// Fill color.
    pub fill: Color,
    /// Outline color.
    pub stroke: Color,
    /// Outline width in pixels.
    pub stroke_width: f32,
}

impl Default for UserPositionSymbol {
    fn default() -> Self {
        Self {
            radius: 8.0,
            fill: Color::rgba(0x33, 0x99, 0xCC, 255),
            stroke: Color::WHITE,
            stroke_width: 2.0,
        }
    }
}
