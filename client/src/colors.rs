use pixelgrid_shared::colors::parse_hex_color;
use pixelgrid_shared::owner_color;

/// RGB plus float alpha, as drawn by a [`crate::surface::Surface`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Format as a CSS color string.
    pub fn css(&self) -> String {
        rgba_css(self.r, self.g, self.b, self.a)
    }
}

pub const BACKGROUND: Rgba = Rgba::new(12, 14, 23, 1.0);
pub const EMPTY_CELL: Rgba = Rgba::new(26, 30, 44, 1.0);
pub const GRID_LINE: Rgba = Rgba::new(255, 255, 255, 0.07);
pub const RESERVED_FILL: Rgba = Rgba::new(70, 74, 92, 0.85);
pub const RESERVED_HATCH: Rgba = Rgba::new(150, 156, 180, 0.35);
pub const SALE_BORDER: Rgba = Rgba::new(245, 197, 66, 0.9);
pub const SALE_TAG_BG: Rgba = Rgba::new(20, 22, 32, 0.85);
pub const SALE_TAG_TEXT: Rgba = Rgba::new(245, 197, 66, 1.0);
pub const LABEL_TEXT: Rgba = Rgba::new(240, 240, 245, 0.95);
pub const HOVER_FILL: Rgba = Rgba::new(255, 255, 255, 0.18);
pub const HOVER_STROKE: Rgba = Rgba::new(255, 255, 255, 0.75);
pub const SELECTION_STROKE: Rgba = Rgba::new(168, 85, 247, 0.95);
pub const SELECTION_FILL: Rgba = Rgba::new(168, 85, 247, 0.2);
pub const BOX_FILL: Rgba = Rgba::new(96, 165, 250, 0.18);
pub const BOX_STROKE: Rgba = Rgba::new(96, 165, 250, 0.9);
pub const BOX_CONFLICT: Rgba = Rgba::new(235, 87, 87, 0.45);
pub const BOX_LABEL_BG: Rgba = Rgba::new(19, 22, 31, 0.9);
pub const MINIMAP_BACKGROUND: Rgba = Rgba::new(19, 22, 31, 1.0);
pub const MINIMAP_INDICATOR: Rgba = Rgba::new(245, 197, 66, 0.8);

pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    format!("rgba({r},{g},{b},{a})")
}

/// Brighten a color by a factor (1.0 = no change, >1.0 = brighter).
pub fn brighten(color: Rgba, factor: f64) -> Rgba {
    let scale = |c: u8| (c as f64 * factor).clamp(0.0, 255.0) as u8;
    Rgba {
        r: scale(color.r),
        g: scale(color.g),
        b: scale(color.b),
        a: color.a,
    }
}

/// Explicit display color of a cell, if it parses.
pub fn cell_color(color: Option<&str>) -> Option<Rgba> {
    color.and_then(parse_hex_color).map(Rgba::opaque)
}

/// Overview color: the cell's own color, else a hash of the owner.
pub fn overview_color(color: Option<&str>, owner: Option<&str>) -> Option<Rgba> {
    cell_color(color).or_else(|| {
        owner
            .filter(|o| !o.is_empty())
            .map(|o| Rgba::opaque(owner_color(o)))
    })
}
