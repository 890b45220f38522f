//! Whole-grid overview with a draggable viewport indicator.
//!
//! The minimap draws every cell at `cell_px` pixels and never touches the main
//! viewport: drags produce a world point (in cells) for the owner to center on.
//! The static cell layer is cached by the host and only repainted while
//! [`Minimap::take_layer_dirty`] reports a change.

use pixelgrid_shared::{GridPos, Reservation};

use crate::blocks::BlockIndex;
use crate::colors::{self, brighten};
use crate::surface::Surface;
use crate::viewport::{ScreenRect, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
struct MinimapDrag {
    /// World offset from the pointer to the viewport center, held for the whole drag.
    grab: (f64, f64),
}

#[derive(Debug)]
pub struct Minimap {
    cols: i32,
    rows: i32,
    cell_px: f64,
    layer_dirty: bool,
    drag: Option<MinimapDrag>,
}

impl Minimap {
    pub fn new(cols: i32, rows: i32, cell_px: f64) -> Self {
        Self {
            cols,
            rows,
            cell_px,
            layer_dirty: true,
            drag: None,
        }
    }

    /// Minimap size in pixels.
    pub fn size(&self) -> (f64, f64) {
        (self.cols as f64 * self.cell_px, self.rows as f64 * self.cell_px)
    }

    /// Adopt a new grid shape or scale; the layer is repainted only if either changed.
    pub fn reconfigure(&mut self, cols: i32, rows: i32, cell_px: f64) {
        if (cols, rows, cell_px) != (self.cols, self.rows, self.cell_px) {
            self.cols = cols;
            self.rows = rows;
            self.cell_px = cell_px;
            self.layer_dirty = true;
        }
    }

    pub fn mark_layer_dirty(&mut self) {
        self.layer_dirty = true;
    }

    /// Returns and clears the layer-dirty flag.
    pub fn take_layer_dirty(&mut self) -> bool {
        std::mem::take(&mut self.layer_dirty)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    fn to_world(&self, mx: f64, my: f64) -> (f64, f64) {
        (mx / self.cell_px, my / self.cell_px)
    }

    /// The main viewport's visible world region, in minimap pixels.
    pub fn indicator_rect(&self, vp: &Viewport, view_w: f64, view_h: f64) -> ScreenRect {
        let (wx, wy) = vp.screen_to_world(0.0, 0.0);
        let cell = vp.cell_size();
        ScreenRect::new(
            wx * self.cell_px,
            wy * self.cell_px,
            view_w / cell * self.cell_px,
            view_h / cell * self.cell_px,
        )
    }

    /// Start a drag. Grabbing the indicator keeps the grabbed point under the pointer;
    /// anywhere else snaps the indicator's center to the pointer right away.
    pub fn pointer_down(
        &mut self,
        mx: f64,
        my: f64,
        vp: &Viewport,
        view_w: f64,
        view_h: f64,
    ) -> Option<(f64, f64)> {
        let pointer = self.to_world(mx, my);
        if self.indicator_rect(vp, view_w, view_h).contains(mx, my) {
            let center = vp.center(view_w, view_h);
            self.drag = Some(MinimapDrag {
                grab: (center.0 - pointer.0, center.1 - pointer.1),
            });
            None
        } else {
            self.drag = Some(MinimapDrag { grab: (0.0, 0.0) });
            Some(pointer)
        }
    }

    /// World point the main viewport should center on, while a drag is active.
    pub fn pointer_move(&mut self, mx: f64, my: f64) -> Option<(f64, f64)> {
        let drag = self.drag?;
        let pointer = self.to_world(mx, my);
        Some((pointer.0 + drag.grab.0, pointer.1 + drag.grab.1))
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// Paint the static layer: background, owned cells, reserved cells.
    pub fn render_layer<S: Surface>(&self, surface: &mut S, blocks: &BlockIndex, reservation: &dyn Reservation) {
        let (width, height) = self.size();
        surface.fill_rect(ScreenRect::new(0.0, 0.0, width, height), colors::MINIMAP_BACKGROUND);

        for y in 0..self.rows {
            for x in 0..self.cols {
                let rect = ScreenRect::new(
                    x as f64 * self.cell_px,
                    y as f64 * self.cell_px,
                    self.cell_px,
                    self.cell_px,
                );
                if reservation.is_reserved(x, y) {
                    surface.fill_rect(rect, colors::RESERVED_FILL);
                    continue;
                }
                let Some(resolved) = blocks.resolve(GridPos::new(x, y)) else {
                    continue;
                };
                let cell = resolved.cell;
                let Some(color) = colors::overview_color(cell.color.as_deref(), cell.owner.as_deref()) else {
                    continue;
                };
                let color = if cell.is_for_sale() { brighten(color, 1.3) } else { color };
                surface.fill_rect(rect, color);
            }
        }
    }

    pub fn render_indicator<S: Surface>(&self, surface: &mut S, vp: &Viewport, view_w: f64, view_h: f64) {
        let rect = self.indicator_rect(vp, view_w, view_h);
        surface.fill_rect(rect, colors::MINIMAP_INDICATOR.with_alpha(0.12));
        surface.stroke_rect(rect, colors::MINIMAP_INDICATOR, 1.5);
    }

    /// Full repaint without a cached layer.
    pub fn render<S: Surface>(
        &self,
        surface: &mut S,
        blocks: &BlockIndex,
        reservation: &dyn Reservation,
        vp: &Viewport,
        view_w: f64,
        view_h: f64,
    ) {
        self.render_layer(surface, blocks, reservation);
        self.render_indicator(surface, vp, view_w, view_h);
    }
}
