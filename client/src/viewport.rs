//! Pan/zoom transform between grid (world) coordinates and screen pixels.
//!
//! World coordinates are measured in cells: `(2.5, 0.0)` is the middle of the top edge
//! of column 2. A cell occupies `base_cell_px * zoom` screen pixels per side.

use pixelgrid_shared::GridPos;

use crate::config::GridConfig;

/// Tolerance applied before flooring so that exact cell corners survive float error.
const GRID_EPSILON: f64 = 1e-9;

/// `(col * cell_size + pan.x, row * cell_size + pan.y)`.
pub fn world_to_screen(col: f64, row: f64, cell_size: f64, pan: (f64, f64)) -> (f64, f64) {
    (col * cell_size + pan.0, row * cell_size + pan.1)
}

/// Floor of the inverse of [`world_to_screen`].
pub fn screen_to_grid(x: f64, y: f64, cell_size: f64, pan: (f64, f64)) -> (i32, i32) {
    (
        ((x - pan.0) / cell_size + GRID_EPSILON).floor() as i32,
        ((y - pan.1) / cell_size + GRID_EPSILON).floor() as i32,
    )
}

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl ScreenRect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Normalized rectangle spanning two arbitrary corners.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            w: (a.0 - b.0).abs(),
            h: (a.1 - b.1).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && py >= self.y && px <= self.right() && py <= self.bottom()
    }

    /// True when any part of the rectangle lies inside a `w × h` surface at the origin.
    pub fn intersects_surface(&self, w: f64, h: f64) -> bool {
        self.right() >= 0.0 && self.bottom() >= 0.0 && self.x <= w && self.y <= h
    }
}

/// Inclusive rectangle of grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridRange {
    pub min_col: i32,
    pub max_col: i32,
    pub min_row: i32,
    pub max_row: i32,
}

impl GridRange {
    pub fn single(pos: GridPos) -> Self {
        Self {
            min_col: pos.x,
            max_col: pos.x,
            min_row: pos.y,
            max_row: pos.y,
        }
    }

    /// Normalize two corners in any order.
    pub fn from_corners(a: GridPos, b: GridPos) -> Self {
        Self {
            min_col: a.x.min(b.x),
            max_col: a.x.max(b.x),
            min_row: a.y.min(b.y),
            max_row: a.y.max(b.y),
        }
    }

    /// Cells touched by the world-space rectangle spanning `a` and `b`.
    ///
    /// The far edge is exclusive, so a box ending exactly on a cell boundary does not
    /// include the next cell. A zero-area box yields the single cell under it.
    pub fn from_world_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        let axis = |lo: f64, hi: f64| {
            let first = (lo + GRID_EPSILON).floor() as i32;
            // `as` saturates for far-off pans; keep the arithmetic saturating too.
            let last = ((hi - GRID_EPSILON).ceil() as i32).saturating_sub(1).max(first);
            (first, last)
        };
        let (min_col, max_col) = axis(a.0.min(b.0), a.0.max(b.0));
        let (min_row, max_row) = axis(a.1.min(b.1), a.1.max(b.1));
        Self {
            min_col,
            max_col,
            min_row,
            max_row,
        }
    }

    /// Intersect with `[0, cols) × [0, rows)`. `None` when nothing is left.
    pub fn clamp_to(&self, cols: i32, rows: i32) -> Option<Self> {
        let clamped = Self {
            min_col: self.min_col.max(0),
            max_col: self.max_col.min(cols - 1),
            min_row: self.min_row.max(0),
            max_row: self.max_row.min(rows - 1),
        };
        (clamped.min_col <= clamped.max_col && clamped.min_row <= clamped.max_row)
            .then_some(clamped)
    }

    pub fn expand(&self, by: i32) -> Self {
        Self {
            min_col: self.min_col.saturating_sub(by),
            max_col: self.max_col.saturating_add(by),
            min_row: self.min_row.saturating_sub(by),
            max_row: self.max_row.saturating_add(by),
        }
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        pos.x >= self.min_col && pos.x <= self.max_col && pos.y >= self.min_row && pos.y <= self.max_row
    }

    pub fn width(&self) -> i32 {
        self.max_col - self.min_col + 1
    }

    pub fn height(&self) -> i32 {
        self.max_row - self.min_row + 1
    }

    pub fn min_pos(&self) -> GridPos {
        GridPos::new(self.min_col, self.min_row)
    }

    /// Row-major iteration over every coordinate.
    pub fn iter(&self) -> impl Iterator<Item = GridPos> + use<> {
        let (min_col, max_col) = (self.min_col, self.max_col);
        (self.min_row..=self.max_row)
            .flat_map(move |y| (min_col..=max_col).map(move |x| GridPos::new(x, y)))
    }
}

/// Pan offset (screen pixels) plus a clamped zoom factor.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub pan_x: f64,
    pub pan_y: f64,
    zoom: f64,
    base_cell_px: f64,
    zoom_min: f64,
    zoom_max: f64,
}

impl Viewport {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: config.clamp_zoom(config.initial_zoom),
            base_cell_px: config.base_cell_px,
            zoom_min: config.zoom_min,
            zoom_max: config.zoom_max,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn base_cell_px(&self) -> f64 {
        self.base_cell_px
    }

    /// Screen pixels per cell edge.
    pub fn cell_size(&self) -> f64 {
        self.base_cell_px * self.zoom
    }

    pub fn pan_offset(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    pub fn world_to_screen(&self, col: f64, row: f64) -> (f64, f64) {
        world_to_screen(col, row, self.cell_size(), self.pan_offset())
    }

    /// Fractional world coordinate (in cells) under a screen point.
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        let cell = self.cell_size();
        ((sx - self.pan_x) / cell, (sy - self.pan_y) / cell)
    }

    pub fn screen_to_grid(&self, sx: f64, sy: f64) -> GridPos {
        screen_to_grid(sx, sy, self.cell_size(), self.pan_offset()).into()
    }

    /// Screen rectangle covered by a `w × h` run of cells starting at `pos`.
    pub fn cell_rect(&self, pos: GridPos, w: i32, h: i32) -> ScreenRect {
        let cell = self.cell_size();
        let (sx, sy) = self.world_to_screen(pos.x as f64, pos.y as f64);
        ScreenRect::new(sx, sy, w as f64 * cell, h as f64 * cell)
    }

    /// Zoom to `target` (clamped) keeping the world point under `(sx, sy)` fixed.
    pub fn zoom_to(&mut self, target: f64, sx: f64, sy: f64) {
        if !target.is_finite() {
            return;
        }
        let new_zoom = target.clamp(self.zoom_min, self.zoom_max);
        let ratio = new_zoom / self.zoom;
        self.pan_x = sx - (sx - self.pan_x) * ratio;
        self.pan_y = sy - (sy - self.pan_y) * ratio;
        self.zoom = new_zoom;
    }

    /// Wheel-style zoom: positive `delta` zooms out.
    pub fn zoom_at(&mut self, delta: f64, sensitivity: f64, sx: f64, sy: f64) {
        self.zoom_to(self.zoom - delta * sensitivity, sx, sy);
    }

    /// Pinch-style zoom: `ratio` is current / previous finger distance.
    pub fn zoom_by_ratio(&mut self, ratio: f64, sx: f64, sy: f64) {
        if ratio > 0.0 {
            self.zoom_to(self.zoom * ratio, sx, sy);
        }
    }

    /// Pan by screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Put world point `(wx, wy)` (in cells) at the center of a `w × h` viewport.
    pub fn center_on(&mut self, wx: f64, wy: f64, w: f64, h: f64) {
        let cell = self.cell_size();
        self.pan_x = w / 2.0 - wx * cell;
        self.pan_y = h / 2.0 - wy * cell;
    }

    /// World point currently at the center of a `w × h` viewport.
    pub fn center(&self, w: f64, h: f64) -> (f64, f64) {
        self.screen_to_world(w / 2.0, h / 2.0)
    }

    /// Fit a `cols × rows` grid into the viewport with fractional `padding` on each side.
    pub fn fit_grid(&mut self, cols: i32, rows: i32, canvas_w: f64, canvas_h: f64, padding: f64) {
        let world_w = cols as f64 * self.base_cell_px;
        let world_h = rows as f64 * self.base_cell_px;
        if world_w <= 0.0 || world_h <= 0.0 || canvas_w <= 0.0 || canvas_h <= 0.0 {
            return;
        }

        let zoom_x = canvas_w / (world_w * (1.0 + padding * 2.0));
        let zoom_y = canvas_h / (world_h * (1.0 + padding * 2.0));
        self.zoom = zoom_x.min(zoom_y).clamp(self.zoom_min, self.zoom_max);
        self.center_on(cols as f64 / 2.0, rows as f64 / 2.0, canvas_w, canvas_h);
    }

    /// Grid cells intersecting a `w × h` viewport, grown by `buffer` cells and clamped
    /// to the grid. `None` when the viewport shows no part of the grid.
    pub fn visible_range(&self, w: f64, h: f64, buffer: i32, cols: i32, rows: i32) -> Option<GridRange> {
        let top_left = self.screen_to_world(0.0, 0.0);
        let bottom_right = self.screen_to_world(w.max(0.0), h.max(0.0));
        GridRange::from_world_corners(top_left, bottom_right)
            .expand(buffer)
            .clamp_to(cols, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < 1e-9, "expected {expected}, got {actual} (diff: {diff})");
    }

    fn viewport() -> Viewport {
        Viewport::new(&GridConfig::default())
    }

    #[test]
    fn world_to_screen_applies_cell_size_and_pan() {
        assert_eq!(world_to_screen(3.0, 4.0, 8.0, (10.0, -5.0)), (34.0, 27.0));
        assert_eq!(screen_to_grid(34.0, 27.0, 8.0, (10.0, -5.0)), (3, 4));
        assert_eq!(screen_to_grid(33.9, 26.9, 8.0, (10.0, -5.0)), (2, 3));
    }

    #[test]
    fn screen_to_grid_floors_negative_positions() {
        let vp = viewport();
        assert_eq!(vp.screen_to_grid(-0.5, -9.0), GridPos::new(-1, -2));
    }

    #[test]
    fn zoom_out_and_back_restores_state() {
        let mut vp = viewport();
        vp.pan(13.0, -7.0);
        vp.zoom_at(300.0, 0.001, 100.0, 100.0);
        assert_close(vp.zoom(), 0.7);
        vp.zoom_at(-300.0, 0.001, 100.0, 100.0);
        assert_close(vp.zoom(), 1.0);
        assert_close(vp.pan_x, 13.0);
        assert_close(vp.pan_y, -7.0);
    }

    #[test]
    fn zoom_is_clamped_in_both_directions() {
        let mut vp = viewport();
        for _ in 0..100 {
            vp.zoom_at(1_000.0, 0.001, 50.0, 50.0);
        }
        assert_eq!(vp.zoom(), 0.1);
        for _ in 0..100 {
            vp.zoom_by_ratio(1.5, 50.0, 50.0);
        }
        assert_eq!(vp.zoom(), 6.0);
    }

    #[test]
    fn non_finite_or_non_positive_inputs_are_ignored() {
        let mut vp = viewport();
        vp.zoom_to(f64::NAN, 0.0, 0.0);
        vp.zoom_by_ratio(0.0, 0.0, 0.0);
        vp.zoom_by_ratio(-2.0, 0.0, 0.0);
        assert_eq!(vp.zoom(), 1.0);
    }

    #[test]
    fn fit_grid_centers_the_grid() {
        let mut vp = viewport();
        vp.fit_grid(100, 100, 1000.0, 800.0, 0.0);
        assert_close(vp.zoom(), 1.0);
        assert_close(vp.pan_x, 100.0);
        assert_close(vp.pan_y, 0.0);
        let (cx, cy) = vp.center(1000.0, 800.0);
        assert_close(cx, 50.0);
        assert_close(cy, 50.0);
    }

    #[test]
    fn visible_range_is_buffered_and_clamped() {
        let mut vp = viewport();
        let range = vp.visible_range(80.0, 40.0, 2, 100, 100).unwrap();
        assert_eq!(
            range,
            GridRange {
                min_col: 0,
                max_col: 11,
                min_row: 0,
                max_row: 6
            }
        );

        vp.pan(-4_000.0, 0.0);
        assert_eq!(vp.visible_range(80.0, 40.0, 2, 100, 100), None);
    }

    #[test]
    fn far_pans_saturate_instead_of_overflowing() {
        let mut vp = viewport();
        vp.pan(1e12, 0.0);
        assert_eq!(vp.visible_range(800.0, 600.0, 2, 100, 100), None);

        vp.pan(-2e12, -1e12);
        assert_eq!(vp.visible_range(800.0, 600.0, 2, 100, 100), None);

        let edge = GridRange::single(GridPos::new(i32::MAX, i32::MIN)).expand(3);
        assert_eq!((edge.max_col, edge.min_row), (i32::MAX, i32::MIN));
    }

    #[test]
    fn world_corner_ranges_exclude_the_far_boundary() {
        let range = GridRange::from_world_corners((3.0, 2.0), (0.0, 0.0));
        assert_eq!(range, GridRange::from_corners(GridPos::new(0, 0), GridPos::new(2, 1)));

        let point = GridRange::from_world_corners((2.0, 2.0), (2.0, 2.0));
        assert_eq!((point.width(), point.height()), (1, 1));
        assert_eq!(point.min_pos(), GridPos::new(2, 2));
    }

    #[test]
    fn grid_range_iterates_row_major_and_clamps() {
        let range = GridRange::from_corners(GridPos::new(1, 1), GridPos::new(-1, 0))
            .clamp_to(10, 10)
            .unwrap();
        let cells: Vec<_> = range.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(cells, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert_eq!(GridRange::single(GridPos::new(20, 0)).clamp_to(10, 10), None);
    }

    #[test]
    fn screen_rect_from_corners_normalizes() {
        let rect = ScreenRect::from_corners((10.0, 30.0), (4.0, 2.0));
        assert_eq!(rect, ScreenRect::new(4.0, 2.0, 6.0, 28.0));
        assert!(rect.contains(5.0, 29.0));
        assert!(!rect.contains(11.0, 29.0));
        assert_eq!(rect.center(), (7.0, 16.0));
    }

    proptest! {
        #[test]
        fn grid_round_trip(
            col in 0i32..100,
            row in 0i32..100,
            pan_x in -5_000.0f64..5_000.0,
            pan_y in -5_000.0f64..5_000.0,
            zoom in 0.1f64..6.0,
        ) {
            let cell = 8.0 * zoom;
            let (sx, sy) = world_to_screen(col as f64, row as f64, cell, (pan_x, pan_y));
            prop_assert_eq!(screen_to_grid(sx, sy, cell, (pan_x, pan_y)), (col, row));
        }

        #[test]
        fn zoom_keeps_pointer_anchor(
            delta in -4_000.0f64..4_000.0,
            px in 0.0f64..1_200.0,
            py in 0.0f64..800.0,
            pan_x in -2_000.0f64..2_000.0,
            pan_y in -2_000.0f64..2_000.0,
        ) {
            let mut vp = viewport();
            vp.pan(pan_x, pan_y);
            let before = vp.screen_to_world(px, py);
            vp.zoom_at(delta, 0.001, px, py);
            prop_assert!(vp.zoom() >= 0.1 && vp.zoom() <= 6.0);
            let (sx, sy) = vp.world_to_screen(before.0, before.1);
            prop_assert!((sx - px).abs() < 1e-6);
            prop_assert!((sy - py).abs() < 1e-6);
        }
    }
}
