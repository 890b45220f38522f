//! The single controller that owns grid interaction state.
//!
//! Every write goes through a `GridEngine` method; methods that change anything
//! visible set the redraw flag, which the host polls with [`GridEngine::take_redraw`]
//! and services on its next animation frame. Outputs for collaborators (selection and
//! hover changes) queue up as [`EngineEvent`]s.

use pixelgrid_shared::{AvatarCache, Cell, GridPos, NoReservation, Reservation};

use crate::blocks::BlockIndex;
use crate::config::{ConfigError, GridConfig};
use crate::gesture::{GestureAction, GestureController, InteractionMode, PointerInput, PointerKind};
use crate::image_cache::ImageCache;
use crate::minimap::Minimap;
use crate::renderer::{self, BoxSelect, FrameInput, FrameStats};
use crate::selection::{SelectionController, SelectionFilter, SelectionSummary};
use crate::surface::Surface;
use crate::viewport::Viewport;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Resolved selection after a completed gesture; empty when cleared.
    SelectionChanged(Vec<Cell>),
    HoverChanged(Option<Cell>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKey {
    Escape,
    ZoomIn,
    ZoomOut,
    ResetView,
    ToggleMode,
}

impl EngineKey {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Option<Self> {
        match key {
            "Escape" => Some(Self::Escape),
            "+" | "=" => Some(Self::ZoomIn),
            "-" | "_" => Some(Self::ZoomOut),
            "0" | "Home" => Some(Self::ResetView),
            "m" | "M" => Some(Self::ToggleMode),
            _ => None,
        }
    }
}

/// Pan, zoom, size, mode and hover. Read-only outside the engine.
#[derive(Debug, Clone)]
pub struct ViewportState {
    viewport: Viewport,
    width: f64,
    height: f64,
    mode: InteractionMode,
    hovered: Option<GridPos>,
    hovered_cell: Option<Cell>,
}

impl ViewportState {
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn hovered(&self) -> Option<GridPos> {
        self.hovered
    }

    pub fn hovered_cell(&self) -> Option<&Cell> {
        self.hovered_cell.as_ref()
    }
}

pub struct GridEngine<I> {
    config: GridConfig,
    state: ViewportState,
    blocks: BlockIndex,
    reservation: Box<dyn Reservation>,
    selection: SelectionController,
    gestures: GestureController,
    minimap: Minimap,
    images: ImageCache<I>,
    avatars: AvatarCache,
    unit_price: Option<f64>,
    events: Vec<EngineEvent>,
    needs_redraw: bool,
    view_initialized: bool,
    last_stats: FrameStats,
}

impl<I> GridEngine<I> {
    pub fn new(config: GridConfig) -> Self {
        Self {
            state: ViewportState {
                viewport: Viewport::new(&config),
                width: 0.0,
                height: 0.0,
                mode: InteractionMode::default(),
                hovered: None,
                hovered_cell: None,
            },
            blocks: BlockIndex::empty(config.cols, config.rows),
            reservation: Box::new(NoReservation),
            selection: SelectionController::default(),
            gestures: GestureController::new(&config),
            minimap: Minimap::new(config.cols, config.rows, config.minimap_cell_px),
            images: ImageCache::default(),
            avatars: AvatarCache::default(),
            unit_price: None,
            events: Vec::new(),
            needs_redraw: true,
            view_initialized: false,
            last_stats: FrameStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn viewport(&self) -> &Viewport {
        &self.state.viewport
    }

    pub fn blocks(&self) -> &BlockIndex {
        &self.blocks
    }

    /// Rounded zoom for a "current zoom %" indicator.
    pub fn zoom_percent(&self) -> u32 {
        (self.state.viewport.zoom() * 100.0).round() as u32
    }

    pub fn selection(&self) -> &[Cell] {
        self.selection.selected()
    }

    pub fn selection_summary(&self) -> SelectionSummary {
        self.selection.summary(self.unit_price)
    }

    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Replace the grid shape and tunables. Pan is kept; zoom is re-clamped and any
    /// selection outside the new bounds is dropped.
    pub fn set_config(&mut self, config: GridConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let (pan_x, pan_y) = self.state.viewport.pan_offset();
        let zoom = self.state.viewport.zoom();
        let mut viewport = Viewport::new(&config);
        viewport.zoom_to(zoom, 0.0, 0.0);
        viewport.pan_x = pan_x;
        viewport.pan_y = pan_y;
        self.state.viewport = viewport;

        let cells = self.blocks.cells().to_vec();
        self.blocks = BlockIndex::build(config.cols, config.rows, cells);
        self.gestures = GestureController::new(&config);
        self.minimap
            .reconfigure(config.cols, config.rows, config.minimap_cell_px);
        if self.selection.retain_in_bounds(config.cols, config.rows) {
            self.emit_selection();
        }
        tracing::debug!(cols = config.cols, rows = config.rows, "grid config applied");
        self.config = config;
        self.refresh_hover();
        self.request_redraw();
        Ok(())
    }

    /// Replace the cell data wholesale. View and selection persist.
    pub fn set_snapshot(&mut self, cells: Vec<Cell>) {
        self.blocks = BlockIndex::build(self.config.cols, self.config.rows, cells);
        self.minimap.mark_layer_dirty();
        self.refresh_hover();
        self.request_redraw();
    }

    pub fn set_reservation(&mut self, reservation: impl Reservation + 'static) {
        self.reservation = Box::new(reservation);
        self.minimap.mark_layer_dirty();
        self.request_redraw();
    }

    /// Host surface size in CSS pixels. The first non-empty size fits the grid unless
    /// a view was already chosen.
    pub fn resize(&mut self, width: f64, height: f64) {
        let (width, height) = (width.max(0.0), height.max(0.0));
        if (width, height) == self.state.size() {
            return;
        }
        self.state.width = width;
        self.state.height = height;
        if !self.view_initialized && width > 0.0 && height > 0.0 {
            self.fit_to_grid();
        }
        self.request_redraw();
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        if mode == self.state.mode {
            return;
        }
        self.gestures.cancel();
        self.state.mode = mode;
        self.request_redraw();
    }

    pub fn mode(&self) -> InteractionMode {
        self.state.mode
    }

    pub fn set_selection_filter(&mut self, filter: SelectionFilter) {
        self.selection.set_filter(filter);
        self.request_redraw();
    }

    pub fn selection_filter(&self) -> &SelectionFilter {
        self.selection.filter()
    }

    /// Price used for cells without their own sale price. The engine never picks one.
    pub fn set_unit_price(&mut self, unit_price: Option<f64>) {
        self.unit_price = unit_price.filter(|price| price.is_finite() && *price >= 0.0);
        self.request_redraw();
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear() {
            self.emit_selection();
            self.request_redraw();
        }
    }

    /// Restore an explicit view (e.g. one saved by the host).
    pub fn set_view(&mut self, pan_x: f64, pan_y: f64, zoom: f64) {
        let vp = &mut self.state.viewport;
        vp.zoom_to(zoom, 0.0, 0.0);
        vp.pan_x = pan_x;
        vp.pan_y = pan_y;
        self.view_initialized = true;
        self.refresh_hover();
        self.request_redraw();
    }

    /// Center cell `(x, y)` (clamped to the grid), optionally at a new zoom.
    pub fn jump_to(&mut self, x: i32, y: i32, zoom: Option<f64>) {
        let x = x.clamp(0, self.config.cols - 1);
        let y = y.clamp(0, self.config.rows - 1);
        let (width, height) = self.state.size();
        let vp = &mut self.state.viewport;
        if let Some(zoom) = zoom {
            vp.zoom_to(zoom, width / 2.0, height / 2.0);
        }
        vp.center_on(x as f64 + 0.5, y as f64 + 0.5, width, height);
        self.view_initialized = true;
        self.refresh_hover();
        self.request_redraw();
    }

    pub fn fit_to_grid(&mut self) {
        let (width, height) = self.state.size();
        self.state.viewport.fit_grid(
            self.config.cols,
            self.config.rows,
            width,
            height,
            self.config.fit_padding,
        );
        self.view_initialized = true;
        self.refresh_hover();
        self.request_redraw();
    }

    pub fn key(&mut self, key: EngineKey) {
        let (width, height) = self.state.size();
        let (cx, cy) = (width / 2.0, height / 2.0);
        match key {
            EngineKey::Escape => {
                if self.gestures.cancel().is_some() {
                    self.request_redraw();
                }
                self.clear_selection();
            }
            EngineKey::ZoomIn => {
                let target = self.state.viewport.zoom() + self.config.key_zoom_step;
                self.state.viewport.zoom_to(target, cx, cy);
                self.view_changed();
            }
            EngineKey::ZoomOut => {
                let target = self.state.viewport.zoom() - self.config.key_zoom_step;
                self.state.viewport.zoom_to(target, cx, cy);
                self.view_changed();
            }
            EngineKey::ResetView => self.fit_to_grid(),
            EngineKey::ToggleMode => self.set_mode(self.state.mode.toggled()),
        }
    }

    pub fn pointer_down(&mut self, input: PointerInput) {
        let action = self
            .gestures
            .pointer_down(input, self.state.mode, &self.state.viewport);
        self.apply(action);
    }

    pub fn pointer_move(&mut self, input: PointerInput) {
        let action = self.gestures.pointer_move(input, &self.state.viewport);
        self.apply(action);
        if input.kind != PointerKind::Touch {
            self.hover_at(input.x, input.y);
        }
    }

    pub fn pointer_up(&mut self, input: PointerInput) {
        let action = self.gestures.pointer_up(input, &self.state.viewport);
        self.apply(action);
    }

    pub fn pointer_cancel(&mut self) {
        let action = self.gestures.cancel();
        self.apply(action);
    }

    /// Pointer left the host surface: hover clears, any gesture continues.
    pub fn pointer_leave(&mut self) {
        self.set_hover(None);
    }

    /// Wheel zoom toward `(x, y)`; positive `delta` zooms out.
    pub fn wheel(&mut self, delta: f64, x: f64, y: f64) {
        let action = self.gestures.wheel(delta, x, y);
        self.apply(Some(action));
    }

    pub fn minimap(&self) -> &Minimap {
        &self.minimap
    }

    pub fn minimap_pointer_down(&mut self, mx: f64, my: f64) {
        let (width, height) = self.state.size();
        let target = self
            .minimap
            .pointer_down(mx, my, &self.state.viewport, width, height);
        if let Some((wx, wy)) = target {
            self.recenter(wx, wy);
        }
    }

    pub fn minimap_pointer_move(&mut self, mx: f64, my: f64) {
        if let Some((wx, wy)) = self.minimap.pointer_move(mx, my) {
            self.recenter(wx, wy);
        }
    }

    pub fn minimap_pointer_up(&mut self) {
        self.minimap.pointer_up();
    }

    /// Drained once per frame by the host's loader.
    pub fn take_image_requests(&mut self) -> Vec<String> {
        self.images.take_requests()
    }

    /// Report a finished image load. Failures are remembered and drawn as fallback.
    pub fn image_loaded(&mut self, src: &str, result: Result<I, String>) {
        if self.images.complete(src, result) {
            self.request_redraw();
        }
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Returns and clears the redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Returns and clears the minimap layer-dirty flag.
    pub fn take_minimap_layer_dirty(&mut self) -> bool {
        self.minimap.take_layer_dirty()
    }

    pub fn render<S: Surface<Image = I>>(&mut self, surface: &mut S) -> FrameStats {
        let box_select = self
            .gestures
            .box_range(&self.state.viewport)
            .map(|range| BoxSelect {
                range,
                filter: self.selection.filter(),
                unit_price: self.unit_price,
            });
        let frame = FrameInput {
            config: &self.config,
            viewport: &self.state.viewport,
            blocks: &self.blocks,
            reservation: &*self.reservation,
            hovered: self.state.hovered,
            selection: self.selection.selected(),
            box_select,
        };
        let stats = renderer::render(surface, &frame, &mut self.images, &mut self.avatars);
        self.last_stats = stats;
        stats
    }

    pub fn render_minimap_layer<S: Surface>(&self, surface: &mut S) {
        self.minimap
            .render_layer(surface, &self.blocks, &*self.reservation);
    }

    pub fn render_minimap_indicator<S: Surface>(&self, surface: &mut S) {
        let (width, height) = self.state.size();
        self.minimap
            .render_indicator(surface, &self.state.viewport, width, height);
    }

    fn apply(&mut self, action: Option<GestureAction>) {
        let Some(action) = action else {
            return;
        };
        let reservation = &*self.reservation;
        match action {
            GestureAction::Pan { dx, dy } => {
                self.state.viewport.pan(dx, dy);
                self.view_changed();
            }
            GestureAction::Pinch { ratio, anchor, dx, dy } => {
                self.state.viewport.pan(dx, dy);
                self.state.viewport.zoom_by_ratio(ratio, anchor.0, anchor.1);
                self.view_changed();
            }
            GestureAction::WheelZoom { delta, anchor } => {
                self.state.viewport.zoom_at(
                    delta,
                    self.config.wheel_zoom_sensitivity,
                    anchor.0,
                    anchor.1,
                );
                self.view_changed();
            }
            GestureAction::BoxPreview(_) | GestureAction::Cancelled => self.request_redraw(),
            GestureAction::Click(pos) => {
                if self.selection.select_point(pos, &self.blocks, reservation) {
                    self.emit_selection();
                }
                self.request_redraw();
            }
            GestureAction::BoxCompleted(range) => {
                if self.selection.select_region(range, &self.blocks, reservation) {
                    self.emit_selection();
                }
                self.request_redraw();
            }
            GestureAction::PanCompleted => {}
        }
    }

    fn recenter(&mut self, wx: f64, wy: f64) {
        let (width, height) = self.state.size();
        self.state.viewport.center_on(wx, wy, width, height);
        self.view_changed();
    }

    fn view_changed(&mut self) {
        self.view_initialized = true;
        self.request_redraw();
    }

    fn emit_selection(&mut self) {
        self.events
            .push(EngineEvent::SelectionChanged(self.selection.selected().to_vec()));
    }

    fn hover_at(&mut self, sx: f64, sy: f64) {
        let pos = self.state.viewport.screen_to_grid(sx, sy);
        self.set_hover(self.blocks.in_bounds(pos).then_some(pos));
    }

    fn set_hover(&mut self, pos: Option<GridPos>) {
        let cell = pos.and_then(|pos| self.blocks.resolved_or_empty(pos));
        let footprint_changed = pos.map(|p| self.blocks.footprint(p))
            != self.state.hovered.map(|p| self.blocks.footprint(p));
        self.state.hovered = pos;
        if footprint_changed {
            self.request_redraw();
        }
        if cell != self.state.hovered_cell {
            self.state.hovered_cell = cell.clone();
            self.events.push(EngineEvent::HoverChanged(cell));
        }
    }

    /// Re-resolve the hovered coordinate after data or view changes.
    fn refresh_hover(&mut self) {
        let pos = self.state.hovered.filter(|pos| self.blocks.in_bounds(*pos));
        self.set_hover(pos);
    }
}

#[cfg(test)]
mod tests {
    use pixelgrid_shared::{BlockRef, ReservedSet};

    use super::*;
    use crate::surface::RecordingSurface;

    fn engine() -> GridEngine<u32> {
        let mut engine = GridEngine::new(GridConfig::default());
        engine.set_view(0.0, 0.0, 1.0);
        engine.resize(800.0, 600.0);
        engine.take_events();
        engine.take_redraw();
        engine
    }

    fn selections(events: Vec<EngineEvent>) -> Vec<Vec<Cell>> {
        events
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::SelectionChanged(cells) => Some(cells),
                EngineEvent::HoverChanged(_) => None,
            })
            .collect()
    }

    fn assert_center(engine: &GridEngine<u32>, (w, h): (f64, f64), (x, y): (f64, f64)) {
        let (cx, cy) = engine.viewport().center(w, h);
        assert!(
            (cx - x).abs() < 1e-9 && (cy - y).abs() < 1e-9,
            "expected center ({x}, {y}), got ({cx}, {cy})"
        );
    }

    fn owned(x: i32, y: i32) -> Cell {
        Cell {
            owner: Some("someone".into()),
            ..Cell::empty(x, y)
        }
    }

    #[test]
    fn small_drag_in_pan_mode_selects_one_cell() {
        let mut engine = engine();
        engine.pointer_down(PointerInput::mouse(12.0, 20.0));
        engine.pointer_move(PointerInput::mouse(13.0, 21.0));
        engine.pointer_up(PointerInput::mouse(13.0, 21.0));

        assert_eq!(engine.selection(), &[Cell::empty(1, 2)]);
        assert_eq!(selections(engine.take_events()), vec![vec![Cell::empty(1, 2)]]);
    }

    #[test]
    fn select_mode_drag_selects_region_once() {
        let mut engine = engine();
        engine.set_snapshot(vec![owned(2, 1)]);
        engine.set_reservation(ReservedSet::from_coords([(1, 0)]));
        engine.set_mode(InteractionMode::Select);

        engine.pointer_down(PointerInput::mouse(0.0, 0.0));
        engine.pointer_move(PointerInput::mouse(12.0, 8.0));
        engine.pointer_move(PointerInput::mouse(24.0, 16.0));
        assert!(selections(engine.take_events()).is_empty());
        engine.pointer_up(PointerInput::mouse(24.0, 16.0));

        let positions: Vec<_> = engine.selection().iter().map(Cell::pos).collect();
        assert_eq!(
            positions,
            vec![GridPos::new(0, 0), GridPos::new(2, 0), GridPos::new(0, 1), GridPos::new(1, 1)]
        );
        assert_eq!(selections(engine.take_events()).len(), 1);
    }

    #[test]
    fn drag_within_one_cell_uses_region_rules() {
        let mut engine = engine();
        engine.set_view(0.0, 0.0, 4.0);
        engine.set_snapshot(vec![owned(0, 0)]);
        engine.set_mode(InteractionMode::Select);
        engine.take_events();

        engine.pointer_down(PointerInput::mouse(2.0, 2.0));
        engine.pointer_move(PointerInput::mouse(20.0, 20.0));
        let mut surface = RecordingSurface::new(800.0, 600.0);
        engine.render(&mut surface);
        assert!(surface.texts().any(|t| t == "0 cells selected"));
        engine.pointer_up(PointerInput::mouse(20.0, 20.0));

        // The default filter rejects the owned cell, matching the preview.
        assert!(engine.selection().is_empty());
        assert!(selections(engine.take_events()).is_empty());

        engine.set_selection_filter(SelectionFilter::Owned);
        engine.pointer_down(PointerInput::mouse(2.0, 2.0));
        engine.pointer_move(PointerInput::mouse(20.0, 20.0));
        engine.pointer_up(PointerInput::mouse(20.0, 20.0));
        assert_eq!(engine.selection(), &[owned(0, 0)]);
    }

    #[test]
    fn far_pans_render_without_touching_the_grid() {
        let mut engine = engine();
        let mut surface = RecordingSurface::new(800.0, 600.0);
        for (pan_x, pan_y) in [(1e12, 0.0), (-1e12, 0.0), (0.0, -1e15), (1e300, 1e300)] {
            engine.set_view(pan_x, pan_y, 1.0);
            let stats = engine.render(&mut surface);
            assert_eq!(stats.visible, None);
            assert_eq!(stats.cells_drawn, 0);
        }
        engine.pointer_move(PointerInput::mouse(10.0, 10.0));
        assert_eq!(engine.state().hovered, None);
    }

    #[test]
    fn click_in_select_mode_is_a_point_selection() {
        let mut engine = engine();
        engine.set_mode(InteractionMode::Select);
        engine.pointer_down(PointerInput::mouse(20.0, 20.0));
        engine.pointer_move(PointerInput::mouse(22.0, 21.0));
        engine.pointer_up(PointerInput::mouse(22.0, 21.0));
        assert_eq!(engine.selection(), &[Cell::empty(2, 2)]);
    }

    #[test]
    fn clicking_a_block_member_selects_its_origin() {
        let block = BlockRef {
            origin_x: 5,
            origin_y: 5,
            width: 3,
            height: 2,
        };
        let origin = Cell {
            block: Some(block),
            ..owned(5, 5)
        };
        let member = Cell {
            block: Some(block),
            ..owned(6, 6)
        };
        let mut engine = engine();
        engine.set_snapshot(vec![origin.clone(), member]);
        engine.pointer_down(PointerInput::mouse(52.0, 52.0));
        engine.pointer_up(PointerInput::mouse(52.0, 52.0));
        assert_eq!(engine.selection(), &[origin]);
    }

    #[test]
    fn wheel_zoom_round_trips() {
        let mut engine = engine();
        engine.wheel(300.0, 100.0, 100.0);
        assert!((engine.viewport().zoom() - 0.7).abs() < 1e-9);
        engine.wheel(-300.0, 100.0, 100.0);
        assert!((engine.viewport().zoom() - 1.0).abs() < 1e-9);
        let (pan_x, pan_y) = engine.viewport().pan_offset();
        assert!(pan_x.abs() < 1e-9 && pan_y.abs() < 1e-9);
        assert!(engine.take_redraw());
    }

    #[test]
    fn pinch_zooms_around_midpoint() {
        let mut engine = engine();
        engine.pointer_down(PointerInput::touch(1, 100.0, 100.0));
        engine.pointer_down(PointerInput::touch(2, 200.0, 100.0));
        engine.pointer_move(PointerInput::touch(2, 300.0, 100.0));
        assert!((engine.viewport().zoom() - 2.0).abs() < 1e-9);
        engine.pointer_up(PointerInput::touch(2, 300.0, 100.0));
        engine.pointer_up(PointerInput::touch(1, 100.0, 100.0));
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn first_resize_fits_the_grid() {
        let mut engine: GridEngine<u32> = GridEngine::new(GridConfig::default());
        engine.resize(1000.0, 500.0);
        // 800px world, 10% padding, limited by height.
        let expected = 500.0 / (800.0 * 1.1);
        assert!((engine.viewport().zoom() - expected).abs() < 1e-9);
        assert_center(&engine, (1000.0, 500.0), (50.0, 50.0));
        engine.resize(1200.0, 500.0);
        assert!((engine.viewport().zoom() - expected).abs() < 1e-9);
    }

    #[test]
    fn jump_to_centers_the_cell() {
        let mut engine = engine();
        engine.jump_to(10, 20, Some(2.0));
        assert_eq!(engine.zoom_percent(), 200);
        assert_center(&engine, (800.0, 600.0), (10.5, 20.5));
        engine.jump_to(500, -3, None);
        assert_center(&engine, (800.0, 600.0), (99.5, 0.5));
    }

    #[test]
    fn escape_clears_selection() {
        let mut engine = engine();
        engine.pointer_down(PointerInput::mouse(4.0, 4.0));
        engine.pointer_up(PointerInput::mouse(4.0, 4.0));
        engine.take_events();
        engine.key(EngineKey::Escape);
        assert!(engine.selection().is_empty());
        assert_eq!(selections(engine.take_events()), vec![Vec::<Cell>::new()]);
    }

    #[test]
    fn keys_zoom_and_toggle_mode() {
        let mut engine = engine();
        engine.key(EngineKey::ZoomIn);
        assert_eq!(engine.zoom_percent(), 125);
        engine.key(EngineKey::ZoomOut);
        engine.key(EngineKey::ZoomOut);
        assert_eq!(engine.zoom_percent(), 75);
        engine.key(EngineKey::ToggleMode);
        assert_eq!(engine.mode(), InteractionMode::Select);
        assert_eq!(EngineKey::from_dom("Escape"), Some(EngineKey::Escape));
        assert_eq!(EngineKey::from_dom("q"), None);
    }

    #[test]
    fn hover_events_follow_the_pointer() {
        let mut engine = engine();
        engine.pointer_move(PointerInput::mouse(9.0, 1.0));
        engine.pointer_move(PointerInput::mouse(10.0, 2.0));
        engine.pointer_leave();
        assert_eq!(
            engine.take_events(),
            vec![
                EngineEvent::HoverChanged(Some(Cell::empty(1, 0))),
                EngineEvent::HoverChanged(None),
            ]
        );
        assert_eq!(engine.state().hovered(), None);
    }

    #[test]
    fn snapshot_refresh_keeps_view_and_selection() {
        let mut engine = engine();
        engine.pointer_down(PointerInput::mouse(4.0, 4.0));
        engine.pointer_up(PointerInput::mouse(4.0, 4.0));
        engine.wheel(-500.0, 0.0, 0.0);
        let zoom = engine.viewport().zoom();

        engine.set_snapshot(vec![owned(3, 3)]);
        assert_eq!(engine.selection(), &[Cell::empty(0, 0)]);
        assert_eq!(engine.viewport().zoom(), zoom);
        assert_eq!(engine.blocks().len(), 1);
    }

    #[test]
    fn shrinking_the_grid_drops_out_of_bounds_selection() {
        let mut engine = engine();
        engine.jump_to(90, 90, None);
        let (cx, cy) = (400.0, 300.0);
        engine.pointer_down(PointerInput::mouse(cx, cy));
        engine.pointer_up(PointerInput::mouse(cx, cy));
        assert_eq!(engine.selection().len(), 1);
        engine.take_events();

        let config = GridConfig {
            cols: 50,
            rows: 50,
            ..GridConfig::default()
        };
        engine.set_config(config).unwrap();
        assert!(engine.selection().is_empty());
        assert_eq!(selections(engine.take_events()), vec![Vec::<Cell>::new()]);
        assert!(engine.set_config(GridConfig { cols: 0, ..GridConfig::default() }).is_err());
    }

    #[test]
    fn image_completion_requests_redraw() {
        let mut engine = engine();
        engine.set_view(0.0, 0.0, 4.0);
        engine.set_snapshot(vec![Cell {
            image: Some("a.png".into()),
            ..owned(0, 0)
        }]);
        let mut surface = RecordingSurface::new(800.0, 600.0);
        engine.render(&mut surface);
        assert_eq!(engine.take_image_requests(), vec!["a.png".to_string()]);
        engine.take_redraw();

        engine.image_loaded("a.png", Ok(9));
        assert!(engine.take_redraw());
        let stats = engine.render(&mut surface);
        assert_eq!(stats.images_drawn, 1);
        assert_eq!(engine.last_frame_stats(), stats);
    }

    #[test]
    fn minimap_drag_recenters_viewport() {
        let mut engine = engine();
        // Viewport shows cells (0,0)..(100,75): indicator spans (0,0)..(200,150).
        engine.minimap_pointer_down(300.0, 180.0);
        assert_center(&engine, (800.0, 600.0), (150.0, 90.0));
        engine.minimap_pointer_move(310.0, 180.0);
        assert_center(&engine, (800.0, 600.0), (155.0, 90.0));
        engine.minimap_pointer_up();
        engine.minimap_pointer_move(0.0, 0.0);
        assert_center(&engine, (800.0, 600.0), (155.0, 90.0));
    }

    #[test]
    fn unit_price_feeds_the_summary() {
        let mut engine = engine();
        engine.set_mode(InteractionMode::Select);
        engine.set_unit_price(Some(2.0));
        engine.pointer_down(PointerInput::mouse(0.0, 0.0));
        engine.pointer_up(PointerInput::mouse(16.0, 8.0));
        assert_eq!(
            engine.selection_summary(),
            SelectionSummary {
                count: 2,
                total: Some(4.0)
            }
        );
    }
}
