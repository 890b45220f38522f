//! Immediate-mode grid redraw.
//!
//! Paint order per frame:
//! 1. background and empty-grid fill
//! 2. per block: base fill (image, flat color, or procedural avatar), title label,
//!    for-sale border and price tag, reserved treatment
//! 3. grid lines (detailed zoom only)
//! 4. hover highlight
//! 5. selection outlines
//! 6. box-select overlay with conflict tint and running summary

use std::collections::HashSet;

use pixelgrid_shared::{AVATAR_SIZE, AvatarCache, AvatarPixel, Cell, GridPos, Reservation};

use crate::blocks::BlockIndex;
use crate::colors::{self, Rgba};
use crate::config::GridConfig;
use crate::image_cache::ImageCache;
use crate::selection::{SelectionFilter, SelectionSummary, region_cells};
use crate::surface::{Surface, TextAlign, TextStyle};
use crate::viewport::{GridRange, ScreenRect, Viewport};

const LABEL_FONT_PX: f64 = 11.0;
const PRICE_FONT_PX: f64 = 10.0;
const BOX_LABEL_FONT_PX: f64 = 12.0;
const LABEL_PADDING_PX: f64 = 4.0;

/// Live box-select preview.
#[derive(Debug, Clone, Copy)]
pub struct BoxSelect<'a> {
    pub range: GridRange,
    pub filter: &'a SelectionFilter,
    pub unit_price: Option<f64>,
}

/// Immutable, frame-local scene input.
#[derive(Clone, Copy)]
pub struct FrameInput<'a> {
    pub config: &'a GridConfig,
    pub viewport: &'a Viewport,
    pub blocks: &'a BlockIndex,
    pub reservation: &'a dyn Reservation,
    pub hovered: Option<GridPos>,
    pub selection: &'a [Cell],
    pub box_select: Option<BoxSelect<'a>>,
}

/// Per-frame counters for perf instrumentation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub visible: Option<GridRange>,
    /// Zoomed in past the level-of-detail threshold.
    pub detailed: bool,
    pub cells_drawn: u32,
    pub images_drawn: u32,
    pub images_pending: u32,
    pub fallbacks_drawn: u32,
    pub labels_drawn: u32,
}

/// Draw one frame. Never fails: pending images draw their fallback and any cell the
/// index could not place is simply absent.
pub fn render<S: Surface>(
    surface: &mut S,
    frame: &FrameInput<'_>,
    images: &mut ImageCache<S::Image>,
    avatars: &mut AvatarCache,
) -> FrameStats {
    let (width, height) = surface.size();
    let config = frame.config;
    let vp = frame.viewport;
    let cell_size = vp.cell_size();
    let detailed = cell_size >= config.lod_threshold_px;
    let mut stats = FrameStats {
        detailed,
        ..FrameStats::default()
    };

    surface.fill_rect(ScreenRect::new(0.0, 0.0, width, height), colors::BACKGROUND);

    let Some(visible) = vp.visible_range(
        width,
        height,
        config.prefetch_buffer_cells,
        frame.blocks.cols(),
        frame.blocks.rows(),
    ) else {
        return stats;
    };
    stats.visible = Some(visible);

    let grid_rect = vp.cell_rect(visible.min_pos(), visible.width(), visible.height());
    surface.fill_rect(grid_rect, colors::EMPTY_CELL);

    let mut drawn_origins: HashSet<GridPos> = HashSet::new();
    for pos in visible.iter() {
        let Some(resolved) = frame.blocks.resolve(pos) else {
            if frame.reservation.is_reserved(pos.x, pos.y) {
                let rect = vp.cell_rect(pos, 1, 1);
                if rect.intersects_surface(width, height) {
                    draw_reserved(surface, rect, detailed);
                }
            }
            continue;
        };

        // A block is painted once, by whichever of its cells is met first.
        let multi = resolved.width > 1 || resolved.height > 1;
        if multi && !drawn_origins.insert(resolved.origin) {
            continue;
        }

        let rect = vp.cell_rect(resolved.origin, resolved.width, resolved.height);
        let on_screen = rect.intersects_surface(width, height);
        let cell = resolved.cell;

        if detailed {
            // Prefetch: cells in the buffer ring queue their image before they scroll in.
            if let Some(src) = cell.image.as_deref() {
                let failed = images.is_failed(src);
                match images.request(src) {
                    Some(image) if on_screen => {
                        surface.draw_image(image, rect);
                        stats.images_drawn += 1;
                        stats.cells_drawn += 1;
                        draw_decorations(surface, frame, cell, resolved.origin, rect, &mut stats);
                        continue;
                    }
                    Some(_) => {}
                    None if !failed => stats.images_pending += 1,
                    None => {}
                }
            }
        }
        if !on_screen {
            continue;
        }

        if let Some(color) = colors::cell_color(cell.color.as_deref()) {
            surface.fill_rect(rect, color);
        } else if let Some(owner) = cell.owner.as_deref().filter(|o| !o.is_empty()) {
            if detailed && rect.w.min(rect.h) >= config.avatar_min_px {
                draw_avatar(surface, avatars, owner, rect);
            } else {
                surface.fill_rect(rect, Rgba::opaque(pixelgrid_shared::owner_color(owner)));
            }
            stats.fallbacks_drawn += 1;
        }
        stats.cells_drawn += 1;
        draw_decorations(surface, frame, cell, resolved.origin, rect, &mut stats);
    }

    if detailed {
        draw_grid_lines(surface, vp, visible, width, height);
    }

    if let Some(pos) = frame.hovered.filter(|pos| frame.blocks.in_bounds(*pos)) {
        let footprint = frame.blocks.footprint(pos);
        let rect = vp.cell_rect(footprint.min_pos(), footprint.width(), footprint.height());
        surface.fill_rect(rect, colors::HOVER_FILL);
        surface.stroke_rect(rect, colors::HOVER_STROKE, 1.0);
    }

    draw_selection(surface, frame, width, height);

    if let Some(box_select) = frame.box_select {
        draw_box_select(surface, frame, box_select);
    }

    stats
}

/// Title, sale marker and reserved treatment, painted over the base fill.
fn draw_decorations<S: Surface>(
    surface: &mut S,
    frame: &FrameInput<'_>,
    cell: &Cell,
    origin: GridPos,
    rect: ScreenRect,
    stats: &mut FrameStats,
) {
    let config = frame.config;
    let detailed = frame.viewport.cell_size() >= config.lod_threshold_px;

    if detailed && rect.w >= config.label_min_px {
        if let Some(title) = cell.title.as_deref().filter(|t| !t.is_empty()) {
            let max_width = rect.w - LABEL_PADDING_PX * 2.0;
            if let Some(label) = fit_label(surface, title, LABEL_FONT_PX, max_width) {
                let (cx, cy) = rect.center();
                surface.fill_text(
                    &label,
                    cx,
                    cy,
                    TextStyle {
                        size_px: LABEL_FONT_PX,
                        color: colors::LABEL_TEXT,
                        align: TextAlign::Center,
                        bold: true,
                    },
                );
                stats.labels_drawn += 1;
            }
        }
    }

    if cell.is_for_sale() {
        let border = (frame.viewport.cell_size() * 0.1).clamp(1.0, 3.0);
        surface.stroke_rect(rect, colors::SALE_BORDER, border);
        if detailed && rect.w >= config.label_min_px {
            if let Some(price) = cell.sale_price() {
                draw_price_tag(surface, rect, price);
            }
        }
    }

    // Per coordinate, so a reserved member of a larger block is still marked.
    let footprint = frame.blocks.footprint(origin);
    for pos in footprint.iter().filter(|pos| frame.reservation.is_reserved(pos.x, pos.y)) {
        draw_reserved(surface, frame.viewport.cell_rect(pos, 1, 1), detailed);
    }
}

fn draw_price_tag<S: Surface>(surface: &mut S, rect: ScreenRect, price: f64) {
    let text = format_price(price);
    let tag_h = PRICE_FONT_PX + 4.0;
    let tag_w = (surface.measure_text(&text, PRICE_FONT_PX) + 6.0).min(rect.w);
    let tag = ScreenRect::new(rect.x, rect.bottom() - tag_h, tag_w, tag_h);
    surface.fill_rect(tag, colors::SALE_TAG_BG);
    surface.fill_text(
        &text,
        tag.x + 3.0,
        tag.y + tag_h / 2.0,
        TextStyle {
            size_px: PRICE_FONT_PX,
            color: colors::SALE_TAG_TEXT,
            align: TextAlign::Left,
            bold: false,
        },
    );
}

fn draw_reserved<S: Surface>(surface: &mut S, rect: ScreenRect, detailed: bool) {
    surface.fill_rect(rect, colors::RESERVED_FILL);
    if detailed {
        surface.line(
            (rect.x, rect.bottom()),
            (rect.right(), rect.y),
            colors::RESERVED_HATCH,
            1.0,
        );
    }
}

fn draw_avatar<S: Surface>(surface: &mut S, avatars: &mut AvatarCache, owner: &str, rect: ScreenRect) {
    let avatar = avatars.get_or_generate(owner);
    surface.fill_rect(rect, Rgba::opaque(avatar.background));
    let px_w = rect.w / AVATAR_SIZE as f64;
    let px_h = rect.h / AVATAR_SIZE as f64;
    for row in 0..AVATAR_SIZE {
        for col in 0..AVATAR_SIZE {
            let pixel = avatar.pixel(col, row);
            if pixel == AvatarPixel::Background {
                continue;
            }
            surface.fill_rect(
                ScreenRect::new(
                    rect.x + col as f64 * px_w,
                    rect.y + row as f64 * px_h,
                    px_w,
                    px_h,
                ),
                Rgba::opaque(avatar.color_of(pixel)),
            );
        }
    }
}

fn draw_grid_lines<S: Surface>(surface: &mut S, vp: &Viewport, visible: GridRange, width: f64, height: f64) {
    let (left, top) = vp.world_to_screen(visible.min_col as f64, visible.min_row as f64);
    let (right, bottom) = vp.world_to_screen(
        (visible.max_col + 1) as f64,
        (visible.max_row + 1) as f64,
    );
    let (top, bottom) = (top.max(0.0), bottom.min(height));
    let (left, right) = (left.max(0.0), right.min(width));

    for col in visible.min_col..=visible.max_col + 1 {
        let (x, _) = vp.world_to_screen(col as f64, 0.0);
        if (0.0..=width).contains(&x) {
            surface.line((x, top), (x, bottom), colors::GRID_LINE, 1.0);
        }
    }
    for row in visible.min_row..=visible.max_row + 1 {
        let (_, y) = vp.world_to_screen(0.0, row as f64);
        if (0.0..=height).contains(&y) {
            surface.line((left, y), (right, y), colors::GRID_LINE, 1.0);
        }
    }
}

fn draw_selection<S: Surface>(surface: &mut S, frame: &FrameInput<'_>, width: f64, height: f64) {
    let mut outlined: HashSet<GridPos> = HashSet::new();
    for cell in frame.selection {
        let footprint = frame.blocks.footprint(cell.pos());
        if !outlined.insert(footprint.min_pos()) {
            continue;
        }
        let rect = frame
            .viewport
            .cell_rect(footprint.min_pos(), footprint.width(), footprint.height());
        if !rect.intersects_surface(width, height) {
            continue;
        }
        surface.fill_rect(rect, colors::SELECTION_FILL);
        surface.stroke_rect(rect, colors::SELECTION_STROKE, 2.0);
    }
}

fn draw_box_select<S: Surface>(surface: &mut S, frame: &FrameInput<'_>, box_select: BoxSelect<'_>) {
    let blocks = frame.blocks;
    let vp = frame.viewport;
    let Some(range) = box_select.range.clamp_to(blocks.cols(), blocks.rows()) else {
        return;
    };

    for pos in range.iter() {
        let reserved = frame.reservation.is_reserved(pos.x, pos.y);
        let accepted = box_select
            .filter
            .accepts(blocks.resolve(pos).as_ref().map(|r| r.cell));
        if reserved || !accepted {
            surface.fill_rect(vp.cell_rect(pos, 1, 1), colors::BOX_CONFLICT);
        }
    }

    let rect = vp.cell_rect(range.min_pos(), range.width(), range.height());
    surface.fill_rect(rect, colors::BOX_FILL);
    surface.stroke_rect(rect, colors::BOX_STROKE, 1.5);

    let cells = region_cells(blocks, frame.reservation, box_select.filter, range);
    let label = SelectionSummary::of(&cells, box_select.unit_price).label();
    let label_h = BOX_LABEL_FONT_PX + 8.0;
    let label_w = surface.measure_text(&label, BOX_LABEL_FONT_PX) + 12.0;
    let tag = ScreenRect::new(rect.x, rect.bottom() + 4.0, label_w, label_h);
    surface.fill_rect(tag, colors::BOX_LABEL_BG);
    surface.fill_text(
        &label,
        tag.x + 6.0,
        tag.y + label_h / 2.0,
        TextStyle {
            size_px: BOX_LABEL_FONT_PX,
            color: colors::LABEL_TEXT,
            align: TextAlign::Left,
            bold: false,
        },
    );
}

/// Shorten `text` with an ellipsis until it fits `max_width`. `None` if nothing fits.
fn fit_label<S: Surface>(surface: &mut S, text: &str, size_px: f64, max_width: f64) -> Option<String> {
    if max_width <= 0.0 {
        return None;
    }
    if surface.measure_text(text, size_px) <= max_width {
        return Some(text.to_string());
    }
    let chars: Vec<char> = text.chars().collect();
    (1..chars.len()).rev().find_map(|keep| {
        let candidate: String = chars[..keep].iter().chain(std::iter::once(&'…')).collect();
        (surface.measure_text(&candidate, size_px) <= max_width).then_some(candidate)
    })
}

/// "$12", "$2.50", "$1.3k".
pub fn format_price(price: f64) -> String {
    if price >= 1000.0 {
        format!("${:.1}k", price / 1000.0)
    } else if price.fract() == 0.0 {
        format!("${price:.0}")
    } else {
        format!("${price:.2}")
    }
}
