use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use pixelgrid_client::colors::Rgba;
use pixelgrid_client::{EngineKey, InteractionMode, PointerInput, PointerKind, ScreenRect, Surface, TextAlign, TextStyle};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, KeyboardEvent, PointerEvent, WheelEvent};

use crate::app::WindowSize;
use crate::host::host;
use crate::image_loader;
use crate::render_loop::RenderScheduler;

/// Pixels per wheel "line" when the browser reports line-based deltas.
const WHEEL_LINE_PX: f64 = 16.0;

pub fn render_scale() -> f64 {
    let dpr = web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .unwrap_or(1.0);
    dpr.max(2.0)
}

/// Resize the backing store to `css_w × css_h` at `scale` and return a context drawing
/// in CSS pixels. The context is cached until the backing store changes.
pub(crate) fn prepare_context(
    canvas: &HtmlCanvasElement,
    cached_ctx: &RefCell<Option<CanvasRenderingContext2d>>,
    css_w: f64,
    css_h: f64,
    scale: f64,
) -> Option<CanvasRenderingContext2d> {
    let expected_w = (css_w * scale) as u32;
    let expected_h = (css_h * scale) as u32;
    if canvas.width() != expected_w || canvas.height() != expected_h {
        canvas.set_width(expected_w);
        canvas.set_height(expected_h);
        *cached_ctx.borrow_mut() = None;
    }

    let mut ctx_cache = cached_ctx.borrow_mut();
    if ctx_cache.is_none() {
        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())?;
        ctx.scale(scale, scale).ok();
        ctx.set_image_smoothing_enabled(false);
        *ctx_cache = Some(ctx);
    }
    ctx_cache.clone()
}

/// [`Surface`] over a Canvas 2D context, in CSS pixels.
pub(crate) struct Canvas2dSurface<'a> {
    ctx: &'a CanvasRenderingContext2d,
    width: f64,
    height: f64,
}

impl<'a> Canvas2dSurface<'a> {
    pub fn new(ctx: &'a CanvasRenderingContext2d, width: f64, height: f64) -> Self {
        Self { ctx, width, height }
    }

    fn set_font(&self, size_px: f64, bold: bool) {
        let weight = if bold { "700" } else { "400" };
        self.ctx
            .set_font(&format!("{weight} {size_px:.1}px system-ui, sans-serif"));
    }
}

impl Surface for Canvas2dSurface<'_> {
    type Image = HtmlImageElement;

    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba) {
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.fill_rect(rect.x, rect.y, rect.w, rect.h);
    }

    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba, line_width: f64) {
        self.ctx.set_stroke_style_str(&color.css());
        self.ctx.set_line_width(line_width);
        self.ctx.stroke_rect(rect.x, rect.y, rect.w, rect.h);
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgba, line_width: f64) {
        self.ctx.set_stroke_style_str(&color.css());
        self.ctx.set_line_width(line_width);
        self.ctx.begin_path();
        self.ctx.move_to(from.0, from.1);
        self.ctx.line_to(to.0, to.1);
        self.ctx.stroke();
    }

    fn draw_image(&mut self, image: &HtmlImageElement, rect: ScreenRect) {
        self.ctx
            .draw_image_with_html_image_element_and_dw_and_dh(image, rect.x, rect.y, rect.w, rect.h)
            .ok();
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: TextStyle) {
        self.set_font(style.size_px, style.bold);
        self.ctx.set_text_align(match style.align {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
        });
        self.ctx.set_text_baseline("middle");
        self.ctx.set_fill_style_str(&style.color.css());
        self.ctx.fill_text(text, x, y).ok();
    }

    fn measure_text(&mut self, text: &str, size_px: f64) -> f64 {
        self.set_font(size_px, false);
        self.ctx
            .measure_text(text)
            .map(|m| m.width())
            .unwrap_or_else(|_| text.chars().count() as f64 * size_px * 0.6)
    }
}

/// Pointer position relative to the canvas, in CSS pixels.
fn local_point(canvas: Option<HtmlCanvasElement>, e: &PointerEvent) -> (f64, f64) {
    canvas
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (
                e.client_x() as f64 - rect.left(),
                e.client_y() as f64 - rect.top(),
            )
        })
        .unwrap_or((e.offset_x() as f64, e.offset_y() as f64))
}

fn pointer_input(canvas: Option<HtmlCanvasElement>, e: &PointerEvent) -> PointerInput {
    let (x, y) = local_point(canvas, e);
    PointerInput {
        id: e.pointer_id(),
        kind: PointerKind::from_dom(&e.pointer_type()),
        x,
        y,
    }
}

fn idle_cursor(mode: InteractionMode) -> &'static str {
    match mode {
        InteractionMode::Pan => "grab",
        InteractionMode::Select => "crosshair",
    }
}

fn set_cursor(canvas: Option<HtmlCanvasElement>, cursor: &str) {
    if let Some(el) = canvas {
        web_sys::HtmlElement::style(&el).set_property("cursor", cursor).ok();
    }
}

/// Map a keydown to an engine key, skipping text inputs.
pub(crate) fn engine_key(e: &KeyboardEvent) -> Option<EngineKey> {
    if e.ctrl_key() || e.meta_key() || e.alt_key() {
        return None;
    }
    let target_tag = e
        .target()
        .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
        .map(|el| el.tag_name())
        .unwrap_or_default();
    if target_tag == "INPUT" || target_tag == "TEXTAREA" {
        return None;
    }
    EngineKey::from_dom(&e.key())
}

/// Main grid view. Fills its parent; the engine is sized from the parent every frame.
#[component]
pub fn GridCanvas() -> impl IntoView {
    let WindowSize(window_size) = expect_context();
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let cached_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));

    let scheduler = RenderScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let (css_w, css_h) = canvas
            .parent_element()
            .map(|parent| (parent.client_width() as f64, parent.client_height() as f64))
            .unwrap_or((0.0, 0.0));
        if css_w <= 0.0 || css_h <= 0.0 {
            return;
        }
        let Some(ctx) = prepare_context(canvas, &cached_ctx, css_w, css_h, render_scale()) else {
            return;
        };

        let host = host();
        let requests = {
            let mut engine = host.engine();
            engine.resize(css_w, css_h);
            let mut surface = Canvas2dSurface::new(&ctx, css_w, css_h);
            engine.render(&mut surface);
            engine.take_image_requests()
        };
        image_loader::enqueue(requests);
        host.flush();
    });
    let scheduler = Rc::new(scheduler);
    host().attach_scheduler(&scheduler);

    // Window resizes change the parent size; the effect also owns the scheduler.
    Effect::new(move || {
        window_size.track();
        scheduler.mark_dirty();
    });

    // --- Input handlers ---

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let delta = match e.delta_mode() {
            WheelEvent::DOM_DELTA_LINE => e.delta_y() * WHEEL_LINE_PX,
            _ => e.delta_y(),
        };
        let (x, y) = canvas_ref
            .get_untracked()
            .map(|el| {
                let rect = el.get_bounding_client_rect();
                (
                    e.client_x() as f64 - rect.left(),
                    e.client_y() as f64 - rect.top(),
                )
            })
            .unwrap_or((e.offset_x() as f64, e.offset_y() as f64));
        host().update(|engine| engine.wheel(delta, x, y));
    };

    let on_pointer_down = move |e: PointerEvent| {
        if e.pointer_type() == "mouse" && e.button() != 0 {
            return;
        }
        let canvas = canvas_ref.get_untracked();
        if let Some(el) = canvas.as_ref() {
            el.set_pointer_capture(e.pointer_id()).ok();
        }
        let input = pointer_input(canvas.clone(), &e);
        let mode = host().update(|engine| {
            engine.pointer_down(input);
            engine.mode()
        });
        if mode == InteractionMode::Pan {
            set_cursor(canvas, "grabbing");
        }
    };

    let on_pointer_move = move |e: PointerEvent| {
        let input = pointer_input(canvas_ref.get_untracked(), &e);
        host().update(|engine| engine.pointer_move(input));
    };

    let on_pointer_up = move |e: PointerEvent| {
        let canvas = canvas_ref.get_untracked();
        let input = pointer_input(canvas.clone(), &e);
        let mode = host().update(|engine| {
            engine.pointer_up(input);
            engine.mode()
        });
        set_cursor(canvas, idle_cursor(mode));
    };

    let on_pointer_cancel = move |_: PointerEvent| {
        let mode = host().update(|engine| {
            engine.pointer_cancel();
            engine.mode()
        });
        set_cursor(canvas_ref.get_untracked(), idle_cursor(mode));
    };

    let on_pointer_leave = move |_: PointerEvent| {
        host().update(|engine| engine.pointer_leave());
    };

    view! {
        <div
            style="position: relative; width: 100%; height: 100%; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointercancel=on_pointer_cancel
            on:pointerleave=on_pointer_leave
            on:contextmenu=|e: web_sys::MouseEvent| e.prevent_default()
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
        </div>
    }
}
