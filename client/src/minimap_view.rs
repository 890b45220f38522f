use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, PointerEvent};

use crate::app::WindowSize;
use crate::canvas::{Canvas2dSurface, prepare_context, render_scale};
use crate::host::host;
use crate::render_loop::RenderScheduler;

/// Cached cell layer, repainted only when the engine marks it dirty.
struct OffscreenCache {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    size: (f64, f64),
}

impl OffscreenCache {
    fn new(width: f64, height: f64) -> Option<Self> {
        let document = web_sys::window()?.document()?;
        let canvas = document
            .create_element("canvas")
            .ok()?
            .dyn_into::<HtmlCanvasElement>()
            .ok()?;
        let scale = render_scale();
        canvas.set_width((width * scale) as u32);
        canvas.set_height((height * scale) as u32);
        let ctx = canvas
            .get_context("2d")
            .ok()??
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        ctx.scale(scale, scale).ok();
        Some(Self {
            canvas,
            ctx,
            size: (width, height),
        })
    }
}

fn local_point(e: &PointerEvent) -> (f64, f64) {
    (e.offset_x() as f64, e.offset_y() as f64)
}

/// Whole-grid overview in the bottom-left corner. Drag the indicator to pan.
#[component]
pub fn MinimapPanel() -> impl IntoView {
    let WindowSize(window_size) = expect_context();
    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    let cached_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));
    let offscreen: Rc<RefCell<Option<OffscreenCache>>> = Rc::new(RefCell::new(None));
    let panel_size = RwSignal::new(host().engine().minimap().size());

    let scheduler = RenderScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let host = host();
        let mut engine = host.engine();
        let (width, height) = engine.minimap().size();
        if panel_size.get_untracked() != (width, height) {
            panel_size.set((width, height));
        }

        let Some(ctx) = prepare_context(canvas, &cached_ctx, width, height, render_scale()) else {
            return;
        };

        let mut offscreen_ref = offscreen.borrow_mut();
        let layer_dirty = engine.take_minimap_layer_dirty();
        if offscreen_ref.as_ref().is_none_or(|cache| cache.size != (width, height)) {
            *offscreen_ref = OffscreenCache::new(width, height);
        } else if !layer_dirty {
            // Cached layer is current; only the indicator moves.
            if let Some(cache) = offscreen_ref.as_ref() {
                blit_and_indicate(&ctx, cache, width, height, &engine);
            }
            return;
        }
        let Some(ref cache) = *offscreen_ref else {
            return;
        };
        engine.render_minimap_layer(&mut Canvas2dSurface::new(&cache.ctx, width, height));
        blit_and_indicate(&ctx, cache, width, height, &engine);
    });
    let scheduler = Rc::new(scheduler);
    host().attach_scheduler(&scheduler);

    // The indicator's size follows the main view.
    Effect::new(move || {
        window_size.track();
        scheduler.mark_dirty();
    });

    let on_pointer_down = move |e: PointerEvent| {
        if e.pointer_type() == "mouse" && e.button() != 0 {
            return;
        }
        e.stop_propagation();
        if let Some(el) = canvas_ref.get_untracked() {
            el.set_pointer_capture(e.pointer_id()).ok();
        }
        let (mx, my) = local_point(&e);
        host().update(|engine| engine.minimap_pointer_down(mx, my));
    };

    let on_pointer_move = move |e: PointerEvent| {
        let (mx, my) = local_point(&e);
        host().update(|engine| engine.minimap_pointer_move(mx, my));
    };

    let on_pointer_up = move |_: PointerEvent| {
        host().update(|engine| engine.minimap_pointer_up());
    };

    view! {
        <div
            style="position: absolute; left: 16px; bottom: 16px; z-index: 5; background: #13161f; border: 1px solid #3a3f5c; border-radius: 4px; box-shadow: 0 4px 20px rgba(0,0,0,0.6); overflow: hidden;"
        >
            <canvas
                node_ref=canvas_ref
                on:pointerdown=on_pointer_down
                on:pointermove=on_pointer_move
                on:pointerup=on_pointer_up
                on:pointercancel=on_pointer_up
                style:width=move || format!("{}px", panel_size.get().0)
                style:height=move || format!("{}px", panel_size.get().1)
                style="display: block; cursor: pointer; touch-action: none;"
            />
        </div>
    }
}

fn blit_and_indicate(
    ctx: &CanvasRenderingContext2d,
    cache: &OffscreenCache,
    width: f64,
    height: f64,
    engine: &crate::host::Engine,
) {
    // Explicit size so ctx.scale doesn't double it.
    ctx.draw_image_with_html_canvas_element_and_dw_and_dh(&cache.canvas, 0.0, 0.0, width, height)
        .ok();
    engine.render_minimap_indicator(&mut Canvas2dSurface::new(ctx, width, height));
}
