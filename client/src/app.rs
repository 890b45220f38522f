use std::cell::RefCell;

use leptos::prelude::*;
use pixelgrid_client::{EngineKey, GridConfig, InteractionMode};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::canvas::{GridCanvas, engine_key};
use crate::host::{ToolbarState, host};
use crate::minimap_view::MinimapPanel;

/// Element holding the startup config as JSON, if the page provides one.
const CONFIG_ELEMENT_ID: &str = "pixelgrid-config";

pub(crate) fn canvas_dimensions() -> (f64, f64) {
    let Some(window) = web_sys::window() else {
        return (1200.0, 800.0);
    };
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(1200.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    (w, h)
}

/// Window size in CSS pixels; views repaint when it changes.
#[derive(Clone, Copy)]
pub(crate) struct WindowSize(pub RwSignal<(f64, f64)>);

struct KeydownBinding {
    window: web_sys::Window,
    _handler: Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

struct ResizeBinding {
    window: web_sys::Window,
    _handler: Closure<dyn Fn()>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

/// Read the page-supplied config. Missing is fine; malformed falls back to defaults.
fn startup_config() -> Option<GridConfig> {
    let document = web_sys::window()?.document()?;
    let json = document.get_element_by_id(CONFIG_ELEMENT_ID)?.text_content()?;
    match GridConfig::from_json(&json) {
        Ok(config) => Some(config),
        Err(err) => {
            web_sys::console::warn_1(&format!("ignoring #{CONFIG_ELEMENT_ID}: {err}").into());
            None
        }
    }
}

#[component]
pub fn App() -> impl IntoView {
    let window_size = RwSignal::new(canvas_dimensions());
    provide_context(WindowSize(window_size));

    if let Some(config) = startup_config()
        && let Err(err) = host().update(|engine| engine.set_config(config))
    {
        web_sys::console::warn_1(&format!("invalid grid config: {err}").into());
    }

    let toolbar = RwSignal::new(ToolbarState {
        zoom_percent: 100,
        mode: InteractionMode::Pan,
    });
    host().set_toolbar_listener(move |state| toolbar.set(state));

    // Global keyboard shortcuts
    Effect::new(move || {
        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let Some(key) = engine_key(&e) else {
                    return;
                };
                if key != EngineKey::Escape {
                    e.prevent_default();
                }
                host().update(|engine| engine.key(key));
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    // Window resize tracking
    Effect::new(move || {
        let Some(window) = web_sys::window() else {
            return;
        };

        RESIZE_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "resize",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler = Closure::<dyn Fn()>::new(move || {
            window_size.set(canvas_dimensions());
        });

        if window
            .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            RESIZE_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(ResizeBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    view! {
        <div style="width: 100%; height: 100%; position: relative; overflow: hidden; background: #0c0e17;">
            <GridCanvas />
            <MinimapPanel />
            <Toolbar state=toolbar />
        </div>
    }
}

#[component]
fn Toolbar(state: RwSignal<ToolbarState>) -> impl IntoView {
    let mode_label = move || match state.get().mode {
        InteractionMode::Pan => "Pan",
        InteractionMode::Select => "Select",
    };
    let zoom_label = move || format!("{}%", state.get().zoom_percent);

    let on_toggle_mode = move |_| {
        host().update(|engine| engine.key(EngineKey::ToggleMode));
    };
    let on_zoom_in = move |_| {
        host().update(|engine| engine.key(EngineKey::ZoomIn));
    };
    let on_zoom_out = move |_| {
        host().update(|engine| engine.key(EngineKey::ZoomOut));
    };
    let on_reset = move |_| {
        host().update(|engine| engine.key(EngineKey::ResetView));
    };

    view! {
        <div style="position: absolute; top: 12px; right: 12px; z-index: 5; display: flex; gap: 6px; align-items: center; padding: 6px 8px; background: #13161f; border: 1px solid #3a3f5c; border-radius: 4px; color: #e2e0d8; font: 12px system-ui, sans-serif;">
            <button title="Toggle pan/select (M)" on:click=on_toggle_mode>{mode_label}</button>
            <button title="Zoom out (-)" on:click=on_zoom_out>"−"</button>
            <span style="min-width: 44px; text-align: center;">{zoom_label}</span>
            <button title="Zoom in (+)" on:click=on_zoom_in>"+"</button>
            <button title="Fit grid (0)" on:click=on_reset>"Fit"</button>
        </div>
    }
}
