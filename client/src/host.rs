//! Browser host: the one engine instance, the render schedulers that paint it, and the
//! `wasm_bindgen` surface a surrounding page uses to drive it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use js_sys::Function;
use pixelgrid_client::{EngineEvent, GridConfig, GridEngine, InteractionMode, SelectionFilter};
use pixelgrid_shared::{Cell as GridCell, ReservedSet};
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

use crate::render_loop::RenderScheduler;

pub(crate) type Engine = GridEngine<HtmlImageElement>;

/// What the toolbar shows; pushed whenever it changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ToolbarState {
    pub zoom_percent: u32,
    pub mode: InteractionMode,
}

#[derive(Default)]
struct Callbacks {
    selection: Option<Function>,
    hover: Option<Function>,
    view: Option<Function>,
}

pub(crate) struct Host {
    engine: RefCell<Engine>,
    schedulers: RefCell<Vec<Weak<RenderScheduler>>>,
    callbacks: RefCell<Callbacks>,
    toolbar_listener: RefCell<Option<Box<dyn Fn(ToolbarState)>>>,
    last_toolbar: Cell<Option<ToolbarState>>,
}

thread_local! {
    static HOST: Rc<Host> = Rc::new(Host::new(GridConfig::default()));
}

pub(crate) fn host() -> Rc<Host> {
    HOST.with(Rc::clone)
}

impl Host {
    fn new(config: GridConfig) -> Self {
        Self {
            engine: RefCell::new(GridEngine::new(config)),
            schedulers: RefCell::new(Vec::new()),
            callbacks: RefCell::new(Callbacks::default()),
            toolbar_listener: RefCell::new(None),
            last_toolbar: Cell::new(None),
        }
    }

    /// Borrow the engine without flushing. Callers that mutate must call [`Host::flush`].
    pub fn engine(&self) -> std::cell::RefMut<'_, Engine> {
        self.engine.borrow_mut()
    }

    /// Run `f` against the engine, then repaint and notify as needed.
    pub fn update<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        let result = f(&mut self.engine.borrow_mut());
        self.flush();
        result
    }

    /// Repaint `scheduler` whenever the engine asks for a redraw. Held weakly: the
    /// owning component drops it on unmount.
    pub fn attach_scheduler(&self, scheduler: &Rc<RenderScheduler>) {
        scheduler.mark_dirty();
        self.schedulers.borrow_mut().push(Rc::downgrade(scheduler));
    }

    pub fn set_toolbar_listener(&self, listener: impl Fn(ToolbarState) + 'static) {
        *self.toolbar_listener.borrow_mut() = Some(Box::new(listener));
        self.last_toolbar.set(None);
        self.flush();
    }

    /// Drain engine outputs. Callbacks run after the engine borrow is released, so
    /// they may call back into the host API.
    pub fn flush(&self) {
        let (redraw, events, toolbar) = {
            let mut engine = self.engine.borrow_mut();
            let toolbar = ToolbarState {
                zoom_percent: engine.zoom_percent(),
                mode: engine.mode(),
            };
            (engine.take_redraw(), engine.take_events(), toolbar)
        };

        if redraw {
            self.schedulers.borrow_mut().retain(|weak| match weak.upgrade() {
                Some(scheduler) => {
                    scheduler.mark_dirty();
                    true
                }
                None => false,
            });
        }

        for event in events {
            self.dispatch(event);
        }

        if self.last_toolbar.get() != Some(toolbar) {
            self.last_toolbar.set(Some(toolbar));
            if let Some(listener) = self.toolbar_listener.borrow().as_ref() {
                listener(toolbar);
            }
            let view = self.callbacks.borrow().view.clone();
            if let Some(cb) = view {
                call_js(&cb, &JsValue::from(toolbar.zoom_percent));
            }
        }
    }

    fn dispatch(&self, event: EngineEvent) {
        let (cb, payload) = match event {
            EngineEvent::SelectionChanged(cells) => {
                (self.callbacks.borrow().selection.clone(), to_js(&cells))
            }
            EngineEvent::HoverChanged(cell) => (self.callbacks.borrow().hover.clone(), to_js(&cell)),
        };
        if let Some(cb) = cb {
            call_js(&cb, &payload);
        }
    }
}

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

fn call_js(cb: &Function, arg: &JsValue) {
    if let Err(err) = cb.call1(&JsValue::NULL, arg) {
        web_sys::console::warn_1(&format!("pixelgrid callback threw: {err:?}").into());
    }
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Replace the cell snapshot: an array of cell records.
#[wasm_bindgen(js_name = setCells)]
pub fn set_cells(cells: JsValue) -> Result<(), JsValue> {
    let cells: Vec<GridCell> = serde_wasm_bindgen::from_value(cells).map_err(js_error)?;
    host().update(|engine| engine.set_snapshot(cells));
    Ok(())
}

/// Same as [`set_cells`] for callers holding a JSON string.
#[wasm_bindgen(js_name = setCellsJson)]
pub fn set_cells_json(json: &str) -> Result<(), JsValue> {
    let cells = pixelgrid_shared::parse_snapshot(json).map_err(js_error)?;
    host().update(|engine| engine.set_snapshot(cells));
    Ok(())
}

/// Reserve coordinates given as `{ coords: [{x, y}], border: {cols, rows, width} }`.
#[wasm_bindgen(js_name = setReserved)]
pub fn set_reserved(reserved: JsValue) -> Result<(), JsValue> {
    let reserved: ReservedSet = serde_wasm_bindgen::from_value(reserved).map_err(js_error)?;
    host().update(|engine| engine.set_reservation(reserved));
    Ok(())
}

/// Reserve coordinates by predicate: `(x, y) => boolean`. Exceptions count as not reserved.
#[wasm_bindgen(js_name = setReservationPredicate)]
pub fn set_reservation_predicate(predicate: Function) {
    let is_reserved = move |x: i32, y: i32| {
        predicate
            .call2(&JsValue::NULL, &JsValue::from(x), &JsValue::from(y))
            .map(|v| v.is_truthy())
            .unwrap_or(false)
    };
    host().update(|engine| engine.set_reservation(is_reserved));
}

#[wasm_bindgen(js_name = setConfig)]
pub fn set_config(json: &str) -> Result<(), JsValue> {
    let config = GridConfig::from_json(json).map_err(js_error)?;
    host().update(|engine| engine.set_config(config)).map_err(js_error)
}

#[wasm_bindgen(js_name = jumpTo)]
pub fn jump_to(x: i32, y: i32, zoom: Option<f64>) {
    host().update(|engine| engine.jump_to(x, y, zoom));
}

#[wasm_bindgen(js_name = fitToGrid)]
pub fn fit_to_grid() {
    host().update(|engine| engine.fit_to_grid());
}

/// `"pan"` or `"select"`.
#[wasm_bindgen(js_name = setMode)]
pub fn set_mode(mode: &str) -> Result<(), JsValue> {
    let mode: InteractionMode = serde_wasm_bindgen::from_value(JsValue::from_str(mode)).map_err(js_error)?;
    host().update(|engine| engine.set_mode(mode));
    Ok(())
}

/// `{ kind: "unowned" | "owned" | "any" }` or `{ kind: "owned_by", owner: "..." }`.
#[wasm_bindgen(js_name = setSelectionFilter)]
pub fn set_selection_filter(filter: JsValue) -> Result<(), JsValue> {
    let filter: SelectionFilter = serde_wasm_bindgen::from_value(filter).map_err(js_error)?;
    host().update(|engine| engine.set_selection_filter(filter));
    Ok(())
}

#[wasm_bindgen(js_name = setUnitPrice)]
pub fn set_unit_price(price: Option<f64>) {
    host().update(|engine| engine.set_unit_price(price));
}

#[wasm_bindgen(js_name = clearSelection)]
pub fn clear_selection() {
    host().update(|engine| engine.clear_selection());
}

/// `{ count, total }` for the current selection.
#[wasm_bindgen(js_name = selectionSummary)]
pub fn selection_summary() -> JsValue {
    to_js(&host().engine().selection_summary())
}

/// Called with the resolved cell array after each completed selection gesture.
#[wasm_bindgen(js_name = onSelectionChange)]
pub fn on_selection_change(cb: Function) {
    host().callbacks.borrow_mut().selection = Some(cb);
}

/// Called with the hovered cell record, or `null`.
#[wasm_bindgen(js_name = onHoverChange)]
pub fn on_hover_change(cb: Function) {
    host().callbacks.borrow_mut().hover = Some(cb);
}

/// Called with the zoom level in percent whenever it changes.
#[wasm_bindgen(js_name = onZoomChange)]
pub fn on_zoom_change(cb: Function) {
    host().callbacks.borrow_mut().view = Some(cb);
}
