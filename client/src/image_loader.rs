#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

//! Loads cell images requested by the renderer and hands the decoded elements back
//! to the engine. Requests queue up and run a few at a time.

use std::cell::RefCell;
use std::collections::VecDeque;

use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

use crate::host::host;

const MAX_CONCURRENT_LOADS: usize = 6;
const ONLOAD_HANDLE_KEY: &str = "__pixelgridImageOnload";
const ONERROR_HANDLE_KEY: &str = "__pixelgridImageOnerror";

#[derive(Default)]
struct LoadQueue {
    pending: VecDeque<String>,
    in_flight: usize,
}

thread_local! {
    static LOAD_QUEUE: RefCell<LoadQueue> = RefCell::new(LoadQueue::default());
}

/// Queue image sources drained from the engine after a frame.
pub fn enqueue(sources: Vec<String>) {
    if sources.is_empty() {
        return;
    }
    LOAD_QUEUE.with(|queue| queue.borrow_mut().pending.extend(sources));
    pump_queue();
}

fn pump_queue() {
    loop {
        let next = LOAD_QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            if queue.in_flight >= MAX_CONCURRENT_LOADS {
                return None;
            }
            let src = queue.pending.pop_front()?;
            queue.in_flight += 1;
            Some(src)
        });
        let Some(src) = next else {
            break;
        };
        load_image(src);
    }
}

/// Report a finished load, then start the next queued one.
fn finish(src: &str, result: Result<HtmlImageElement, String>) {
    LOAD_QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        queue.in_flight = queue.in_flight.saturating_sub(1);
    });
    if let Err(err) = &result {
        web_sys::console::warn_1(&format!("image load failed for {src}: {err}").into());
    }
    host().update(|engine| engine.image_loaded(src, result));
    pump_queue();
}

fn load_image(src: String) {
    let img = match HtmlImageElement::new() {
        Ok(img) => img,
        Err(_) => {
            finish(&src, Err("could not create image element".into()));
            return;
        }
    };

    let img_for_load = img.clone();
    let src_for_load = src.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);

        let img_for_decode = img_for_load.clone();
        let src = src_for_load.clone();

        wasm_bindgen_futures::spawn_local(async move {
            // Decode off the render path; a failed decode still leaves a drawable image.
            let _ = JsFuture::from(img_for_decode.decode()).await;
            finish(&src, Ok(img_for_decode));
        });
    });

    let img_for_error = img.clone();
    let src_for_error = src.clone();
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        finish(&src_for_error, Err("network or decode error".into()));
    });

    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONLOAD_HANDLE_KEY),
        &onload_js,
    );
    let _ = Reflect::set(
        img.as_ref(),
        &JsValue::from_str(ONERROR_HANDLE_KEY),
        &onerror_js,
    );
    img.set_src(&src);
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}
