//! DOM element bindings.
//!
//! All fields are resolved once at startup. To add new UI elements, add a
//! field here and bind it in `Elements::bind()`.

use sw_session::BalanceSnapshot;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlButtonElement, HtmlInputElement, Window};

// ── Helpers ──

pub fn window() -> Window {
    web_sys::window().expect("no window")
}

fn doc() -> Document {
    window().document().expect("no document")
}

pub fn by_id(id: &str) -> Option<Element> {
    doc().get_element_by_id(id)
}

pub fn by_id_typed<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn get_input_value(el: &HtmlInputElement) -> String {
    el.value().trim().to_string()
}

pub fn set_input_value(el: &HtmlInputElement, val: &str) {
    el.set_value(val);
}

// ── Element set ──

#[derive(Clone)]
pub struct Elements {
    pub status: Element,
    pub address: Element,
    pub native_balance: Element,
    pub wrapped_balance: Element,
    pub notice: Element,
    pub wrap_input: HtmlInputElement,
    pub wrap_button: HtmlButtonElement,
    pub unwrap_input: HtmlInputElement,
    pub unwrap_button: HtmlButtonElement,
    pub refresh_button: HtmlButtonElement,
}

impl Elements {
    pub fn bind() -> Result<Self, JsValue> {
        fn el(id: &str) -> Result<Element, JsValue> {
            by_id(id).ok_or_else(|| JsValue::from_str(&format!("missing element #{id}")))
        }
        fn input(id: &str) -> Result<HtmlInputElement, JsValue> {
            by_id_typed(id).ok_or_else(|| JsValue::from_str(&format!("missing input #{id}")))
        }
        fn button(id: &str) -> Result<HtmlButtonElement, JsValue> {
            by_id_typed(id).ok_or_else(|| JsValue::from_str(&format!("missing button #{id}")))
        }

        Ok(Self {
            status: el("status")?,
            address: el("address")?,
            native_balance: el("nativeBalance")?,
            wrapped_balance: el("wrappedBalance")?,
            notice: el("notice")?,
            wrap_input: input("wrapAmount")?,
            wrap_button: button("wrapBtn")?,
            unwrap_input: input("unwrapAmount")?,
            unwrap_button: button("unwrapBtn")?,
            refresh_button: button("refreshBtn")?,
        })
    }
}

// ── Rendering ──

pub fn render_balances(els: &Elements, snapshot: &BalanceSnapshot) {
    set_text(&els.native_balance, &format!("{} SCRT", snapshot.native));
    match snapshot.wrapped {
        Some(wrapped) => set_text(&els.wrapped_balance, &format!("{wrapped} sSCRT")),
        None => set_text(&els.wrapped_balance, "unavailable"),
    }
}

pub fn set_notice(els: &Elements, text: &str) {
    set_text(&els.notice, text);
}
