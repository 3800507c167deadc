//! Event binding.
//!
//! Wires the convert and refresh buttons. Async handlers spawn via
//! `wasm_bindgen_futures::spawn_local`.

use crate::dom::{self, Elements};
use crate::state;
use gloo_console::warn;
use sw_session::{BalanceService, ConversionDirection, ConversionEngine, ConversionRequest};
use wasm_bindgen::prelude::*;
use web_sys::HtmlInputElement;

/// Helper: attach async click handler to a button.
macro_rules! on_click_async {
    ($el:expr, $els:expr, $handler:expr) => {{
        let els = $els.clone();
        let cb = Closure::wrap(Box::new(move |_: web_sys::MouseEvent| {
            let els2 = els.clone();
            wasm_bindgen_futures::spawn_local(async move {
                $handler(&els2).await;
            });
        }) as Box<dyn FnMut(_)>);
        $el.add_event_listener_with_callback("click", cb.as_ref().unchecked_ref())
            .unwrap();
        cb.forget();
    }};
}

/// Bind all UI event listeners. Call once after init.
pub fn bind_events(els: &Elements) {
    on_click_async!(els.wrap_button, els, on_wrap);
    on_click_async!(els.unwrap_button, els, on_unwrap);
    on_click_async!(els.refresh_button, els, on_refresh);
}

async fn on_wrap(els: &Elements) {
    let input = els.wrap_input.clone();
    convert(els, ConversionDirection::NativeToWrapped, &input).await;
}

async fn on_unwrap(els: &Elements) {
    let input = els.unwrap_input.clone();
    convert(els, ConversionDirection::WrappedToNative, &input).await;
}

async fn convert(els: &Elements, direction: ConversionDirection, input: &HtmlInputElement) {
    let Some(session) = state::session() else {
        dom::set_notice(els, "wallet session not ready");
        return;
    };
    let Some(snapshot) = state::snapshot() else {
        dom::set_notice(els, "balances not loaded yet; refresh first");
        return;
    };

    let request = ConversionRequest {
        direction,
        amount: dom::get_input_value(input),
    };

    match ConversionEngine::new()
        .convert(&session, &request, &snapshot)
        .await
    {
        Ok(receipt) => {
            // Consumed: reset the pending amount.
            dom::set_input_value(input, "0");
            if let Some(fresh) = receipt.snapshot {
                state::set_snapshot(fresh);
                dom::render_balances(els, &fresh);
            }
            dom::set_notice(els, &format!("confirmed: {}", receipt.outcome.tx_hash.0));
        }
        Err(err) => {
            // Surfaced once; the pending amount stays for an explicit retry.
            warn!(format!("conversion failed: {err}"));
            dom::set_notice(els, &error_chain(&err));
        }
    }
}

/// Refresh is user-retryable after a failed native read.
pub async fn on_refresh(els: &Elements) {
    let Some(session) = state::session() else {
        dom::set_notice(els, "wallet session not ready");
        return;
    };

    match BalanceService::new().refresh(&session).await {
        Ok(snapshot) => {
            state::set_snapshot(snapshot);
            dom::render_balances(els, &snapshot);
            dom::set_notice(els, "");
        }
        Err(err) => {
            warn!(format!("balance refresh failed: {err}"));
            dom::set_notice(els, &error_chain(&err));
        }
    }
}

/// Flattens an error and its sources into one user-facing line.
pub fn error_chain(err: &(impl std::error::Error + ?Sized)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
