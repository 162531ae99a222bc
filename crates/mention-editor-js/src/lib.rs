//! WASM bindings for the mention editor.
//!
//! Exposes [`JsMentionEditor`] for JavaScript/TypeScript apps: mount it on a
//! textarea or a contenteditable element, register callbacks, and feed it
//! suggestion candidates.

mod editor;
mod observer;
mod types;

pub use editor::*;
pub use types::*;

use tracing::Level;
use tracing::subscriber::set_global_default;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::SubscriberExt;
use wasm_bindgen::prelude::*;

/// Install the panic hook and route tracing to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    #[cfg(debug_assertions)]
    let level = Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let level = Level::INFO;

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(level)
            .build(),
    );
    let reg = Registry::default().with(wasm_layer);
    // Another module may have installed a subscriber first.
    let _ = set_global_default(reg);
}
