//! Flyover Web - Google Maps overlay in the browser
//!
//! This crate binds the Flyover overlay to the Google Maps
//! `WebGLOverlayView` and renders the anchored model with three.js.

mod app;
mod host;
mod maps;
mod three;

use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .build(),
    );

    wasm_bindgen_futures::spawn_local(app::run());
}
