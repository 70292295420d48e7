//! Bindings to the Google Maps JavaScript API (`google.maps`)

use js_sys::{Float64Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use web_sys::Element;

use flyover_core::config::MapConfig;
use flyover_core::{
    CameraOptions, LatLngAltitude, ProjectionMatrix, TransformError, TransformProvider, ViewState,
};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["google", "maps"], js_name = "Map")]
    pub type GoogleMap;

    #[wasm_bindgen(constructor, js_namespace = ["google", "maps"], js_class = "Map")]
    pub fn new(container: &Element, options: &JsValue) -> GoogleMap;

    #[wasm_bindgen(method, js_name = moveCamera)]
    pub fn move_camera(this: &GoogleMap, options: &JsValue);

    #[wasm_bindgen(js_namespace = ["google", "maps"])]
    #[derive(Clone)]
    pub type WebGLOverlayView;

    #[wasm_bindgen(constructor, js_namespace = ["google", "maps"])]
    pub fn new() -> WebGLOverlayView;

    #[wasm_bindgen(method, js_name = setMap)]
    pub fn set_map(this: &WebGLOverlayView, map: &GoogleMap);

    #[wasm_bindgen(method, js_name = requestRedraw)]
    pub fn request_redraw(this: &WebGLOverlayView);

    #[wasm_bindgen(method, setter = onAdd)]
    pub fn set_on_add(this: &WebGLOverlayView, callback: &Function);

    #[wasm_bindgen(method, setter = onContextRestored)]
    pub fn set_on_context_restored(this: &WebGLOverlayView, callback: &Function);

    #[wasm_bindgen(method, setter = onDraw)]
    pub fn set_on_draw(this: &WebGLOverlayView, callback: &Function);

    #[wasm_bindgen(method, setter = onContextLost)]
    pub fn set_on_context_lost(this: &WebGLOverlayView, callback: &Function);

    #[wasm_bindgen(method, setter = onRemove)]
    pub fn set_on_remove(this: &WebGLOverlayView, callback: &Function);

    /// `transformer` member of the draw options
    pub type CoordinateTransformer;

    #[wasm_bindgen(method, js_name = fromLatLngAltitude)]
    pub fn from_lat_lng_altitude(this: &CoordinateTransformer, literal: &JsValue) -> Float64Array;
}

/// Build a plain JS object from key/value pairs
pub fn js_object(entries: &[(&str, JsValue)]) -> JsValue {
    let object = Object::new();
    for (key, value) in entries {
        // Setting a property on a fresh plain object cannot fail
        let _ = Reflect::set(&object, &JsValue::from_str(key), value);
    }
    object.into()
}

/// `google.maps.MapOptions` for the initial view
pub fn map_options(map: &MapConfig, view: &ViewState) -> JsValue {
    let center = js_object(&[
        ("lat", view.center.lat.into()),
        ("lng", view.center.lng.into()),
    ]);
    let mut entries = vec![
        ("center", center),
        ("zoom", view.zoom.into()),
        ("tilt", view.tilt.into()),
        ("heading", view.heading.into()),
        ("disableDefaultUI", map.disable_default_ui.into()),
    ];
    if let Some(map_id) = &map.map_id {
        entries.push(("mapId", JsValue::from_str(map_id)));
    }
    js_object(&entries)
}

/// `google.maps.CameraOptions` literal
pub fn camera_options(options: CameraOptions) -> JsValue {
    js_object(&[
        ("tilt", options.tilt.into()),
        ("heading", options.heading.into()),
        ("zoom", options.zoom.into()),
    ])
}

/// The transformer handed to one `onDraw` call
pub struct FrameTransform(pub CoordinateTransformer);

impl TransformProvider for FrameTransform {
    fn from_lat_lng_altitude(&self, at: LatLngAltitude) -> Result<ProjectionMatrix, TransformError> {
        let literal = js_object(&[
            ("lat", at.lat.into()),
            ("lng", at.lng.into()),
            ("altitude", at.altitude.into()),
        ]);
        let array = self.0.from_lat_lng_altitude(&literal);

        let mut matrix = [0.0; 16];
        let len = array.length() as usize;
        if len != matrix.len() {
            return Err(TransformError::BadLength(len));
        }
        array.copy_to(&mut matrix);
        Ok(matrix)
    }
}
