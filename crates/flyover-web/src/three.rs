//! Bindings to three.js, exposed by the page as the `THREE` global
//!
//! `index.html` imports three.js and its GLTFLoader addon as modules and
//! publishes both on `window.THREE` before the wasm module starts.

use js_sys::Promise;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = THREE)]
    #[derive(Clone, Debug, PartialEq)]
    pub type Object3D;

    #[wasm_bindgen(method, getter)]
    pub fn position(this: &Object3D) -> Vector3;

    #[wasm_bindgen(method, getter)]
    pub fn scale(this: &Object3D) -> Vector3;

    #[wasm_bindgen(method, getter)]
    pub fn quaternion(this: &Object3D) -> Quaternion;

    #[wasm_bindgen(js_namespace = THREE)]
    pub type Vector3;

    #[wasm_bindgen(method)]
    pub fn set(this: &Vector3, x: f32, y: f32, z: f32) -> Vector3;

    #[wasm_bindgen(js_namespace = THREE)]
    pub type Quaternion;

    #[wasm_bindgen(method)]
    pub fn set(this: &Quaternion, x: f32, y: f32, z: f32, w: f32) -> Quaternion;

    #[wasm_bindgen(js_namespace = THREE)]
    pub type Matrix4;

    #[wasm_bindgen(method, js_name = fromArray)]
    pub fn from_array(this: &Matrix4, array: &[f64]) -> Matrix4;

    #[wasm_bindgen(js_namespace = THREE, extends = Object3D)]
    pub type Scene;

    #[wasm_bindgen(constructor, js_namespace = THREE)]
    pub fn new() -> Scene;

    #[wasm_bindgen(method)]
    pub fn add(this: &Scene, object: &Object3D);

    #[wasm_bindgen(method)]
    pub fn remove(this: &Scene, object: &Object3D);

    #[wasm_bindgen(js_namespace = THREE, extends = Object3D)]
    pub type PerspectiveCamera;

    #[wasm_bindgen(constructor, js_namespace = THREE)]
    pub fn new() -> PerspectiveCamera;

    #[wasm_bindgen(method, getter = projectionMatrix)]
    pub fn projection_matrix(this: &PerspectiveCamera) -> Matrix4;

    #[wasm_bindgen(js_namespace = THREE, extends = Object3D)]
    pub type AmbientLight;

    #[wasm_bindgen(constructor, js_namespace = THREE)]
    pub fn new(color: u32, intensity: f32) -> AmbientLight;

    #[wasm_bindgen(js_namespace = THREE)]
    pub type WebGLRenderer;

    #[wasm_bindgen(constructor, catch, js_namespace = THREE)]
    pub fn new(parameters: &JsValue) -> Result<WebGLRenderer, JsValue>;

    #[wasm_bindgen(method, setter = autoClear)]
    pub fn set_auto_clear(this: &WebGLRenderer, enabled: bool);

    #[wasm_bindgen(method)]
    pub fn render(this: &WebGLRenderer, scene: &Scene, camera: &PerspectiveCamera);

    #[wasm_bindgen(method, js_name = resetState)]
    pub fn reset_state(this: &WebGLRenderer);

    #[wasm_bindgen(js_namespace = THREE)]
    pub type GLTFLoader;

    #[wasm_bindgen(constructor, js_namespace = THREE)]
    pub fn new() -> GLTFLoader;

    #[wasm_bindgen(method, catch, js_name = loadAsync)]
    pub fn load_async(this: &GLTFLoader, url: &str) -> Result<Promise, JsValue>;
}
