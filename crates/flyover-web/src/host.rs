//! Browser implementations of the overlay's host traits

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use flyover_core::{CameraOptions, MapHost};
use flyover_scene::{AssetLoader, ContextError, LoadSink, Renderer, RendererFactory, SceneGraph};

use crate::maps::{self, GoogleMap, WebGLOverlayView};
use crate::three::{self, AmbientLight, GLTFLoader, Object3D, PerspectiveCamera, Scene};

/// The Google map plus the overlay registered on it
pub struct WebMapHost {
    map: GoogleMap,
    overlay: WebGLOverlayView,
}

impl WebMapHost {
    pub fn new(map: GoogleMap, overlay: WebGLOverlayView) -> Self {
        Self { map, overlay }
    }

    /// Register the overlay with the map; done once after construction
    pub fn attach_overlay(&self) {
        self.overlay.set_map(&self.map);
    }
}

impl MapHost for WebMapHost {
    fn move_camera(&mut self, options: CameraOptions) {
        self.map.move_camera(&maps::camera_options(options));
    }

    fn request_redraw(&mut self) {
        self.overlay.request_redraw();
    }
}

type LoadHook = Rc<RefCell<Option<Box<dyn Fn()>>>>;

/// glTF loader backed by `THREE.GLTFLoader`
pub struct GltfAssetLoader {
    loader: GLTFLoader,
    on_settled: LoadHook,
}

impl Default for GltfAssetLoader {
    fn default() -> Self {
        Self {
            loader: GLTFLoader::new(),
            on_settled: Rc::new(RefCell::new(None)),
        }
    }
}

impl GltfAssetLoader {
    /// Hook fired after a load resolves its sink, success or failure
    pub fn set_on_settled(&self, hook: impl Fn() + 'static) {
        *self.on_settled.borrow_mut() = Some(Box::new(hook));
    }
}

impl AssetLoader for GltfAssetLoader {
    type Root = Object3D;

    fn load(&mut self, path: &str, sink: LoadSink<Object3D>) {
        let promise = match self.loader.load_async(path) {
            Ok(promise) => promise,
            Err(e) => {
                sink.fail(describe(&e));
                return;
            }
        };

        let on_settled = self.on_settled.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match JsFuture::from(promise).await {
                Ok(gltf) => match Reflect::get(&gltf, &JsValue::from_str("scene")) {
                    Ok(scene) if scene.is_object() => sink.succeed(scene.unchecked_into()),
                    _ => sink.fail("glTF has no scene"),
                },
                Err(e) => sink.fail(describe(&e)),
            }

            if let Some(hook) = on_settled.borrow().as_ref() {
                hook();
            }
        });
    }
}

/// `THREE.WebGLRenderer` drawing into the map's GL context
pub struct ThreeRenderer {
    renderer: three::WebGLRenderer,
    scene: Scene,
    camera: PerspectiveCamera,
    light: Option<AmbientLight>,
    asset: Option<Object3D>,
}

impl ThreeRenderer {
    /// Mirror the scene graph into the three.js scene
    fn sync(&mut self, graph: &SceneGraph<Object3D>) {
        if self.light.is_none() {
            let light = AmbientLight::new(graph.light.color, graph.light.intensity);
            self.scene.add(&light);
            self.light = Some(light);
        }

        if let Some(group) = graph.asset() {
            if self.asset.as_ref() != Some(&group.root) {
                if let Some(old) = self.asset.take() {
                    self.scene.remove(&old);
                }
                let t = group.transform;
                group.root.scale().set(t.scale.x, t.scale.y, t.scale.z);
                let [x, y, z, w] = t.rotation.to_array();
                group.root.quaternion().set(x, y, z, w);
                group
                    .root
                    .position()
                    .set(t.translation.x, t.translation.y, t.translation.z);
                self.scene.add(&group.root);
                self.asset = Some(group.root.clone());
            }
        }

        self.camera
            .projection_matrix()
            .from_array(&graph.camera.projection.to_cols_array());
    }
}

impl Renderer for ThreeRenderer {
    type Root = Object3D;

    fn set_auto_clear(&mut self, enabled: bool) {
        self.renderer.set_auto_clear(enabled);
    }

    fn render(&mut self, scene: &SceneGraph<Object3D>) {
        self.sync(scene);
        self.renderer.render(&self.scene, &self.camera);
    }

    fn reset_state(&mut self) {
        self.renderer.reset_state();
    }
}

/// Builds a renderer from the `gl` context passed to `onContextRestored`
#[derive(Default)]
pub struct ThreeRendererFactory;

impl RendererFactory for ThreeRendererFactory {
    type Context = JsValue;
    type Root = Object3D;
    type Renderer = ThreeRenderer;

    fn create(&mut self, gl: &JsValue) -> Result<ThreeRenderer, ContextError> {
        if !gl.is_object() {
            return Err(ContextError::Missing);
        }

        let canvas = Reflect::get(gl, &JsValue::from_str("canvas"))
            .map_err(|e| ContextError::Rejected(describe(&e)))?;
        let attributes = Reflect::get(gl, &JsValue::from_str("getContextAttributes"))
            .ok()
            .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
            .and_then(|f| f.call0(gl).ok())
            .filter(|a| a.is_object())
            .map(|a| a.unchecked_into::<Object>())
            .unwrap_or_else(Object::new);

        let base: Object = maps::js_object(&[("canvas", canvas), ("context", gl.clone())]).unchecked_into();
        let params = Object::assign(&Object::assign(&Object::new(), &attributes), &base);

        let renderer = three::WebGLRenderer::new(&params)
            .map_err(|e| ContextError::Rejected(describe(&e)))?;
        Ok(ThreeRenderer {
            renderer,
            scene: Scene::new(),
            camera: PerspectiveCamera::new(),
            light: None,
            asset: None,
        })
    }
}

/// Best-effort message from a thrown JS value
pub fn describe(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
