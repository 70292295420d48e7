//! Page bootstrap: config, Maps API, map, and overlay wiring

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use flyover_core::config::WebConfig;
use flyover_core::Tick;
use flyover_scene::{OverlayController, OverlayEvent, OverlaySettings};

use crate::host::{describe, GltfAssetLoader, ThreeRendererFactory, WebMapHost};
use crate::maps::{self, CoordinateTransformer, GoogleMap, WebGLOverlayView};

type Controller = OverlayController<WebMapHost, GltfAssetLoader, ThreeRendererFactory>;
type SharedController = Rc<RefCell<Controller>>;

const CONFIG_URL: &str = "config.json";

/// Load everything and register the overlay
pub async fn run() {
    if let Err(e) = start().await {
        tracing::error!("Flyover failed to start: {}", e);
        web_sys::console::error_1(&format!("Flyover failed to start: {}", e).into());
    }
}

async fn start() -> Result<(), String> {
    let config = fetch_config(CONFIG_URL).await?;
    tracing::info!(
        lat = config.view.lat,
        lng = config.view.lng,
        asset = %config.asset.path,
        "Configuration loaded"
    );

    let api_key = config
        .api_key
        .clone()
        .ok_or("no map API key in config; set it in the server environment")?;
    load_maps_api(&api_key).await?;

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("No document")?;
    let container = document
        .get_element_by_id(&config.map.container_id)
        .ok_or_else(|| format!("No element with id '{}'", config.map.container_id))?;

    let settings = OverlaySettings::from(&config);
    let map = GoogleMap::new(&container, &maps::map_options(&config.map, &settings.initial_view));
    let overlay = WebGLOverlayView::new();
    let host = WebMapHost::new(map, overlay.clone());
    let loader = GltfAssetLoader::default();

    let controller: SharedController = Rc::new(RefCell::new(
        OverlayController::new(settings, host, loader, ThreeRendererFactory)
            .map_err(|e| e.to_string())?,
    ));

    {
        // Completion signal for the asset load
        let weak = Rc::downgrade(&controller);
        controller.borrow().loader().set_on_settled(move || {
            if let Some(controller) = weak.upgrade() {
                controller.borrow_mut().poll_load();
                dispatch_events(&controller);
            }
        });
    }

    register_callbacks(&overlay, &controller);
    controller.borrow().map().attach_overlay();
    Ok(())
}

/// Fetch and parse the server-provided config
async fn fetch_config(url: &str) -> Result<WebConfig, String> {
    let window = web_sys::window().ok_or("No window")?;

    let resp = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| format!("Fetch failed: {}", describe(&e)))?;
    let resp: web_sys::Response = resp.dyn_into().map_err(|_| "Response cast failed")?;

    if !resp.ok() {
        return Err(format!("HTTP {}: {}", resp.status(), resp.status_text()));
    }

    let text = JsFuture::from(resp.text().map_err(|_| "Failed to get text")?)
        .await
        .map_err(|e| format!("Text extraction failed: {}", describe(&e)))?;
    let text = text.as_string().ok_or("Not a string")?;

    WebConfig::from_json(&text).map_err(|e| e.to_string())
}

/// Inject the Maps JavaScript API script and wait for it to load
async fn load_maps_api(api_key: &str) -> Result<(), String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("No document")?;
    let head = document.head().ok_or("No head element")?;

    let script: web_sys::HtmlScriptElement = document
        .create_element("script")
        .map_err(|e| describe(&e))?
        .unchecked_into();
    script.set_src(&format!(
        "https://maps.googleapis.com/maps/api/js?key={}&v=beta",
        api_key
    ));
    script.set_async(true);

    let loaded = Promise::new(&mut |resolve, reject| {
        script.set_onload(Some(&resolve));
        script.set_onerror(Some(&reject));
    });
    head.append_child(&script).map_err(|e| describe(&e))?;

    JsFuture::from(loaded)
        .await
        .map(|_| ())
        .map_err(|_| "Failed to load the Maps JavaScript API".to_string())
}

/// Hook the overlay's lifecycle callbacks up to the controller
fn register_callbacks(overlay: &WebGLOverlayView, controller: &SharedController) {
    let c = controller.clone();
    let on_add = Closure::wrap(Box::new(move || {
        c.borrow_mut().on_attach();
        dispatch_events(&c);
    }) as Box<dyn FnMut()>);
    overlay.set_on_add(on_add.as_ref().unchecked_ref());
    on_add.forget();

    let c = controller.clone();
    let on_context_restored = Closure::wrap(Box::new(move |options: JsValue| {
        let gl = Reflect::get(&options, &JsValue::from_str("gl")).unwrap_or(JsValue::UNDEFINED);
        // Failures are queued as events and reported by dispatch_events
        let _ = c.borrow_mut().on_context_ready(&gl);
        dispatch_events(&c);
    }) as Box<dyn FnMut(JsValue)>);
    overlay.set_on_context_restored(on_context_restored.as_ref().unchecked_ref());
    on_context_restored.forget();

    let c = controller.clone();
    let on_draw = Closure::wrap(Box::new(move |options: JsValue| {
        match Reflect::get(&options, &JsValue::from_str("transformer")) {
            Ok(transformer) if transformer.is_object() => {
                let frame = maps::FrameTransform(transformer.unchecked_into::<CoordinateTransformer>());
                match c.try_borrow_mut() {
                    Ok(mut controller) => controller.on_draw(&frame),
                    Err(_) => tracing::debug!("Draw re-entered the overlay, skipping frame"),
                }
            }
            _ => tracing::warn!("Draw callback without transformer"),
        }
        dispatch_events(&c);
    }) as Box<dyn FnMut(JsValue)>);
    overlay.set_on_draw(on_draw.as_ref().unchecked_ref());
    on_draw.forget();

    let c = controller.clone();
    let on_context_lost = Closure::wrap(Box::new(move || {
        c.borrow_mut().on_context_lost();
    }) as Box<dyn FnMut()>);
    overlay.set_on_context_lost(on_context_lost.as_ref().unchecked_ref());
    on_context_lost.forget();

    let c = controller.clone();
    let on_remove = Closure::wrap(Box::new(move || {
        c.borrow_mut().on_remove();
    }) as Box<dyn FnMut()>);
    overlay.set_on_remove(on_remove.as_ref().unchecked_ref());
    on_remove.forget();
}

/// React to controller notifications
fn dispatch_events(controller: &SharedController) {
    let events = match controller.try_borrow_mut() {
        Ok(mut controller) => controller.take_events(),
        Err(_) => return,
    };
    for event in events {
        match event {
            OverlayEvent::AssetLoaded => tracing::info!("Model placed in scene"),
            OverlayEvent::AnimationStarted => start_animation_loop(controller.clone()),
            OverlayEvent::AnimationFinished { frames } => {
                tracing::info!(frames, "Fly-in complete")
            }
            OverlayEvent::Failed(e) => {
                tracing::error!(error = %e, "Overlay failure");
                web_sys::console::error_1(&format!("Flyover: {}", e).into());
            }
        }
    }
}

/// Drive `on_animation_frame` from `requestAnimationFrame` until it reports done
fn start_animation_loop(controller: SharedController) {
    let frame: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next = frame.clone();

    *frame.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        let tick = controller.borrow_mut().on_animation_frame();
        dispatch_events(&controller);
        match tick {
            Tick::Continue(_) => request_frame(&next),
            // Dropping the closure unregisters the loop
            Tick::Done => drop(next.borrow_mut().take()),
        }
    }) as Box<dyn FnMut()>));

    request_frame(&frame);
}

fn request_frame(frame: &Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Some(callback) = frame.borrow().as_ref() {
        if let Err(e) = window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            tracing::error!("requestAnimationFrame failed: {}", describe(&e));
        }
    }
}
