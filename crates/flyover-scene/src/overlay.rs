//! Overlay lifecycle
//!
//! [`OverlayController`] is what the host map's overlay callbacks talk to.
//! It owns the view state, the scene, the renderer, and the fly-in
//! scheduler, and ties them together:
//!
//! - attach builds the scene and starts the asset load
//! - context-ready (re)builds the renderer; animation state survives
//! - draw projects the camera from the host transform and renders
//! - each animation frame advances the schedule and moves the map camera
//!
//! The fly-in starts once the asset has loaded and a renderer exists, and
//! unregisters itself when every target is reached.

use flyover_core::config::{Config, WebConfig};
use flyover_core::{
    AnimationScheduler, LatLngAltitude, MapHost, Phase, Schedule, ScheduleError, Tick,
    TransformError, TransformProvider, ViewState,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::camera::CameraProjector;
use crate::models::{AssetLoader, LoadError, LoadState, ModelLoad};
use crate::render::{ContextError, Renderer, RendererFactory};
use crate::scene::SceneGraph;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverlayError {
    #[error(transparent)]
    LoadFailure(#[from] LoadError),
    #[error("Graphics context unavailable: {0}")]
    ContextUnavailable(#[from] ContextError),
    #[error("Frame transform failed: {0}")]
    FrameTransform(#[from] TransformError),
    #[error("Misconfigured fly-in schedule: {0}")]
    MisconfiguredSchedule(#[from] ScheduleError),
}

/// Notifications for the host binding, drained with [`OverlayController::take_events`]
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    AssetLoaded,
    /// The per-frame animation callback should be registered
    AnimationStarted,
    /// The per-frame animation callback has been unregistered
    AnimationFinished { frames: u64 },
    Failed(OverlayError),
}

/// Registration state of the per-frame animation callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationLoop {
    Idle,
    Running,
    Finished,
    Cancelled,
}

/// Everything the controller needs from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    pub initial_view: ViewState,
    pub schedule: Schedule,
    pub anchor: LatLngAltitude,
    pub asset_path: String,
}

impl From<&Config> for OverlaySettings {
    fn from(config: &Config) -> Self {
        Self {
            initial_view: config.initial_view(),
            schedule: config.schedule(),
            anchor: config.anchor(),
            asset_path: config.asset.path.clone(),
        }
    }
}

impl From<&WebConfig> for OverlaySettings {
    fn from(config: &WebConfig) -> Self {
        Self {
            initial_view: config.initial_view(),
            schedule: config.schedule(),
            anchor: config.anchor(),
            asset_path: config.asset.path.clone(),
        }
    }
}

pub struct OverlayController<M, L, F>
where
    L: AssetLoader,
    F: RendererFactory<Root = L::Root>,
{
    map: M,
    loader: L,
    factory: F,
    view: ViewState,
    scheduler: AnimationScheduler,
    projector: CameraProjector,
    asset_path: String,
    scene: Option<SceneGraph<L::Root>>,
    renderer: Option<F::Renderer>,
    load: ModelLoad<L::Root>,
    animation: AnimationLoop,
    start_pending: bool,
    transform_failing: bool,
    events: Vec<OverlayEvent>,
}

impl<M, L, F> OverlayController<M, L, F>
where
    M: MapHost,
    L: AssetLoader,
    F: RendererFactory<Root = L::Root>,
{
    /// Validate the schedule against the initial view and set up state
    ///
    /// The caller registers the overlay with the host map once, right after
    /// construction.
    pub fn new(settings: OverlaySettings, map: M, loader: L, factory: F) -> Result<Self, OverlayError> {
        settings.schedule.validate(&settings.initial_view)?;

        Ok(Self {
            map,
            loader,
            factory,
            view: settings.initial_view,
            scheduler: AnimationScheduler::new(settings.schedule),
            projector: CameraProjector::new(settings.anchor),
            asset_path: settings.asset_path,
            scene: None,
            renderer: None,
            load: ModelLoad::default(),
            animation: AnimationLoop::Idle,
            start_pending: false,
            transform_failing: false,
            events: Vec::new(),
        })
    }

    /// Build the scene and start loading the asset
    pub fn on_attach(&mut self) {
        if self.scene.is_some() {
            warn!("Overlay attached twice, ignoring");
            return;
        }

        self.scene = Some(SceneGraph::new());
        info!(path = %self.asset_path, "Overlay attached");
        self.load.begin(&mut self.loader, &self.asset_path);
        self.poll_load();
    }

    /// (Re)create the renderer for a fresh or restored graphics context
    ///
    /// View state and animation progress are kept as they are.
    pub fn on_context_ready(&mut self, context: &F::Context) -> Result<(), OverlayError> {
        match self.factory.create(context) {
            Ok(mut renderer) => {
                renderer.set_auto_clear(false);
                let restored = self.renderer.replace(renderer).is_some();
                info!(restored, phase = ?self.phase(), "Renderer ready");
            }
            Err(reason) => {
                self.renderer = None;
                let err = OverlayError::ContextUnavailable(reason);
                error!(error = %err, "Cannot create renderer");
                self.events.push(OverlayEvent::Failed(err.clone()));
                return Err(err);
            }
        }

        self.poll_load();
        self.try_start_animation();
        Ok(())
    }

    pub fn on_context_lost(&mut self) {
        if self.renderer.take().is_some() {
            warn!(phase = ?self.phase(), "Graphics context lost, dropping renderer");
        }
    }

    /// Sync the camera to this frame's host transform and render the scene
    ///
    /// A frame whose transform cannot be read is skipped entirely; the
    /// failure is reported once until a later frame succeeds.
    pub fn on_draw<T>(&mut self, frame: &T)
    where
        T: TransformProvider + ?Sized,
    {
        self.poll_load();

        let Some(scene) = self.scene.as_mut() else {
            debug!("Draw before attach, skipping");
            return;
        };

        if let Err(e) = self.projector.project(frame, &mut scene.camera) {
            if !self.transform_failing {
                self.transform_failing = true;
                let err = OverlayError::FrameTransform(e);
                error!(error = %err, "Skipping frame");
                self.events.push(OverlayEvent::Failed(err));
            }
            return;
        }
        self.transform_failing = false;
        self.map.request_redraw();

        match self.renderer.as_mut() {
            Some(renderer) => {
                renderer.render(scene);
                renderer.reset_state();
            }
            None => debug!("No renderer yet, skipping render"),
        }
    }

    /// Advance the fly-in by one frame
    ///
    /// Returns [`Tick::Done`] once the schedule has completed or if the
    /// animation is not running; the host stops calling at that point.
    pub fn on_animation_frame(&mut self) -> Tick {
        if self.animation != AnimationLoop::Running {
            return Tick::Done;
        }

        let tick = self.scheduler.tick(&mut self.view);
        match tick {
            Tick::Continue(_) => self.map.move_camera(self.view.camera_options()),
            Tick::Done => {
                self.animation = AnimationLoop::Finished;
                let frames = self.scheduler.frames();
                info!(frames, "Fly-in finished, unregistering animation loop");
                self.events.push(OverlayEvent::AnimationFinished { frames });
            }
        }
        tick
    }

    /// Tear down scene, renderer, and animation loop
    pub fn on_remove(&mut self) {
        if self.animation == AnimationLoop::Running {
            self.animation = AnimationLoop::Cancelled;
        }
        self.renderer = None;
        self.scene = None;
        info!("Overlay removed");
    }

    /// Pick up a finished asset load, if any
    ///
    /// Called from every callback; hosts may also call it right after
    /// resolving a load so completion is handled without waiting for a draw.
    pub fn poll_load(&mut self) {
        let Some(result) = self.load.poll() else {
            return;
        };

        match result {
            Ok(root) => {
                match self.scene.as_mut() {
                    Some(scene) => {
                        scene.insert_asset(root);
                    }
                    None => {
                        warn!("Asset finished loading after overlay removal, dropping");
                        return;
                    }
                }
                self.events.push(OverlayEvent::AssetLoaded);
                self.start_pending = true;
                self.try_start_animation();
            }
            Err(e) => {
                self.events.push(OverlayEvent::Failed(OverlayError::LoadFailure(e)));
            }
        }
    }

    fn try_start_animation(&mut self) {
        if !self.start_pending || self.renderer.is_none() {
            return;
        }
        self.start_pending = false;

        if self.animation != AnimationLoop::Idle {
            debug!(state = ?self.animation, "Animation loop already registered once");
            return;
        }

        self.animation = AnimationLoop::Running;
        info!(
            tilt = self.view.tilt,
            zoom = self.view.zoom,
            heading = self.view.heading,
            "Starting fly-in"
        );
        self.events.push(OverlayEvent::AnimationStarted);
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn phase(&self) -> Phase {
        self.scheduler.phase(&self.view)
    }

    pub fn animation_state(&self) -> AnimationLoop {
        self.animation
    }

    /// Whether the per-frame animation callback should be registered
    pub fn animation_active(&self) -> bool {
        self.animation == AnimationLoop::Running
    }

    pub fn load_state(&self) -> &LoadState {
        self.load.state()
    }

    pub fn scene(&self) -> Option<&SceneGraph<L::Root>> {
        self.scene.as_ref()
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn take_events(&mut self) -> Vec<OverlayEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoadSink;
    use bevy::math::DMat4;
    use flyover_core::{CameraOptions, LatLng, ProjectionMatrix};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct MapLog {
        moves: Vec<CameraOptions>,
        redraws: usize,
    }

    #[derive(Clone, Default)]
    struct RecordingMap(Rc<RefCell<MapLog>>);

    impl MapHost for RecordingMap {
        fn move_camera(&mut self, options: CameraOptions) {
            self.0.borrow_mut().moves.push(options);
        }

        fn request_redraw(&mut self) {
            self.0.borrow_mut().redraws += 1;
        }
    }

    #[derive(Clone, Default)]
    struct DeferredLoader {
        sinks: Rc<RefCell<Vec<LoadSink<&'static str>>>>,
    }

    impl DeferredLoader {
        fn sink(&self) -> LoadSink<&'static str> {
            self.sinks.borrow()[0].clone()
        }
    }

    impl AssetLoader for DeferredLoader {
        type Root = &'static str;

        fn load(&mut self, _path: &str, sink: LoadSink<Self::Root>) {
            self.sinks.borrow_mut().push(sink);
        }
    }

    #[derive(Default)]
    struct RenderLog {
        created: usize,
        auto_clear: Vec<bool>,
        frames: Vec<(DMat4, bool)>,
        resets: usize,
    }

    struct TestRenderer(Rc<RefCell<RenderLog>>);

    impl Renderer for TestRenderer {
        type Root = &'static str;

        fn set_auto_clear(&mut self, enabled: bool) {
            self.0.borrow_mut().auto_clear.push(enabled);
        }

        fn render(&mut self, scene: &SceneGraph<Self::Root>) {
            self.0
                .borrow_mut()
                .frames
                .push((scene.camera.projection, scene.has_asset()));
        }

        fn reset_state(&mut self) {
            self.0.borrow_mut().resets += 1;
        }
    }

    #[derive(Clone, Default)]
    struct TestFactory(Rc<RefCell<RenderLog>>);

    /// `true` means the context can be used
    impl RendererFactory for TestFactory {
        type Context = bool;
        type Root = &'static str;
        type Renderer = TestRenderer;

        fn create(&mut self, context: &bool) -> Result<TestRenderer, ContextError> {
            if !*context {
                return Err(ContextError::Rejected("WebGL2 not supported".to_string()));
            }
            self.0.borrow_mut().created += 1;
            Ok(TestRenderer(self.0.clone()))
        }
    }

    type TestController = OverlayController<RecordingMap, DeferredLoader, TestFactory>;

    fn settings() -> OverlaySettings {
        OverlaySettings {
            initial_view: ViewState::new(LatLng::new(43.661036, -79.371277), 10.0, 17.0, 10.0),
            schedule: Schedule::default(),
            anchor: LatLng::new(43.661036, -79.371277).with_altitude(120.0),
            asset_path: "assets/scene.gltf".to_string(),
        }
    }

    fn controller() -> (TestController, RecordingMap, DeferredLoader, TestFactory) {
        let map = RecordingMap::default();
        let loader = DeferredLoader::default();
        let factory = TestFactory::default();
        let overlay =
            OverlayController::new(settings(), map.clone(), loader.clone(), factory.clone()).unwrap();
        (overlay, map, loader, factory)
    }

    /// Attach, load the asset, and bring up a renderer
    fn running() -> (TestController, RecordingMap, DeferredLoader, TestFactory) {
        let (mut overlay, map, loader, factory) = controller();
        overlay.on_attach();
        overlay.on_context_ready(&true).unwrap();
        loader.sink().succeed("scooter");
        overlay.poll_load();
        assert!(overlay.animation_active());
        (overlay, map, loader, factory)
    }

    /// Distinct per-element values, none of them exact in f32
    fn matrix(base: f64) -> ProjectionMatrix {
        std::array::from_fn(|i| base + 0.1 * (i + 1) as f64)
    }

    /// Host transformer that hands back a malformed matrix
    struct ShortTransform;

    impl TransformProvider for ShortTransform {
        fn from_lat_lng_altitude(&self, _: LatLngAltitude) -> Result<ProjectionMatrix, TransformError> {
            Err(TransformError::BadLength(0))
        }
    }

    #[test]
    fn test_rejects_unreachable_schedule() {
        let mut bad = settings();
        bad.initial_view.tilt = 100.0;
        let result = OverlayController::new(
            bad,
            RecordingMap::default(),
            DeferredLoader::default(),
            TestFactory::default(),
        );

        assert!(matches!(
            result,
            Err(OverlayError::MisconfiguredSchedule(ScheduleError::Unreachable { .. }))
        ));
    }

    #[test]
    fn test_attach_builds_scene_and_starts_load() {
        let (mut overlay, _, loader, _) = controller();
        assert!(overlay.scene().is_none());

        overlay.on_attach();

        let scene = overlay.scene().unwrap();
        assert!(!scene.has_asset());
        assert_eq!(loader.sinks.borrow().len(), 1);
        assert_eq!(loader.sink().path(), "assets/scene.gltf");
        assert!(overlay.load_state().is_pending());
    }

    #[test]
    fn test_context_ready_disables_auto_clear() {
        let (mut overlay, _, _, factory) = controller();
        overlay.on_attach();
        overlay.on_context_ready(&true).unwrap();

        assert!(overlay.has_renderer());
        assert_eq!(factory.0.borrow().auto_clear, vec![false]);
        // Not loaded yet, so no animation
        assert!(!overlay.animation_active());
    }

    #[test]
    fn test_animation_starts_once_after_load_and_context() {
        let (mut overlay, _, loader, _) = controller();
        overlay.on_attach();
        loader.sink().succeed("scooter");
        overlay.poll_load();

        // Loaded, but waiting for a renderer
        assert!(overlay.scene().unwrap().has_asset());
        assert!(!overlay.animation_active());

        overlay.on_context_ready(&true).unwrap();
        assert!(overlay.animation_active());

        overlay.on_context_ready(&true).unwrap();
        let started = overlay
            .take_events()
            .into_iter()
            .filter(|e| *e == OverlayEvent::AnimationStarted)
            .count();
        assert_eq!(started, 1);
    }

    #[test]
    fn test_load_failure_is_reported() {
        let (mut overlay, map, loader, _) = controller();
        overlay.on_attach();
        overlay.on_context_ready(&true).unwrap();
        loader.sink().fail("404 Not Found");
        overlay.on_draw(&|_: LatLngAltitude| matrix(0.0));

        let err = overlay.load_state().error().cloned().unwrap();
        assert_eq!(err.path, "assets/scene.gltf");
        assert!(overlay
            .take_events()
            .contains(&OverlayEvent::Failed(OverlayError::LoadFailure(err))));
        assert_eq!(overlay.animation_state(), AnimationLoop::Idle);
        assert_eq!(overlay.on_animation_frame(), Tick::Done);
        assert!(map.0.borrow().moves.is_empty());
    }

    #[test]
    fn test_context_unavailable_is_reported() {
        let (mut overlay, _, _, _) = controller();
        overlay.on_attach();

        let err = overlay.on_context_ready(&false).unwrap_err();
        assert_eq!(
            err,
            OverlayError::ContextUnavailable(ContextError::Rejected(
                "WebGL2 not supported".to_string()
            ))
        );
        assert!(!overlay.has_renderer());
        assert_eq!(overlay.take_events(), vec![OverlayEvent::Failed(err)]);
    }

    #[test]
    fn test_draw_uses_this_frames_transform() {
        let (mut overlay, map, _, factory) = running();
        let anchor = settings().anchor;

        for frame in 0..3 {
            let queried = RefCell::new(None);
            let provider = |at: LatLngAltitude| {
                *queried.borrow_mut() = Some(at);
                matrix(frame as f64 * 10.0)
            };
            overlay.on_draw(&provider);
            assert_eq!(*queried.borrow(), Some(anchor));
        }

        let log = factory.0.borrow();
        assert_eq!(log.frames.len(), 3);
        for (frame, (projection, has_asset)) in log.frames.iter().enumerate() {
            assert_eq!(projection.to_cols_array(), matrix(frame as f64 * 10.0));
            assert!(has_asset);
        }
        assert_eq!(log.resets, 3);
        assert_eq!(map.0.borrow().redraws, 3);
    }

    #[test]
    fn test_draw_without_renderer_still_requests_redraw() {
        let (mut overlay, map, _, _) = controller();
        overlay.on_draw(&|_: LatLngAltitude| matrix(0.0));
        assert_eq!(map.0.borrow().redraws, 0);

        overlay.on_attach();
        overlay.on_draw(&|_: LatLngAltitude| matrix(0.0));
        assert_eq!(map.0.borrow().redraws, 1);
        assert_eq!(
            overlay.scene().unwrap().camera.projection.to_cols_array(),
            matrix(0.0)
        );
    }

    #[test]
    fn test_draw_applies_host_matrix_bit_for_bit() {
        let (mut overlay, _, _, factory) = running();
        overlay.on_draw(&|_: LatLngAltitude| [0.1; 16]);

        let log = factory.0.borrow();
        let (projection, _) = log.frames[0];
        assert!(projection
            .to_cols_array()
            .iter()
            .all(|v| v.to_bits() == 0.1f64.to_bits()));
    }

    #[test]
    fn test_bad_transform_skips_frame_and_reports_once() {
        let (mut overlay, map, _, factory) = running();
        overlay.take_events();

        overlay.on_draw(&ShortTransform);
        overlay.on_draw(&ShortTransform);

        assert!(factory.0.borrow().frames.is_empty());
        assert_eq!(factory.0.borrow().resets, 0);
        assert_eq!(map.0.borrow().redraws, 0);
        assert_eq!(
            overlay.take_events(),
            vec![OverlayEvent::Failed(OverlayError::FrameTransform(
                TransformError::BadLength(0)
            ))]
        );

        // A good frame renders again
        overlay.on_draw(&|_: LatLngAltitude| matrix(0.0));
        assert_eq!(factory.0.borrow().frames.len(), 1);
        assert_eq!(map.0.borrow().redraws, 1);
        assert!(overlay.take_events().is_empty());
    }

    #[test]
    fn test_each_frame_moves_camera_with_full_state() {
        let (mut overlay, map, _, _) = running();

        assert_eq!(overlay.on_animation_frame(), Tick::Continue(Phase::Tilt));
        assert_eq!(overlay.on_animation_frame(), Tick::Continue(Phase::Tilt));

        let log = map.0.borrow();
        assert_eq!(
            log.moves,
            vec![
                CameraOptions {
                    tilt: 10.5,
                    heading: 10.0,
                    zoom: 17.0
                },
                CameraOptions {
                    tilt: 11.0,
                    heading: 10.0,
                    zoom: 17.0
                },
            ]
        );
    }

    #[test]
    fn test_runs_to_done_and_unregisters() {
        let (mut overlay, map, _, _) = running();

        let mut frames = 0;
        while overlay.on_animation_frame() != Tick::Done {
            frames += 1;
            assert!(frames < 10_000);
        }

        assert!(!overlay.animation_active());
        assert_eq!(overlay.animation_state(), AnimationLoop::Finished);
        assert_eq!(overlay.phase(), Phase::Done);
        let final_view = *overlay.view();
        assert_eq!(final_view.tilt, 60.0);
        assert_eq!(final_view.zoom, 20.0);
        assert_eq!(final_view.heading, 125.0);

        let moves = map.0.borrow().moves.len();
        assert_eq!(moves, frames);

        // Later invocations are no-ops
        assert_eq!(overlay.on_animation_frame(), Tick::Done);
        assert_eq!(*overlay.view(), final_view);
        assert_eq!(map.0.borrow().moves.len(), moves);
        assert!(overlay
            .take_events()
            .contains(&OverlayEvent::AnimationFinished {
                frames: frames as u64
            }));
    }

    #[test]
    fn test_context_restore_keeps_animation_progress() {
        let (mut overlay, _, _, factory) = running();

        for _ in 0..105 {
            overlay.on_animation_frame();
        }
        assert_eq!(overlay.phase(), Phase::Zoom);
        let before = *overlay.view();

        overlay.on_context_lost();
        assert!(!overlay.has_renderer());
        overlay.on_context_ready(&true).unwrap();

        assert_eq!(factory.0.borrow().created, 2);
        assert_eq!(*overlay.view(), before);
        assert_eq!(overlay.view().tilt, 60.0);
        assert!(overlay.animation_active());
        assert_eq!(overlay.on_animation_frame(), Tick::Continue(Phase::Zoom));
        assert_eq!(overlay.view().tilt, 60.0);
    }

    #[test]
    fn test_remove_tears_down() {
        let (mut overlay, _, _, _) = running();
        overlay.on_remove();

        assert!(overlay.scene().is_none());
        assert!(!overlay.has_renderer());
        assert_eq!(overlay.animation_state(), AnimationLoop::Cancelled);
        assert_eq!(overlay.on_animation_frame(), Tick::Done);
    }

    #[test]
    fn test_load_finishing_after_remove_is_dropped() {
        let (mut overlay, _, loader, _) = controller();
        overlay.on_attach();
        overlay.on_context_ready(&true).unwrap();
        overlay.on_remove();

        loader.sink().succeed("scooter");
        overlay.poll_load();

        assert!(overlay.scene().is_none());
        assert_eq!(overlay.animation_state(), AnimationLoop::Idle);
        assert!(!overlay.animation_active());
        assert!(!overlay.take_events().contains(&OverlayEvent::AssetLoaded));
        assert_eq!(overlay.on_animation_frame(), Tick::Done);
    }

    #[test]
    fn test_settings_from_config() {
        let settings = OverlaySettings::from(&Config::default());
        assert_eq!(settings.anchor.altitude, 120.0);
        assert_eq!(settings.initial_view.tilt, 10.0);
        assert_eq!(settings.asset_path, "assets/low_poly_scooter/scene.gltf");
    }
}
