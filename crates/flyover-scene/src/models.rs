//! Asynchronous 3D asset loading
//!
//! The host starts a load through [`AssetLoader::load`] and later resolves
//! the handed-out [`LoadSink`] from whatever task finished the fetch. The
//! owner of the [`ModelLoad`] polls it from its own callbacks, so completion
//! is always observed on the render thread.

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why an asset could not be loaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to load asset {path}: {reason}")]
pub struct LoadError {
    pub path: String,
    pub reason: String,
}

/// Host-side asset loader (e.g. a glTF loader)
pub trait AssetLoader {
    /// Root node of a loaded scene
    type Root;

    /// Begin loading `path`; resolve `sink` exactly once when done
    fn load(&mut self, path: &str, sink: LoadSink<Self::Root>);
}

#[derive(Debug)]
enum Slot<R> {
    Waiting,
    Ready(Result<R, LoadError>),
    Taken,
}

/// Completion handle for one in-flight load
#[derive(Debug)]
pub struct LoadSink<R> {
    path: Rc<str>,
    slot: Rc<RefCell<Slot<R>>>,
}

impl<R> Clone for LoadSink<R> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<R> LoadSink<R> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn succeed(&self, root: R) {
        self.resolve(Ok(root));
    }

    pub fn fail(&self, reason: impl Into<String>) {
        self.resolve(Err(LoadError {
            path: self.path.to_string(),
            reason: reason.into(),
        }));
    }

    /// Store the outcome; only the first resolution counts
    pub fn resolve(&self, result: Result<R, LoadError>) {
        let mut slot = self.slot.borrow_mut();
        match *slot {
            Slot::Waiting => *slot = Slot::Ready(result),
            _ => warn!(path = %self.path, "Asset load resolved more than once, ignoring"),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(*self.slot.borrow(), Slot::Waiting)
    }
}

/// Where the single asset load currently stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Pending {
        path: String,
    },
    Loaded {
        path: String,
    },
    Failed(LoadError),
}

impl LoadState {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending { .. })
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Tracks the one in-flight asset load
#[derive(Debug)]
pub struct ModelLoad<R> {
    state: LoadState,
    sink: Option<LoadSink<R>>,
}

impl<R> Default for ModelLoad<R> {
    fn default() -> Self {
        Self {
            state: LoadState::Idle,
            sink: None,
        }
    }
}

impl<R> ModelLoad<R> {
    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Start loading `path`; returns false if a load is already in flight
    pub fn begin<L>(&mut self, loader: &mut L, path: &str) -> bool
    where
        L: AssetLoader<Root = R>,
    {
        if self.state.is_pending() {
            warn!(path, "Asset load already in flight, ignoring");
            return false;
        }

        let sink = LoadSink {
            path: Rc::from(path),
            slot: Rc::new(RefCell::new(Slot::Waiting)),
        };
        self.state = LoadState::Pending {
            path: path.to_string(),
        };
        self.sink = Some(sink.clone());

        debug!(path, "Loading asset");
        loader.load(path, sink);
        true
    }

    /// Take the outcome if the load finished since the last poll
    ///
    /// Returns `Some` exactly once per load.
    pub fn poll(&mut self) -> Option<Result<R, LoadError>> {
        let sink = self.sink.as_ref()?;
        let ready = {
            let mut slot = sink.slot.borrow_mut();
            match std::mem::replace(&mut *slot, Slot::Taken) {
                Slot::Ready(result) => Some(result),
                other => {
                    *slot = other;
                    None
                }
            }
        }?;

        let path = sink.path.to_string();
        self.sink = None;
        match &ready {
            Ok(_) => {
                info!(path = %path, "Asset loaded");
                self.state = LoadState::Loaded { path };
            }
            Err(e) => {
                error!(path = %path, reason = %e.reason, "Asset load failed");
                self.state = LoadState::Failed(e.clone());
            }
        }
        Some(ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Loader that keeps the sink so the test decides when to resolve
    #[derive(Default)]
    struct DeferredLoader {
        sinks: Vec<LoadSink<&'static str>>,
    }

    impl AssetLoader for DeferredLoader {
        type Root = &'static str;

        fn load(&mut self, _path: &str, sink: LoadSink<Self::Root>) {
            self.sinks.push(sink);
        }
    }

    #[test]
    fn test_pending_until_resolved() {
        let mut loader = DeferredLoader::default();
        let mut load = ModelLoad::default();

        assert!(load.begin(&mut loader, "scene.gltf"));
        assert!(load.state().is_pending());
        assert!(load.poll().is_none());

        loader.sinks[0].succeed("root");
        assert_eq!(load.poll(), Some(Ok("root")));
        assert_eq!(
            load.state(),
            &LoadState::Loaded {
                path: "scene.gltf".to_string()
            }
        );
        // Completion is reported once
        assert!(load.poll().is_none());
    }

    #[test]
    fn test_failure_is_inspectable() {
        let mut loader = DeferredLoader::default();
        let mut load = ModelLoad::default();
        load.begin(&mut loader, "missing.gltf");

        loader.sinks[0].fail("HTTP 404");
        let err = load.poll().unwrap().unwrap_err();

        assert_eq!(err.path, "missing.gltf");
        assert_eq!(err.reason, "HTTP 404");
        assert_eq!(load.state().error(), Some(&err));
    }

    #[test]
    fn test_only_one_load_in_flight() {
        let mut loader = DeferredLoader::default();
        let mut load = ModelLoad::default();

        assert!(load.begin(&mut loader, "a.gltf"));
        assert!(!load.begin(&mut loader, "b.gltf"));
        assert_eq!(loader.sinks.len(), 1);
    }

    #[test]
    fn test_second_resolution_ignored() {
        let mut loader = DeferredLoader::default();
        let mut load = ModelLoad::default();
        load.begin(&mut loader, "a.gltf");

        let sink = loader.sinks[0].clone();
        sink.succeed("first");
        sink.fail("late error");
        assert!(sink.is_resolved());
        assert_eq!(load.poll(), Some(Ok("first")));
    }
}
