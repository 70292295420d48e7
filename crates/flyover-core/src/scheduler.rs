//! Per-frame driver for the fly-in schedule
//!
//! The scheduler holds no view state of its own. The owner lends it the
//! current [`ViewState`] each frame and pushes the result to the host map.

use tracing::{debug, info};

use crate::schedule::{Phase, Schedule};
use crate::view::ViewState;

/// Outcome of a single animation frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A parameter advanced during the given phase; keep ticking
    Continue(Phase),
    /// Every target is reached; unregister the frame callback
    Done,
}

#[derive(Debug, Clone)]
pub struct AnimationScheduler {
    schedule: Schedule,
    finished: bool,
    frames: u64,
}

impl AnimationScheduler {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            finished: false,
            frames: 0,
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Phase the next tick will run for this view
    pub fn phase(&self, view: &ViewState) -> Phase {
        if self.finished {
            Phase::Done
        } else {
            self.schedule.phase_for(view)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of frames that advanced a parameter
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Advance exactly one parameter by one step
    ///
    /// Once `Done` has been returned the scheduler is terminal and leaves the
    /// view untouched on every later call.
    pub fn tick(&mut self, view: &mut ViewState) -> Tick {
        if self.finished {
            return Tick::Done;
        }

        let phase = self.schedule.phase_for(view);
        let Some(row) = self.schedule.step_for(phase) else {
            self.finished = true;
            info!(
                frames = self.frames,
                tilt = view.tilt,
                zoom = view.zoom,
                heading = view.heading,
                "Fly-in schedule complete"
            );
            return Tick::Done;
        };

        row.advance(view);
        self.frames += 1;

        if !row.is_pending(view) {
            debug!(phase = ?phase, next = ?row.next, value = row.param.get(view), "Phase reached target");
        }

        Tick::Continue(phase)
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new(Schedule::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::LatLng;

    fn initial() -> ViewState {
        ViewState::new(LatLng::new(43.661036, -79.371277), 10.0, 17.0, 10.0)
    }

    #[test]
    fn test_tilt_phase_only_moves_tilt() {
        let mut scheduler = AnimationScheduler::default();
        let mut view = initial();

        while view.tilt < 60.0 {
            let before = view;
            assert_eq!(scheduler.tick(&mut view), Tick::Continue(Phase::Tilt));
            assert_eq!(view.tilt, before.tilt + 0.5);
            assert_eq!(view.zoom, before.zoom);
            assert_eq!(view.heading, before.heading);
        }
    }

    #[test]
    fn test_hundred_ticks_reach_tilt_target() {
        let mut scheduler = AnimationScheduler::default();
        let mut view = initial();

        for _ in 0..100 {
            scheduler.tick(&mut view);
        }

        assert_eq!(view.tilt, 60.0);
        assert_eq!(scheduler.phase(&view), Phase::Zoom);
        assert_eq!(scheduler.frames(), 100);
    }

    #[test]
    fn test_zoom_phase_only_moves_zoom() {
        let mut scheduler = AnimationScheduler::default();
        let mut view = ViewState {
            tilt: 60.0,
            ..initial()
        };

        let before = view;
        assert_eq!(scheduler.tick(&mut view), Tick::Continue(Phase::Zoom));
        assert!((view.zoom - (before.zoom + 0.04)).abs() < 1e-12);
        assert_eq!(view.tilt, before.tilt);
        assert_eq!(view.heading, before.heading);
    }

    #[test]
    fn test_heading_phase_only_moves_heading() {
        let mut scheduler = AnimationScheduler::default();
        let mut view = ViewState {
            tilt: 60.0,
            zoom: 20.0,
            ..initial()
        };

        let before = view;
        assert_eq!(scheduler.tick(&mut view), Tick::Continue(Phase::Heading));
        assert_eq!(view.heading, before.heading + 0.5);
        assert_eq!(view.tilt, before.tilt);
        assert_eq!(view.zoom, before.zoom);
    }

    #[test]
    fn test_runs_to_done_without_overshoot() {
        let mut scheduler = AnimationScheduler::default();
        let mut view = initial();
        let mut last = view;
        let mut ticks = 0;

        while scheduler.tick(&mut view) != Tick::Done {
            assert!(view.tilt >= last.tilt && view.tilt <= 60.0);
            assert!(view.zoom >= last.zoom && view.zoom <= 20.0);
            assert!(view.heading >= last.heading && view.heading <= 125.0);
            last = view;
            ticks += 1;
            assert!(ticks < 10_000, "schedule did not terminate");
        }

        assert_eq!(view.tilt, 60.0);
        assert_eq!(view.zoom, 20.0);
        assert_eq!(view.heading, 125.0);
        assert!(scheduler.is_finished());
    }

    #[test]
    fn test_done_is_terminal() {
        let mut scheduler = AnimationScheduler::default();
        let mut view = ViewState {
            tilt: 60.0,
            zoom: 20.0,
            heading: 125.0,
            ..initial()
        };

        assert_eq!(scheduler.tick(&mut view), Tick::Done);

        // Even if an outside reset lowers a value, a finished scheduler stays put
        view.tilt = 0.0;
        assert_eq!(scheduler.tick(&mut view), Tick::Done);
        assert_eq!(view.tilt, 0.0);
        assert_eq!(scheduler.phase(&view), Phase::Done);
    }
}
