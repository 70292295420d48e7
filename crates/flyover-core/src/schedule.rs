//! The staged fly-in schedule
//!
//! The animation runs through fixed phases in priority order: tilt first,
//! then zoom, then heading. Each phase advances a single view parameter by a
//! fixed step per frame until it reaches its target. The phase is never
//! stored; it is derived from the view state on every tick.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::view::ViewState;

/// Default tilt target in degrees
pub const DEFAULT_TILT_TARGET: f64 = 60.0;
/// Default tilt increment per frame in degrees
pub const DEFAULT_TILT_STEP: f64 = 0.5;
/// Default zoom target level
pub const DEFAULT_ZOOM_TARGET: f64 = 20.0;
/// Default zoom increment per frame
pub const DEFAULT_ZOOM_STEP: f64 = 0.04;
/// Default heading target in degrees
pub const DEFAULT_HEADING_TARGET: f64 = 125.0;
/// Default heading increment per frame in degrees
pub const DEFAULT_HEADING_STEP: f64 = 0.5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("{param} starts at {initial} but its target is {target}; the phase can never complete")]
    Unreachable {
        param: ViewParam,
        initial: f64,
        target: f64,
    },
    #[error("{param} step must be a positive finite number, got {step}")]
    InvalidStep { param: ViewParam, step: f64 },
    #[error("{param} target must be finite, got {target}")]
    InvalidTarget { param: ViewParam, target: f64 },
}

/// Stage of the fly-in animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Tilt,
    Zoom,
    Heading,
    Done,
}

/// A view parameter the schedule can advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewParam {
    Tilt,
    Zoom,
    Heading,
}

impl ViewParam {
    pub fn get(self, view: &ViewState) -> f64 {
        match self {
            ViewParam::Tilt => view.tilt,
            ViewParam::Zoom => view.zoom,
            ViewParam::Heading => view.heading,
        }
    }

    pub fn get_mut(self, view: &mut ViewState) -> &mut f64 {
        match self {
            ViewParam::Tilt => &mut view.tilt,
            ViewParam::Zoom => &mut view.zoom,
            ViewParam::Heading => &mut view.heading,
        }
    }
}

impl fmt::Display for ViewParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewParam::Tilt => "tilt",
            ViewParam::Zoom => "zoom",
            ViewParam::Heading => "heading",
        };
        f.write_str(name)
    }
}

/// One row of the schedule table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStep {
    pub phase: Phase,
    pub param: ViewParam,
    pub step: f64,
    pub target: f64,
    pub next: Phase,
}

impl PhaseStep {
    /// Whether this phase still has work to do for the given view
    pub fn is_pending(&self, view: &ViewState) -> bool {
        self.param.get(view) < self.target
    }

    /// Advance the parameter by one step, clamped to the target
    pub fn advance(&self, view: &mut ViewState) {
        let value = self.param.get_mut(view);
        *value = (*value + self.step).min(self.target);
    }
}

/// Phase table in priority order
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    steps: [PhaseStep; 3],
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new(
            (DEFAULT_TILT_TARGET, DEFAULT_TILT_STEP),
            (DEFAULT_ZOOM_TARGET, DEFAULT_ZOOM_STEP),
            (DEFAULT_HEADING_TARGET, DEFAULT_HEADING_STEP),
        )
    }
}

impl Schedule {
    /// Build the table from `(target, step)` pairs for each parameter
    pub fn new(tilt: (f64, f64), zoom: (f64, f64), heading: (f64, f64)) -> Self {
        Self {
            steps: [
                PhaseStep {
                    phase: Phase::Tilt,
                    param: ViewParam::Tilt,
                    target: tilt.0,
                    step: tilt.1,
                    next: Phase::Zoom,
                },
                PhaseStep {
                    phase: Phase::Zoom,
                    param: ViewParam::Zoom,
                    target: zoom.0,
                    step: zoom.1,
                    next: Phase::Heading,
                },
                PhaseStep {
                    phase: Phase::Heading,
                    param: ViewParam::Heading,
                    target: heading.0,
                    step: heading.1,
                    next: Phase::Done,
                },
            ],
        }
    }

    pub fn steps(&self) -> &[PhaseStep] {
        &self.steps
    }

    /// Table row for a phase, `None` for `Done`
    pub fn step_for(&self, phase: Phase) -> Option<&PhaseStep> {
        self.steps.iter().find(|s| s.phase == phase)
    }

    /// Current phase: the first row whose parameter is still below target
    pub fn phase_for(&self, view: &ViewState) -> Phase {
        self.steps
            .iter()
            .find(|s| s.is_pending(view))
            .map(|s| s.phase)
            .unwrap_or(Phase::Done)
    }

    /// Check that every phase can complete from the given starting view
    pub fn validate(&self, initial: &ViewState) -> Result<(), ScheduleError> {
        for row in &self.steps {
            if !row.target.is_finite() {
                return Err(ScheduleError::InvalidTarget {
                    param: row.param,
                    target: row.target,
                });
            }
            if !row.step.is_finite() || row.step <= 0.0 {
                return Err(ScheduleError::InvalidStep {
                    param: row.param,
                    step: row.step,
                });
            }
            let value = row.param.get(initial);
            if !value.is_finite() || value > row.target {
                return Err(ScheduleError::Unreachable {
                    param: row.param,
                    initial: value,
                    target: row.target,
                });
            }
        }
        Ok(())
    }
}
