//! Consumers of per-frame engine results.

use super::RunSummary;
use crate::capture::Frame;
use crate::detection::EvaluationResult;
use std::cell::RefCell;
use std::rc::Rc;

/// Receives the engine's results after each evaluated frame.
///
/// Observers run synchronously inside the frame loop and should not
/// block for long.
pub trait FrameObserver {
    /// Called once per evaluated frame with one result per lane, in
    /// registration order. Not called for the priming frame.
    fn on_frame(&mut self, frame: &Frame, results: &[EvaluationResult]);

    /// Called once when the engine drains.
    fn on_finished(&mut self, _summary: &RunSummary) {}
}

/// Logs counted vehicles (and optionally every lane result) via `tracing`.
pub struct LoggingObserver {
    lane_names: Vec<String>,
    verbose: bool,
}

impl LoggingObserver {
    /// Creates a quiet observer that names lanes by `lane_names`.
    pub fn new(lane_names: Vec<String>) -> Self {
        Self {
            lane_names,
            verbose: false,
        }
    }

    /// Also log lanes that did not count a vehicle this frame.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn name(&self, result: &EvaluationResult) -> &str {
        self.lane_names
            .get(result.lane.0)
            .map(String::as_str)
            .unwrap_or("?")
    }
}

impl FrameObserver for LoggingObserver {
    fn on_frame(&mut self, frame: &Frame, results: &[EvaluationResult]) {
        for result in results {
            if result.counted {
                tracing::info!(
                    lane = self.name(result),
                    frame = frame.sequence(),
                    count = result.count,
                    "Vehicle counted"
                );
            } else if self.verbose {
                tracing::info!(
                    lane = self.name(result),
                    frame = frame.sequence(),
                    count = result.count,
                    movement = result.movement,
                    activity = result.activity,
                    "Lane status"
                );
            }
        }
    }

    fn on_finished(&mut self, summary: &RunSummary) {
        for lane in &summary.lanes {
            tracing::info!(lane = %lane.name, count = lane.count, "Final count");
        }
    }
}

/// One recorded frame: source sequence number plus lane results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    /// Sequence number of the frame.
    pub sequence: u64,
    /// Lane results for that frame.
    pub results: Vec<EvaluationResult>,
}

/// Keeps every result in memory. Clones share the same record list.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    frames: Rc<RefCell<Vec<FrameRecord>>>,
    finished: Rc<RefCell<Option<RunSummary>>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded frames.
    pub fn frames(&self) -> Vec<FrameRecord> {
        self.frames.borrow().clone()
    }

    /// Returns the summary passed to `on_finished`, if the run ended.
    pub fn finished(&self) -> Option<RunSummary> {
        self.finished.borrow().clone()
    }
}

impl FrameObserver for RecordingObserver {
    fn on_frame(&mut self, frame: &Frame, results: &[EvaluationResult]) {
        self.frames.borrow_mut().push(FrameRecord {
            sequence: frame.sequence(),
            results: results.to_vec(),
        });
    }

    fn on_finished(&mut self, summary: &RunSummary) {
        *self.finished.borrow_mut() = Some(summary.clone());
    }
}
