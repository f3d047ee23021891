//! Frame loop and engine state machine.

use super::{CancellationFlag, EngineConfig, EngineError, FrameObserver};
use crate::capture::{Frame, FrameSource};
use crate::detection::{
    DetectionError, DetectionRegion, EvaluationResult, FrameDifferencer, LaneId, LaneMonitor,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of an engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// No frame seen yet; lanes may still be registered.
    Uninitialized,
    /// At least one frame seen; every new frame is evaluated.
    Running,
    /// Finished. Counts are final.
    Drained,
}

/// Why an engine drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The frame source ended.
    SourceExhausted,
    /// The cancellation flag was set.
    Cancelled,
    /// A fatal error halted processing.
    Failed,
}

/// Result of handing one frame to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// First frame stored; nothing to compare against yet.
    Primed,
    /// One result per lane, in registration order.
    Evaluated(Vec<EvaluationResult>),
    /// The engine is drained; nothing was processed.
    Exhausted,
}

/// Final state of one lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneSummary {
    /// Registration index.
    pub lane: LaneId,
    /// Display name.
    pub name: String,
    /// Monitored rectangle.
    pub region: DetectionRegion,
    /// Activity the lane must exceed.
    pub threshold: u64,
    /// Vehicles counted so far.
    pub count: u64,
}

/// Snapshot of a run, serializable for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Engine state at the time of the snapshot.
    pub state: EngineState,
    /// Set once the engine has drained.
    pub stop_reason: Option<StopReason>,
    /// When the first frame was stored.
    pub started_at: Option<DateTime<Utc>>,
    /// When the engine drained.
    pub finished_at: Option<DateTime<Utc>>,
    /// Frames accepted, including the priming frame.
    pub frames_processed: u64,
    /// Per-lane results in registration order.
    pub lanes: Vec<LaneSummary>,
}

impl RunSummary {
    /// Total vehicles over all lanes.
    pub fn total_count(&self) -> u64 {
        self.lanes.iter().map(|l| l.count).sum()
    }
}

/// Counts movement events per lane over a stream of frames.
///
/// Frames are processed strictly in arrival order and lanes strictly in
/// registration order. Each lane owns its own state; nothing is shared
/// between lanes.
pub struct MotionCountingEngine {
    frame_width: u32,
    frame_height: u32,
    differencer: FrameDifferencer,
    lanes: Vec<LaneMonitor>,
    observers: Vec<Box<dyn FrameObserver>>,
    state: EngineState,
    stop_reason: Option<StopReason>,
    frames_processed: u64,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl MotionCountingEngine {
    /// Creates an engine with no lanes for frames of the given size.
    pub fn new(frame_width: u32, frame_height: u32, intensity_delta: u8) -> Self {
        Self {
            frame_width,
            frame_height,
            differencer: FrameDifferencer::new(intensity_delta),
            lanes: Vec::new(),
            observers: Vec::new(),
            state: EngineState::Uninitialized,
            stop_reason: None,
            frames_processed: 0,
            started_at: None,
            finished_at: None,
        }
    }

    /// Builds an engine and registers every configured lane.
    ///
    /// Fails on the first invalid lane; no engine is returned in that case.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut engine = Self::new(
            config.frame_width,
            config.frame_height,
            config.detection.intensity_delta,
        );

        for lane in &config.lanes {
            let mut monitor =
                LaneMonitor::new(lane.region(), lane.effective_threshold(&config.detection))?;
            if let Some(name) = &lane.name {
                monitor = monitor.with_name(name.clone());
            }
            engine.register_lane(monitor)?;
        }

        if engine.lanes.is_empty() {
            tracing::warn!("Engine has no lanes; nothing will be counted");
        }

        tracing::info!(
            width = config.frame_width,
            height = config.frame_height,
            lanes = engine.lanes.len(),
            intensity_delta = config.detection.intensity_delta,
            "Motion counting engine created"
        );

        Ok(engine)
    }

    /// Registers a lane. Only allowed before the first frame.
    pub fn register_lane(&mut self, mut monitor: LaneMonitor) -> Result<LaneId, EngineError> {
        if self.state != EngineState::Uninitialized {
            return Err(EngineError::RegistrationClosed);
        }
        monitor
            .region()
            .validate_within(self.frame_width, self.frame_height)?;

        let id = LaneId(self.lanes.len());
        monitor.assign_id(id);
        tracing::info!(
            lane = %monitor.name(),
            region = %monitor.region(),
            threshold = monitor.threshold(),
            "Lane registered"
        );
        self.lanes.push(monitor);
        Ok(id)
    }

    /// Shorthand for registering an unnamed lane.
    pub fn add_lane(
        &mut self,
        region: DetectionRegion,
        threshold: u64,
    ) -> Result<LaneId, EngineError> {
        let monitor = LaneMonitor::new(region, threshold)?;
        self.register_lane(monitor)
    }

    /// Adds a consumer of per-frame results.
    pub fn add_observer(&mut self, observer: Box<dyn FrameObserver>) {
        self.observers.push(observer);
    }

    /// Processes one frame.
    ///
    /// A frame whose size differs from the engine's frame size, or whose
    /// buffer does not match its size, halts the engine with an error and
    /// leaves every count untouched.
    pub fn process_frame(&mut self, frame: Frame) -> Result<FrameOutcome, EngineError> {
        if self.state == EngineState::Drained {
            return Ok(FrameOutcome::Exhausted);
        }

        if let Err(e) = self.check_frame(&frame) {
            return Err(self.halt(e.into()));
        }

        let map = match self.differencer.difference(frame) {
            Ok(Some(map)) => map,
            Ok(None) => {
                self.frames_processed += 1;
                self.state = EngineState::Running;
                self.started_at = Some(Utc::now());
                tracing::info!(lanes = self.lanes.len(), "First frame stored, engine running");
                return Ok(FrameOutcome::Primed);
            }
            Err(e) => return Err(self.halt(e.into())),
        };

        let results: Vec<EvaluationResult> =
            self.lanes.iter_mut().map(|lane| lane.evaluate(&map)).collect();
        self.frames_processed += 1;

        if let Some(frame) = self.differencer.previous() {
            for observer in &mut self.observers {
                observer.on_frame(frame, &results);
            }
        }

        Ok(FrameOutcome::Evaluated(results))
    }

    /// Pulls one frame from `source` and processes it.
    ///
    /// End of stream drains the engine and returns [`FrameOutcome::Exhausted`].
    /// Source errors are not retried; they halt the engine.
    pub fn process_next<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<FrameOutcome, EngineError> {
        if self.state == EngineState::Drained {
            return Ok(FrameOutcome::Exhausted);
        }

        match source.next_frame() {
            Ok(Some(frame)) => self.process_frame(frame),
            Ok(None) => {
                self.stop(StopReason::SourceExhausted);
                Ok(FrameOutcome::Exhausted)
            }
            Err(e) => Err(self.halt(e.into())),
        }
    }

    /// Runs until the source ends, `cancel` is set, or an error occurs.
    pub fn run<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
        cancel: &CancellationFlag,
    ) -> Result<RunSummary, EngineError> {
        while self.state != EngineState::Drained {
            if cancel.is_cancelled() {
                tracing::warn!(frames = self.frames_processed, "Run cancelled");
                self.stop(StopReason::Cancelled);
                break;
            }
            self.process_next(source)?;
        }
        Ok(self.summary())
    }

    /// Drains the engine. Counts become final. No-op if already drained.
    pub fn stop(&mut self, reason: StopReason) {
        if self.state == EngineState::Drained {
            return;
        }
        self.state = EngineState::Drained;
        self.stop_reason = Some(reason);
        self.finished_at = Some(Utc::now());

        let summary = self.summary();
        tracing::info!(
            reason = ?reason,
            frames = summary.frames_processed,
            total = summary.total_count(),
            "Engine drained"
        );
        for observer in &mut self.observers {
            observer.on_finished(&summary);
        }
    }

    /// Clears every lane count and the stored frame, returning to
    /// [`EngineState::Uninitialized`]. Lanes and observers are kept.
    pub fn reset(&mut self) {
        self.differencer.reset();
        for lane in &mut self.lanes {
            lane.reset();
        }
        self.state = EngineState::Uninitialized;
        self.stop_reason = None;
        self.frames_processed = 0;
        self.started_at = None;
        self.finished_at = None;
        tracing::info!("Engine reset");
    }

    fn check_frame(&self, frame: &Frame) -> Result<(), DetectionError> {
        let expected = (self.frame_width, self.frame_height);
        if frame.dimensions() != expected {
            return Err(DetectionError::mismatch(expected, frame.dimensions()));
        }
        if !frame.is_valid() {
            return Err(DetectionError::MalformedFrame {
                sequence: frame.sequence(),
                width: frame.width(),
                height: frame.height(),
            });
        }
        Ok(())
    }

    fn halt(&mut self, error: EngineError) -> EngineError {
        tracing::error!(error = %error, "Fatal error, halting engine");
        self.stop(StopReason::Failed);
        error
    }

    /// Returns a snapshot of the run so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            state: self.state,
            stop_reason: self.stop_reason,
            started_at: self.started_at,
            finished_at: self.finished_at,
            frames_processed: self.frames_processed,
            lanes: self
                .lanes
                .iter()
                .map(|lane| LaneSummary {
                    lane: lane.id(),
                    name: lane.name().to_string(),
                    region: lane.region(),
                    threshold: lane.threshold(),
                    count: lane.count(),
                })
                .collect(),
        }
    }

    /// Current count of every lane, in registration order.
    pub fn counts(&self) -> Vec<u64> {
        self.lanes.iter().map(LaneMonitor::count).collect()
    }

    /// Returns the lane with the given id.
    pub fn lane(&self, id: LaneId) -> Option<&LaneMonitor> {
        self.lanes.get(id.0)
    }

    /// Returns all lanes in registration order.
    pub fn lanes(&self) -> &[LaneMonitor] {
        &self.lanes
    }

    /// Returns the lane names in registration order.
    pub fn lane_names(&self) -> Vec<String> {
        self.lanes.iter().map(|l| l.name().to_string()).collect()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Why the engine drained, if it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Frames accepted so far, including the priming frame.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Returns `(width, height)` of the frames this engine accepts.
    pub fn frame_dimensions(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }
}
