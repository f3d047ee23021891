//! Metrics collection and registry.

use crate::capture::Frame;
use crate::detection::EvaluationResult;
use crate::engine::{EngineState, FrameObserver, RunSummary};
use prometheus::{Encoder, IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Metric registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for lane counting.
///
/// Cloning is cheap and clones share the same underlying metrics, so one
/// clone can feed an HTTP exporter while another is updated by the engine.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    // Engine metrics
    frames_total: IntCounter,
    engine_running: IntGauge,

    // Per-lane metrics
    vehicle_count: IntGaugeVec,
    movement_active: IntGaugeVec,
    activity: IntGaugeVec,
}

impl MetricsRegistry {
    /// Creates a new registry with all counter metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_total = IntCounter::new(
            "lane_counter_frames_evaluated_total",
            "Frames evaluated against every lane",
        )?;
        let engine_running = IntGauge::new(
            "lane_counter_engine_running",
            "Engine state (1=running, 0=uninitialized or drained)",
        )?;

        let vehicle_count = IntGaugeVec::new(
            Opts::new(
                "lane_counter_vehicles",
                "Cumulative vehicle count per lane",
            ),
            &["lane"],
        )?;
        let movement_active = IntGaugeVec::new(
            Opts::new(
                "lane_counter_movement_active",
                "Whether the lane currently sees movement (1=yes)",
            ),
            &["lane"],
        )?;
        let activity = IntGaugeVec::new(
            Opts::new(
                "lane_counter_activity",
                "Summed change-map activity of the last evaluated frame",
            ),
            &["lane"],
        )?;

        registry.register(Box::new(frames_total.clone()))?;
        registry.register(Box::new(engine_running.clone()))?;
        registry.register(Box::new(vehicle_count.clone()))?;
        registry.register(Box::new(movement_active.clone()))?;
        registry.register(Box::new(activity.clone()))?;

        Ok(Self {
            registry,
            frames_total,
            engine_running,
            vehicle_count,
            movement_active,
            activity,
        })
    }

    /// Records one frame's lane results.
    pub fn record_frame(&self, lane_names: &[String], results: &[EvaluationResult]) {
        self.frames_total.inc();
        self.engine_running.set(1);

        for result in results {
            let label = lane_label(lane_names, result);
            self.vehicle_count
                .with_label_values(&[label.as_str()])
                .set(saturating_i64(result.count));
            self.movement_active
                .with_label_values(&[label.as_str()])
                .set(if result.movement { 1 } else { 0 });
            self.activity
                .with_label_values(&[label.as_str()])
                .set(saturating_i64(result.activity));
        }
    }

    /// Records the final state of a run.
    pub fn record_summary(&self, summary: &RunSummary) {
        self.engine_running
            .set(if summary.state == EngineState::Running { 1 } else { 0 });
        for lane in &summary.lanes {
            self.vehicle_count
                .with_label_values(&[lane.name.as_str()])
                .set(saturating_i64(lane.count));
            self.movement_active
                .with_label_values(&[lane.name.as_str()])
                .set(0);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn lane_label(lane_names: &[String], result: &EvaluationResult) -> String {
    lane_names
        .get(result.lane.0)
        .cloned()
        .unwrap_or_else(|| format!("lane-{}", result.lane.0))
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Engine observer that feeds a [`MetricsRegistry`].
pub struct MetricsObserver {
    registry: MetricsRegistry,
    lane_names: Vec<String>,
}

impl MetricsObserver {
    /// Feeds `registry`, labelling lanes by `lane_names`.
    pub fn new(registry: MetricsRegistry, lane_names: Vec<String>) -> Self {
        Self {
            registry,
            lane_names,
        }
    }
}

impl FrameObserver for MetricsObserver {
    fn on_frame(&mut self, _frame: &Frame, results: &[EvaluationResult]) {
        self.registry.record_frame(&self.lane_names, results);
    }

    fn on_finished(&mut self, summary: &RunSummary) {
        self.registry.record_summary(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ScriptedSource;
    use crate::detection::{DetectionRegion, LaneMonitor};
    use crate::engine::{CancellationFlag, MotionCountingEngine};

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        // Unlabelled metrics are always present
        assert!(output.contains("lane_counter_frames_evaluated_total"));
        assert!(output.contains("lane_counter_engine_running"));
    }

    #[test]
    fn test_observer_updates_lane_gauges() {
        let registry = MetricsRegistry::new().unwrap();

        let mut engine = MotionCountingEngine::new(4, 4, 30);
        engine
            .register_lane(
                LaneMonitor::new(DetectionRegion::new(0, 0, 2, 2), 100)
                    .unwrap()
                    .with_name("west"),
            )
            .unwrap();
        let names = engine.lane_names();
        engine.add_observer(Box::new(MetricsObserver::new(registry.clone(), names)));

        let base = Frame::filled(4, 4, 0, 0);
        let moved = base.with_pixel(0, 0, 200);
        let mut source = ScriptedSource::new(vec![base, moved]);
        engine.run(&mut source, &CancellationFlag::new()).unwrap();

        let output = registry.encode().unwrap();
        assert!(output.contains("lane_counter_frames_evaluated_total 1"));
        assert!(output.contains("lane_counter_vehicles{lane=\"west\"} 1"));
        assert!(output.contains("lane_counter_movement_active{lane=\"west\"} 0"));
        assert!(output.contains("lane_counter_engine_running 0"));
    }
}
