//! Per-lane movement evaluation and edge-triggered counting.
//!
//! A lane counts one vehicle on each transition from "no movement" to
//! "movement". Sustained movement over many frames counts once.

use super::{ChangeMap, DetectionError, DetectionRegion};
use serde::Serialize;

/// Index of a lane within its engine, in registration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LaneId(pub usize);

impl std::fmt::Display for LaneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable counting state of a single lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneState {
    /// Cumulative vehicle count.
    pub count: u64,
    /// True while a movement event is in progress.
    pub active: bool,
}

/// Outcome of evaluating one lane against one change map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Lane that produced this result.
    pub lane: LaneId,
    /// Cumulative count after this evaluation.
    pub count: u64,
    /// Whether activity exceeded the threshold on this frame.
    pub movement: bool,
    /// True if this evaluation incremented the count.
    pub counted: bool,
    /// Summed change-map value inside the region.
    pub activity: u64,
    /// The lane's region, for overlay consumers.
    pub region: DetectionRegion,
}

/// Watches one region of the frame and counts movement events in it.
#[derive(Debug, Clone)]
pub struct LaneMonitor {
    id: LaneId,
    name: String,
    region: DetectionRegion,
    /// Activity must be strictly greater than this to count as movement.
    threshold: u64,
    state: LaneState,
}

impl LaneMonitor {
    /// Creates a monitor for `region`.
    ///
    /// `threshold` is in summed change-map units, i.e. 255 per changed
    /// pixel. Zero-area regions are rejected.
    pub fn new(region: DetectionRegion, threshold: u64) -> Result<Self, DetectionError> {
        region.validate()?;

        if threshold == 0 {
            tracing::warn!(
                region = %region,
                "Lane threshold is zero; any changed pixel will count as movement"
            );
        }

        Ok(Self {
            id: LaneId::default(),
            name: String::new(),
            region,
            threshold,
            state: LaneState::default(),
        })
    }

    /// Sets a human-readable name used in logs and reports.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub(crate) fn assign_id(&mut self, id: LaneId) {
        self.id = id;
        if self.name.is_empty() {
            self.name = format!("lane-{}", id.0);
        }
    }

    /// Evaluates the lane against a change map and applies the debounce rule.
    pub fn evaluate(&mut self, change_map: &ChangeMap) -> EvaluationResult {
        let activity = change_map.activity(&self.region);
        let movement = activity > self.threshold;
        let counted = movement && !self.state.active;

        if counted {
            self.state.count += 1;
            tracing::debug!(
                lane = %self.name,
                count = self.state.count,
                activity,
                "Movement detected, vehicle counted"
            );
        }
        self.state.active = movement;

        tracing::trace!(
            lane = %self.name,
            activity,
            threshold = self.threshold,
            movement,
            "Lane evaluated"
        );

        EvaluationResult {
            lane: self.id,
            count: self.state.count,
            movement,
            counted,
            activity,
            region: self.region,
        }
    }

    /// Returns the cumulative count.
    #[inline]
    pub fn count(&self) -> u64 {
        self.state.count
    }

    /// Returns the current lane state.
    #[inline]
    pub fn state(&self) -> LaneState {
        self.state
    }

    /// Returns the lane index.
    #[inline]
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Returns the lane name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the monitored region.
    #[inline]
    pub fn region(&self) -> DetectionRegion {
        self.region
    }

    /// Returns the movement threshold.
    #[inline]
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Clears the count and the active flag.
    pub(crate) fn reset(&mut self) {
        self.state = LaneState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;
    use proptest::prelude::*;

    /// Builds a 4x4 change map with the first `changed` pixels of the
    /// top-left 2x2 block marked as changed.
    fn map_with_changed(changed: usize) -> ChangeMap {
        let previous = Frame::filled(4, 4, 0, 0);
        let mut current = previous.clone();
        for (i, (x, y)) in [(0, 0), (1, 0), (0, 1), (1, 1)].into_iter().enumerate() {
            if i < changed {
                current = current.with_pixel(x, y, 200);
            }
        }
        ChangeMap::compute(&previous, &current, 30).unwrap()
    }

    fn corner_lane(threshold: u64) -> LaneMonitor {
        LaneMonitor::new(DetectionRegion::new(0, 0, 2, 2), threshold).unwrap()
    }

    #[test]
    fn test_zero_area_region_rejected() {
        let result = LaneMonitor::new(DetectionRegion::new(0, 0, 0, 0), 100);
        assert!(matches!(result, Err(DetectionError::InvalidRegion { .. })));
    }

    #[test]
    fn test_rising_edge_counts_once() {
        let mut lane = corner_lane(100);
        let moving = map_with_changed(1);
        let still = map_with_changed(0);

        let counts: Vec<u64> = [&moving, &moving, &moving, &still, &moving]
            .into_iter()
            .map(|m| lane.evaluate(m).count)
            .collect();

        assert_eq!(counts, vec![1, 1, 1, 1, 2]);
    }

    #[test]
    fn test_threshold_is_strict() {
        // One changed pixel sums to exactly 255
        let map = map_with_changed(1);

        let mut at = corner_lane(255);
        let result = at.evaluate(&map);
        assert!(!result.movement);
        assert_eq!(result.count, 0);

        let mut below = corner_lane(254);
        let result = below.evaluate(&map);
        assert!(result.movement);
        assert!(result.counted);
        assert_eq!(result.count, 1);
    }

    #[test]
    fn test_fall_does_not_count() {
        let mut lane = corner_lane(100);
        lane.evaluate(&map_with_changed(2));
        assert!(lane.state().active);

        let result = lane.evaluate(&map_with_changed(0));
        assert!(!result.movement);
        assert!(!result.counted);
        assert!(!lane.state().active);
        assert_eq!(lane.count(), 1);
    }

    #[test]
    fn test_result_carries_region_and_activity() {
        let mut lane = corner_lane(100).with_name("north");
        let result = lane.evaluate(&map_with_changed(3));

        assert_eq!(result.activity, 3 * 255);
        assert_eq!(result.region, DetectionRegion::new(0, 0, 2, 2));
        assert_eq!(lane.name(), "north");
    }

    #[test]
    fn test_zero_threshold_counts_any_change() {
        let mut lane = corner_lane(0);
        assert!(!lane.evaluate(&map_with_changed(0)).movement);
        assert!(lane.evaluate(&map_with_changed(1)).movement);
    }

    proptest! {
        #[test]
        fn prop_count_steps_by_at_most_one(changes in proptest::collection::vec(0usize..=4, 1..64)) {
            let maps: Vec<ChangeMap> = (0..=4).map(map_with_changed).collect();
            let mut lane = corner_lane(300);
            let mut last = 0u64;

            for c in changes {
                let result = lane.evaluate(&maps[c]);
                prop_assert!(result.count >= last);
                prop_assert!(result.count - last <= 1);
                prop_assert_eq!(result.counted, result.count == last + 1);
                last = result.count;
            }
        }
    }
}
