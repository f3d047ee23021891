//! Prometheus metrics exporter for lane counting.
//!
//! # Metrics Exposed
//!
//! - `lane_counter_frames_evaluated_total` - Frames evaluated against every lane
//! - `lane_counter_engine_running` - 1 while the engine is running
//! - `lane_counter_vehicles{lane}` - Cumulative vehicle count per lane
//! - `lane_counter_movement_active{lane}` - 1 while a lane sees movement
//! - `lane_counter_activity{lane}` - Change-map activity of the last frame
//!
//! # Example
//!
//! ```no_run
//! use lane_motion_counter::engine::{EngineConfig, MotionCountingEngine};
//! use lane_motion_counter::metrics::{MetricsObserver, MetricsRegistry};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! let mut engine = MotionCountingEngine::from_config(&EngineConfig::new(640, 480)).unwrap();
//! let names = engine.lane_names();
//! engine.add_observer(Box::new(MetricsObserver::new(registry.clone(), names)));
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsObserver, MetricsRegistry};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
