//! Lane Motion Counter Library
//!
//! Counts vehicles passing through fixed rectangular regions of a video
//! stream by differencing consecutive grayscale frames.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → detection (change map → lanes) → engine → observers
//!                                                 ↓
//!                                      logging / metrics / reports
//! ```
//!
//! # Design Principles
//!
//! - **Edge-triggered counting**: a lane counts once per rising edge of
//!   its movement signal, so a slow vehicle spanning many frames counts once
//! - **Explicit configuration**: one config value is passed into engine
//!   construction; nothing reads global state
//! - **Fail loudly**: resolution changes and bad regions are errors, not
//!   silently skipped frames
//! - **Movement is the proxy**: no classification or tracking
//!
//! # Example
//!
//! ```no_run
//! use lane_motion_counter::{
//!     capture::{FileConfig, SyntheticSource},
//!     engine::{CancellationFlag, EngineConfig, LoggingObserver, MotionCountingEngine},
//! };
//!
//! let file = FileConfig::default();
//! let config = EngineConfig::try_from(&file).unwrap();
//! let mut engine = MotionCountingEngine::from_config(&config).unwrap();
//! let names = engine.lane_names();
//! engine.add_observer(Box::new(LoggingObserver::new(names)));
//!
//! let regions: Vec<_> = file.lanes.iter().map(|l| l.region()).collect();
//! let mut source =
//!     SyntheticSource::for_regions(config.frame_width, config.frame_height, &regions, 300);
//!
//! let summary = engine.run(&mut source, &CancellationFlag::new()).unwrap();
//! println!("{} vehicles", summary.total_count());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod detection;
pub mod engine;
pub mod metrics;

// Re-export commonly used types at crate root
pub use capture::{FileConfig, Frame, FrameSource, SourceError};
pub use detection::{ChangeMap, DetectionError, DetectionRegion, EvaluationResult, LaneMonitor};
pub use engine::{CancellationFlag, EngineConfig, EngineError, MotionCountingEngine, RunSummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
