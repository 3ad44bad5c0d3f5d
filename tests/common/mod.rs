mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from gaugewatch for tests
pub use gaugewatch::config::{
    CircleConfig, DetectionConfig, GaugeConfig, LineConfig, PressureCalibration, RepairDefaults,
};
pub use gaugewatch::core::db::{FailureRepository, GaugeDb, ReadingRepository};
pub use gaugewatch::error::DetectionFailure;
pub use gaugewatch::history::{AveragePeriod, History, RelativeIndex};
pub use gaugewatch::models::{Circle, GaugeReading, LineCandidate, LineSegment, Point};
