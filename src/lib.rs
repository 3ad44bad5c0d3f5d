pub mod batch;
pub mod config;
pub mod core;
pub mod debug;
pub mod detection;
pub mod error;
pub mod history;
pub mod models;
pub mod pressure;
pub mod timestamp;

pub use batch::{BatchOutcome, BatchProcessor, BatchReport};
pub use config::{DetectionConfig, GaugeConfig, PressureCalibration};
pub use crate::core::db::{FailureRepository, GaugeDb, ReadingRepository};
pub use detection::{GaugeDetector, detect};
pub use error::DetectionFailure;
pub use history::{AveragePeriod, History, RelativeIndex};
pub use models::{Circle, GaugeReading, LineCandidate, LineSegment, Point};
pub use pressure::{angle_to_bar, angle_to_psi};
