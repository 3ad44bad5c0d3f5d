use std::collections::HashSet;
use std::path::Path;

use time::PrimitiveDateTime;

use crate::config::{PressureCalibration, RepairDefaults};
use crate::models::GaugeReading;

/// Counts from one `save_readings` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub saved: usize,
    pub skipped: usize,
}

/// Angle of one stored reading, as listed by `readings_above`
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAngle {
    pub image_name: String,
    pub angle: f64,
    pub timestamp: String,
}

pub trait ReadingRepository {
    /// Validate and upsert readings by image file name, recomputing pressures with `calibration`
    fn save_readings(
        &self,
        readings: &[GaugeReading],
        calibration: &PressureCalibration,
    ) -> impl Future<Output = anyhow::Result<SaveSummary>>;

    fn processed_image_names(&self) -> impl Future<Output = anyhow::Result<HashSet<String>>>;

    /// Stored readings at or after `since`, oldest first.
    ///
    /// Image paths are rebuilt under `image_dir`. Unusable geometry is replaced by
    /// `repair` values and missing pressures are recomputed with `calibration`.
    fn load_readings(
        &self,
        since: Option<PrimitiveDateTime>,
        image_dir: &Path,
        repair: &RepairDefaults,
        calibration: &PressureCalibration,
    ) -> impl Future<Output = anyhow::Result<Vec<GaugeReading>>>;

    /// Stored readings with an angle above `threshold`, largest angle first
    fn readings_above(&self, threshold: f64) -> impl Future<Output = anyhow::Result<Vec<StoredAngle>>>;

    fn result_count(&self) -> impl Future<Output = anyhow::Result<u64>>;
}
