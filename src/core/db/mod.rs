mod failures;
mod readings;
mod state;
mod util;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use sqlx::{Row, sqlite::SqliteRow};
use time::PrimitiveDateTime;
use tracing::{info, warn};

use crate::config::{PressureCalibration, RepairDefaults};
use crate::models::{GaugeReading, Point};
use state::DbState;

pub use failures::FailureRepository;
pub use readings::{ReadingRepository, SaveSummary, StoredAngle};
pub use util::{TIMESTAMP_FORMAT, format_timestamp, parse_timestamp};

/// SQLite store for readings and detection failures
#[derive(Debug, Clone)]
pub struct GaugeDb {
    state: Arc<DbState>,
}

impl GaugeDb {
    /// Open (creating if missing) the database at `db_file`.
    ///
    /// An existing file is copied to `<db_file>.bak` before it is opened.
    pub async fn open<P: AsRef<Path>>(db_file: P) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(DbState::open(db_file).await?),
        })
    }

    pub fn db_file(&self) -> &Path {
        self.state.db_file()
    }

    /// Where `open` copies the previous database file
    pub fn backup_file(&self) -> PathBuf {
        state::backup_path(self.db_file())
    }

    pub async fn close(&self) {
        self.state.close().await;
    }
}

impl ReadingRepository for GaugeDb {
    async fn save_readings(
        &self,
        readings: &[GaugeReading],
        calibration: &PressureCalibration,
    ) -> anyhow::Result<SaveSummary> {
        let mut summary = SaveSummary::default();
        let mut tx = self.state.pool.begin().await?;

        for reading in readings {
            let name = reading.image_name();
            let center = reading.center();
            if !reading.angle().is_finite() {
                warn!("Invalid angle for {} - skipping", name);
                summary.skipped += 1;
                continue;
            }
            if center.x <= 0 || center.y <= 0 || reading.radius() <= 0 {
                warn!("Invalid geometry values for {} - skipping", name);
                summary.skipped += 1;
                continue;
            }

            let timestamp = format_timestamp(reading.timestamp())?;
            sqlx::query(
                r#"INSERT OR REPLACE INTO gauge_results
                (image_name, angle, center_x, center_y, radius, timestamp, pressure_psi, pressure_bar)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
            )
            .bind(name)
            .bind(reading.angle())
            .bind(i64::from(center.x))
            .bind(i64::from(center.y))
            .bind(i64::from(reading.radius()))
            .bind(timestamp)
            .bind(calibration.psi(reading.angle()))
            .bind(calibration.bar(reading.angle()))
            .execute(&mut *tx)
            .await?;
            summary.saved += 1;
        }

        tx.commit().await?;
        info!(
            "Saved {} valid results to database ({} skipped due to validation errors)",
            summary.saved, summary.skipped
        );
        Ok(summary)
    }

    async fn processed_image_names(&self) -> anyhow::Result<HashSet<String>> {
        let rows = sqlx::query("SELECT image_name FROM gauge_results")
            .fetch_all(&self.state.pool)
            .await?;
        let names = rows
            .iter()
            .map(|row| row.try_get::<String, _>("image_name"))
            .collect::<Result<_, _>>()?;
        Ok(names)
    }

    async fn load_readings(
        &self,
        since: Option<PrimitiveDateTime>,
        image_dir: &Path,
        repair: &RepairDefaults,
        calibration: &PressureCalibration,
    ) -> anyhow::Result<Vec<GaugeReading>> {
        let rows = match since {
            Some(since) => {
                sqlx::query("SELECT * FROM gauge_results WHERE timestamp >= $1 ORDER BY timestamp")
                    .bind(format_timestamp(since)?)
                    .fetch_all(&self.state.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM gauge_results ORDER BY timestamp")
                    .fetch_all(&self.state.pool)
                    .await?
            }
        };

        let mut readings = Vec::with_capacity(rows.len());
        let mut skipped = 0usize;
        for row in &rows {
            match reading_from_row(row, image_dir, repair, calibration) {
                Ok(reading) => readings.push(reading),
                Err(e) => {
                    warn!("Could not load stored result: {}", e);
                    skipped += 1;
                }
            }
        }
        readings.sort_by_key(|r| r.timestamp());

        info!(
            "Loaded {} results ({} skipped due to data issues)",
            readings.len(),
            skipped
        );
        Ok(readings)
    }

    async fn readings_above(&self, threshold: f64) -> anyhow::Result<Vec<StoredAngle>> {
        let rows = sqlx::query(
            "SELECT image_name, angle, timestamp FROM gauge_results WHERE angle > $1 ORDER BY angle DESC",
        )
        .bind(threshold)
        .fetch_all(&self.state.pool)
        .await?;

        rows.iter()
            .map(|row| -> anyhow::Result<StoredAngle> {
                Ok(StoredAngle {
                    image_name: row.try_get("image_name")?,
                    angle: row.try_get("angle")?,
                    timestamp: row.try_get::<Option<String>, _>("timestamp")?.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn result_count(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM gauge_results")
            .fetch_one(&self.state.pool)
            .await?
            .try_get("count")?;
        Ok(count as u64)
    }
}

impl FailureRepository for GaugeDb {
    async fn record_failures(&self, image_names: &[String], at: PrimitiveDateTime) -> anyhow::Result<()> {
        let timestamp = format_timestamp(at)?;
        let mut tx = self.state.pool.begin().await?;
        for name in image_names {
            sqlx::query("INSERT OR REPLACE INTO detection_failures (image_name, timestamp) VALUES ($1, $2)")
                .bind(name)
                .bind(&timestamp)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn failed_image_names(&self) -> anyhow::Result<HashSet<String>> {
        let rows = sqlx::query("SELECT image_name FROM detection_failures")
            .fetch_all(&self.state.pool)
            .await?;
        let names = rows
            .iter()
            .map(|row| row.try_get::<String, _>("image_name"))
            .collect::<Result<_, _>>()?;
        Ok(names)
    }

    async fn clear_failure(&self, image_name: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM detection_failures WHERE image_name = $1")
            .bind(image_name)
            .execute(&self.state.pool)
            .await?;
        Ok(())
    }

    async fn mark_as_failures(&self, image_names: &[String], at: PrimitiveDateTime) -> anyhow::Result<()> {
        let timestamp = format_timestamp(at)?;
        let mut tx = self.state.pool.begin().await?;
        for name in image_names {
            sqlx::query("DELETE FROM gauge_results WHERE image_name = $1")
                .bind(name)
                .execute(&mut *tx)
                .await?;
            sqlx::query("INSERT OR REPLACE INTO detection_failures (image_name, timestamp) VALUES ($1, $2)")
                .bind(name)
                .bind(&timestamp)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        info!("Marked {} records as detection failures", image_names.len());
        Ok(())
    }
}

/// Rebuild a reading from a stored row, repairing what can be repaired
fn reading_from_row(
    row: &SqliteRow,
    image_dir: &Path,
    repair: &RepairDefaults,
    calibration: &PressureCalibration,
) -> anyhow::Result<GaugeReading> {
    let name: String = row.try_get("image_name")?;
    let timestamp_text: String = row.try_get("timestamp")?;
    let timestamp = parse_timestamp(&timestamp_text)
        .map_err(|e| anyhow::anyhow!("{}: bad timestamp '{}': {}", name, timestamp_text, e))?;
    let angle = match row.try_get::<Option<f64>, _>("angle") {
        Ok(Some(angle)) if angle.is_finite() => angle,
        Ok(_) => {
            warn!("Using default angle for {}: value missing", name);
            repair.default_angle
        }
        Err(e) => anyhow::bail!("{}: invalid angle value: {}", name, e),
    };

    let geometry = |column: &str, default: i32| -> i32 {
        match row.try_get::<i64, _>(column) {
            Ok(value) if value > 0 => value as i32,
            Ok(value) => {
                warn!("Using default for {}: {} value {} out of range", name, column, value);
                default
            }
            Err(e) => {
                warn!("Using default for {}: cannot interpret {}: {}", name, column, e);
                default
            }
        }
    };
    let center = Point::new(
        geometry("center_x", repair.default_center_x),
        geometry("center_y", repair.default_center_y),
    );
    let radius = geometry("radius", repair.default_radius);

    let stored = |column: &str| row.try_get::<Option<f64>, _>(column).ok().flatten();
    let psi = stored("pressure_psi").unwrap_or_else(|| calibration.psi(angle));
    let bar = stored("pressure_bar").unwrap_or_else(|| calibration.bar(angle));

    let path = image_dir.join(&name);
    Ok(GaugeReading::new(angle, center, radius, path.to_string_lossy(), timestamp)
        .with_pressure(Some(psi), Some(bar)))
}
