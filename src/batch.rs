use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use tracing::{info, warn};

use crate::config::DetectionConfig;
use crate::detection::GaugeDetector;
use crate::error::DetectionFailure;
use crate::history::History;
use crate::models::GaugeReading;

/// Result of one image in a batch
#[derive(Debug)]
pub enum BatchOutcome {
    Detected(GaugeReading),
    Skipped {
        path: PathBuf,
        failure: DetectionFailure,
    },
}

/// Everything a batch produced
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Successful readings, sorted by timestamp
    pub readings: Vec<GaugeReading>,
    /// Images that produced no reading, in input order
    pub failures: Vec<(PathBuf, DetectionFailure)>,
}

impl BatchReport {
    /// Append the readings, already in timestamp order, to `history`
    pub fn append_to(&self, history: &mut History) {
        history.extend(self.readings.iter().cloned());
    }

    /// File names of the failed images
    pub fn failed_names(&self) -> Vec<String> {
        self.failures.iter().map(|(path, _)| file_name(path)).collect()
    }
}

/// Runs the detector over many images on worker threads.
///
/// Workers claim images from a shared counter and send outcomes over a channel
/// to a single collector, so no reading is ever shared between threads. A
/// failing image is recorded and never stops the batch.
pub struct BatchProcessor {
    detector: GaugeDetector,
    config: DetectionConfig,
    jobs: usize,
}

impl BatchProcessor {
    pub fn new(detector: GaugeDetector, config: DetectionConfig) -> Self {
        Self {
            detector,
            config,
            jobs: 1,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn run(&self, paths: &[PathBuf]) -> BatchReport {
        let next = AtomicUsize::new(0);
        let workers = self.jobs.min(paths.len()).max(1);
        let (sender, receiver) = mpsc::channel::<(usize, BatchOutcome)>();

        let mut outcomes: Vec<(usize, BatchOutcome)> = Vec::with_capacity(paths.len());
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let sender = sender.clone();
                let next = &next;
                scope.spawn(move || {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(path) = paths.get(index) else { break };
                        let outcome = self.process_one(index, paths.len(), path);
                        if sender.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(sender);
            outcomes.extend(receiver.iter());
        });

        outcomes.sort_by_key(|(index, _)| *index);

        let mut report = BatchReport::default();
        for (_, outcome) in outcomes {
            match outcome {
                BatchOutcome::Detected(reading) => report.readings.push(reading),
                BatchOutcome::Skipped { path, failure } => report.failures.push((path, failure)),
            }
        }
        report.readings.sort_by_key(|r| r.timestamp());
        report
    }

    fn process_one(&self, index: usize, total: usize, path: &Path) -> BatchOutcome {
        match self.detector.detect_path(path, &self.config) {
            Ok(reading) => {
                info!(
                    "Processed {}/{}: {} -> {:.1}°",
                    index + 1,
                    total,
                    reading.image_name(),
                    reading.angle()
                );
                BatchOutcome::Detected(reading)
            }
            Err(failure) => {
                warn!("Skipped {}/{}: {}: {}", index + 1, total, path.display(), failure);
                BatchOutcome::Skipped {
                    path: path.to_path_buf(),
                    failure,
                }
            }
        }
    }
}

/// Images worth processing this run.
///
/// Already processed images are skipped, and so are known failures unless
/// `retry_failures` is set. `force` processes everything.
pub fn select_images(
    all: &[PathBuf],
    processed: &HashSet<String>,
    failed: &HashSet<String>,
    force: bool,
    retry_failures: bool,
) -> Vec<PathBuf> {
    if force {
        return all.to_vec();
    }
    all.iter()
        .filter(|path| {
            let name = file_name(path);
            !processed.contains(&name) && (retry_failures || !failed.contains(&name))
        })
        .cloned()
        .collect()
}

/// Files in `dir` whose names match `pattern`, sorted by path
pub fn list_images(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read image directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && wildcard_match(pattern, &file_name(&path)) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Shell-style match supporting `*` and `?`
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star_p, star_n)) => {
                    p = star_p + 1;
                    n = star_n + 1;
                    backtrack = Some((star_p, star_n + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
