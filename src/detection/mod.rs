pub mod preprocessing;
pub mod circles;
pub mod lines;
pub mod filter;
pub mod clustering;
pub mod direction;
pub mod vision;

use image::{DynamicImage, GrayImage, ImageReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::DetectionConfig;
use crate::debug::{self as artifacts, DebugSink};
use crate::error::DetectionFailure;
use crate::models::{Circle, GaugeReading, LineCandidate, LineSegment};
use crate::timestamp::{Clock, SystemClock, resolve_timestamp};

use circles::CircleSearch;
use direction::NeedleDirection;
use lines::SegmentSearch;
use vision::{ImageprocVision, Vision};

/// Reads the needle angle of one gauge per image.
///
/// The detector holds only its collaborators; every call gets its parameters
/// explicitly, so one detector can serve parallel runs with different settings.
#[derive(Clone)]
pub struct GaugeDetector {
    vision: Arc<dyn Vision>,
    clock: Arc<dyn Clock>,
    debug: Option<Arc<dyn DebugSink>>,
}

impl GaugeDetector {
    pub fn new() -> Self {
        Self {
            vision: Arc::new(ImageprocVision),
            clock: Arc::new(SystemClock),
            debug: None,
        }
    }

    pub fn with_vision(mut self, vision: Arc<dyn Vision>) -> Self {
        self.vision = vision;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Emit intermediate images to `sink`
    pub fn with_debug(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug = Some(sink);
        self
    }

    /// Decode the image at `path` and read it
    pub fn detect_path(&self, path: &Path, config: &DetectionConfig) -> Result<GaugeReading, DetectionFailure> {
        let unreadable = |reason: String| DetectionFailure::ImageUnreadable {
            path: path.to_path_buf(),
            reason,
        };
        let img = ImageReader::open(path)
            .map_err(|e| unreadable(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| unreadable(e.to_string()))?
            .decode()
            .map_err(|e| unreadable(e.to_string()))?;

        self.detect(&img, &path.to_string_lossy(), config)
    }

    /// Run the full pipeline on a decoded image.
    ///
    /// `identifier` names the image in the reading and in debug artifacts; a
    /// `yymmdd_hhmm` token in its file name becomes the reading's timestamp.
    pub fn detect(
        &self,
        img: &DynamicImage,
        identifier: &str,
        config: &DetectionConfig,
    ) -> Result<GaugeReading, DetectionFailure> {
        let gray = preprocessing::to_grayscale(img);

        let circle = self.locate_gauge(&gray, config)?;
        debug!(
            "{}: gauge at ({}, {}) r={} ({} votes)",
            identifier, circle.center.x, circle.center.y, circle.radius, circle.votes
        );

        let binary = preprocessing::binarize_face(
            &gray,
            circle.center,
            circle.radius,
            config.circle.binary_threshold,
        );
        self.emit(identifier, "1_binary", || DynamicImage::ImageLuma8(binary.clone()));

        let segments = self.extract_segments(&binary, circle.radius, config)?;
        debug!("{}: {} segments", identifier, segments.len());

        let candidates = filter::filter_candidates(
            &segments,
            circle.center,
            circle.radius,
            config.lines.line_center_distance_factor,
        );
        if candidates.is_empty() {
            return Err(DetectionFailure::NoValidLines);
        }
        debug!("{}: {} segments pass near the center", identifier, candidates.len());
        self.emit(identifier, "2_all_lines", || {
            artifacts::render_candidates(&gray, &circle, &candidates)
        });

        let (group, needle) = self.resolve_needle(&candidates, &circle, config)?;
        debug!(
            "{}: best group of {} lines, needle at {:.1}°",
            identifier,
            group.len(),
            needle.angle
        );

        let timestamp = resolve_timestamp(identifier, self.clock.as_ref());
        let pressure = &config.pressure;
        let reading = GaugeReading::new(needle.angle, circle.center, circle.radius, identifier, timestamp)
            .with_pressure(Some(pressure.psi(needle.angle)), Some(pressure.bar(needle.angle)));

        self.emit(identifier, "result", || {
            artifacts::render_result(&gray, &circle, &group, needle.tip)
        });

        Ok(reading)
    }

    /// Blur and search for the gauge face; only the strongest circle is used
    pub fn locate_gauge(&self, gray: &GrayImage, config: &DetectionConfig) -> Result<Circle, DetectionFailure> {
        let blurred = self.vision.blur(gray, config.circle.blur_sigma);
        let search = CircleSearch::from(&config.circle);
        self.vision
            .detect_circles(&blurred, &search)
            .into_iter()
            .next()
            .ok_or(DetectionFailure::NoGaugeFound)
    }

    fn extract_segments(
        &self,
        binary: &GrayImage,
        radius: i32,
        config: &DetectionConfig,
    ) -> Result<Vec<LineSegment>, DetectionFailure> {
        let edges = self
            .vision
            .detect_edges(binary, config.lines.canny_low, config.lines.canny_high);
        let search = SegmentSearch::for_radius(&config.lines, radius);
        let segments = self.vision.detect_segments(&edges, &search);
        if segments.is_empty() {
            return Err(DetectionFailure::NoLinesFound);
        }
        Ok(segments)
    }

    fn resolve_needle(
        &self,
        candidates: &[LineCandidate],
        circle: &Circle,
        config: &DetectionConfig,
    ) -> Result<(Vec<LineCandidate>, NeedleDirection), DetectionFailure> {
        let group = clustering::best_group(candidates, config.lines.angle_grouping_threshold)
            .ok_or(DetectionFailure::NoValidLines)?;
        let needle = direction::resolve_needle(candidates, &group, circle.center, circle.radius)
            .ok_or(DetectionFailure::NoValidLines)?;
        Ok((group, needle))
    }

    /// Hand an artifact to the debug sink, rendering it only when one is attached
    fn emit(&self, identifier: &str, stage: &str, render: impl FnOnce() -> DynamicImage) {
        if let Some(sink) = &self.debug {
            if let Err(e) = sink.save(identifier, stage, &render()) {
                warn!("Could not write {} debug image for {}: {}", stage, identifier, e);
            }
        }
    }
}

impl Default for GaugeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one image with the default primitives and the system clock
pub fn detect(img: &DynamicImage, identifier: &str, config: &DetectionConfig) -> Result<GaugeReading, DetectionFailure> {
    GaugeDetector::new().detect(img, identifier, config)
}
