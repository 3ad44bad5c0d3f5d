use std::path::PathBuf;

/// Why a single image produced no reading.
///
/// Every variant is a per-image skip signal: batch processing records it and
/// moves on to the next image.
#[derive(Debug, thiserror::Error)]
pub enum DetectionFailure {
    #[error("could not read image {path}: {reason}")]
    ImageUnreadable { path: PathBuf, reason: String },

    #[error("no gauge found")]
    NoGaugeFound,

    #[error("no lines found")]
    NoLinesFound,

    #[error("no valid lines found near the gauge center")]
    NoValidLines,
}

impl DetectionFailure {
    /// Short stable label used in logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            DetectionFailure::ImageUnreadable { .. } => "image_unreadable",
            DetectionFailure::NoGaugeFound => "no_gauge_found",
            DetectionFailure::NoLinesFound => "no_lines_found",
            DetectionFailure::NoValidLines => "no_valid_lines",
        }
    }
}
