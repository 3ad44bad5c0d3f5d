use time::PrimitiveDateTime;

/// Integer pixel coordinate in image space (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Direction from `self` towards `other` in degrees, normalized to [0, 360)
    pub fn direction_to(&self, other: Point) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        normalize_degrees(dy.atan2(dx).to_degrees())
    }
}

/// Wrap an angle in degrees into [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid of a tiny negative value rounds up to exactly 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// A detected circle, strongest candidates carry the most votes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: i32,
    pub votes: u32,
}

/// Raw straight segment as returned by the line extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            start: Point::new(x1, y1),
            end: Point::new(x2, y2),
        }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(self.end)
    }

    /// Undirected orientation in degrees, in [0, 180)
    pub fn orientation(&self) -> f64 {
        let dx = (self.end.x - self.start.x) as f64;
        let dy = (self.end.y - self.start.y) as f64;
        let angle = dy.atan2(dx).to_degrees().rem_euclid(180.0);
        if angle >= 180.0 { 0.0 } else { angle }
    }

    /// Perpendicular distance from `point` to the infinite line through the segment.
    ///
    /// Returns `None` for zero-length segments.
    pub fn distance_to_line(&self, point: Point) -> Option<f64> {
        let len = self.length();
        if len == 0.0 {
            return None;
        }
        let v1x = (point.x - self.start.x) as f64;
        let v1y = (point.y - self.start.y) as f64;
        let v2x = (self.end.x - self.start.x) as f64;
        let v2y = (self.end.y - self.start.y) as f64;
        Some((v1x * v2y - v1y * v2x).abs() / len)
    }
}

/// A segment that passed the center-proximity filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineCandidate {
    pub segment: LineSegment,
    /// Undirected orientation, [0, 180)
    pub angle: f64,
    /// Direction from the gauge center to the farther endpoint, [0, 360)
    pub direction: f64,
    /// Perpendicular distance from the gauge center
    pub center_distance: f64,
}

/// Candidates of similar orientation, in the order they were grouped
pub type LineGroup = Vec<LineCandidate>;

/// One needle reading extracted from one image
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeReading {
    angle: f64,
    center: Point,
    radius: i32,
    image_path: String,
    timestamp: PrimitiveDateTime,
    pressure_psi: Option<f64>,
    pressure_bar: Option<f64>,
}

impl GaugeReading {
    /// `radius` is the detected face radius and is expected to be positive.
    ///
    /// The constructor does not enforce it; `save_readings` skips readings
    /// with non-positive geometry.
    pub fn new(
        angle: f64,
        center: Point,
        radius: i32,
        image_path: impl Into<String>,
        timestamp: PrimitiveDateTime,
    ) -> Self {
        Self {
            angle: normalize_degrees(angle),
            center,
            radius,
            image_path: image_path.into(),
            timestamp,
            pressure_psi: None,
            pressure_bar: None,
        }
    }

    pub fn with_pressure(mut self, psi: Option<f64>, bar: Option<f64>) -> Self {
        self.pressure_psi = psi;
        self.pressure_bar = bar;
        self
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    /// File name component of the image path, used as the storage key
    pub fn image_name(&self) -> &str {
        std::path::Path::new(&self.image_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.image_path)
    }

    pub fn timestamp(&self) -> PrimitiveDateTime {
        self.timestamp
    }

    pub fn pressure_psi(&self) -> Option<f64> {
        self.pressure_psi
    }

    pub fn pressure_bar(&self) -> Option<f64> {
        self.pressure_bar
    }
}
