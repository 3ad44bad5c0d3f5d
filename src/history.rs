use time::{Duration, PrimitiveDateTime, Time};

use crate::models::GaugeReading;

/// Position in a [`History`], counted from either end.
///
/// `FromEnd(1)` is the most recent reading, `FromEnd(2)` the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeIndex {
    FromStart(usize),
    FromEnd(usize),
}

impl RelativeIndex {
    pub const LAST: RelativeIndex = RelativeIndex::FromEnd(1);
    pub const PREVIOUS: RelativeIndex = RelativeIndex::FromEnd(2);

    /// Resolve against a sequence of `len` elements, `None` when out of range
    pub fn resolve(self, len: usize) -> Option<usize> {
        match self {
            RelativeIndex::FromStart(i) if i < len => Some(i),
            RelativeIndex::FromEnd(n) if n >= 1 && n <= len => Some(len - n),
            _ => None,
        }
    }
}

impl From<isize> for RelativeIndex {
    /// Negative values count from the end, so `-1` is the last element
    fn from(index: isize) -> Self {
        if index < 0 {
            RelativeIndex::FromEnd(index.unsigned_abs())
        } else {
            RelativeIndex::FromStart(index as usize)
        }
    }
}

/// Append-only log of readings in insertion order.
///
/// Change queries use positions, not timestamps: callers that gather readings
/// out of order should sort them before appending.
#[derive(Debug, Clone, Default)]
pub struct History {
    readings: Vec<GaugeReading>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, reading: GaugeReading) {
        self.readings.push(reading);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn get(&self, index: impl Into<RelativeIndex>) -> Option<&GaugeReading> {
        let idx = index.into().resolve(self.readings.len())?;
        self.readings.get(idx)
    }

    pub fn last(&self) -> Option<&GaugeReading> {
        self.readings.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GaugeReading> {
        self.readings.iter()
    }

    pub fn readings(&self) -> &[GaugeReading] {
        &self.readings
    }

    fn pair(
        &self,
        first: impl Into<RelativeIndex>,
        second: impl Into<RelativeIndex>,
    ) -> Option<(&GaugeReading, &GaugeReading)> {
        if self.readings.len() < 2 {
            return None;
        }
        Some((self.get(first)?, self.get(second)?))
    }

    /// Signed shortest angular change from `first` to `second`, in (-180, 180]
    pub fn change(
        &self,
        first: impl Into<RelativeIndex>,
        second: impl Into<RelativeIndex>,
    ) -> Option<f64> {
        let (a, b) = self.pair(first, second)?;
        Some(angle_change(a.angle(), b.angle()))
    }

    /// Angular change per minute between `first` and `second`.
    ///
    /// Readings with identical timestamps give a rate of 0.
    pub fn change_rate(
        &self,
        first: impl Into<RelativeIndex>,
        second: impl Into<RelativeIndex>,
    ) -> Option<f64> {
        let first = first.into();
        let second = second.into();
        let (a, b) = self.pair(first, second)?;

        let minutes = (b.timestamp() - a.timestamp()).as_seconds_f64() / 60.0;
        if minutes == 0.0 {
            return Some(0.0);
        }
        let change = self.change(first, second)?;
        Some(change / minutes)
    }

    /// Mean readings per time bucket, in chronological order
    pub fn average_by_period(&self, period: AveragePeriod, value: u32) -> Vec<AveragedPoint> {
        let value = value.max(1);
        let mut sorted: Vec<&GaugeReading> = self.readings.iter().collect();
        sorted.sort_by_key(|r| r.timestamp());

        let mut points: Vec<AveragedPoint> = Vec::new();
        let mut bucket: Vec<&GaugeReading> = Vec::new();
        let mut bucket_start: Option<PrimitiveDateTime> = None;

        for reading in sorted {
            let start = period.bucket_start(reading.timestamp(), value);
            if let Some(current) = bucket_start.filter(|current| *current != start) {
                points.push(AveragedPoint::from_bucket(current, period, value, &bucket));
                bucket.clear();
            }
            bucket_start = Some(start);
            bucket.push(reading);
        }
        if let Some(current) = bucket_start {
            points.push(AveragedPoint::from_bucket(current, period, value, &bucket));
        }

        points
    }
}

impl FromIterator<GaugeReading> for History {
    fn from_iter<I: IntoIterator<Item = GaugeReading>>(iter: I) -> Self {
        Self {
            readings: iter.into_iter().collect(),
        }
    }
}

impl Extend<GaugeReading> for History {
    fn extend<I: IntoIterator<Item = GaugeReading>>(&mut self, iter: I) {
        self.readings.extend(iter);
    }
}

/// Shortest signed rotation from angle `a` to angle `b`, in (-180, 180]
pub fn angle_change(a: f64, b: f64) -> f64 {
    let change = (b - a).rem_euclid(360.0);
    if change > 180.0 { change - 360.0 } else { change }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AveragePeriod {
    Minute,
    Hour,
    Day,
}

impl std::str::FromStr for AveragePeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minute" => Ok(AveragePeriod::Minute),
            "hour" => Ok(AveragePeriod::Hour),
            "day" => Ok(AveragePeriod::Day),
            other => anyhow::bail!("unknown averaging period '{}'", other),
        }
    }
}

impl AveragePeriod {
    fn bucket_start(self, ts: PrimitiveDateTime, value: u32) -> PrimitiveDateTime {
        let midnight = Time::MIDNIGHT;
        match self {
            AveragePeriod::Minute => {
                let minute = (ts.minute() as u32 / value * value) as u8;
                let time = Time::from_hms(ts.hour(), minute, 0).unwrap_or(midnight);
                PrimitiveDateTime::new(ts.date(), time)
            }
            AveragePeriod::Hour => {
                let hour = (ts.hour() as u32 / value * value) as u8;
                let time = Time::from_hms(hour, 0, 0).unwrap_or(midnight);
                PrimitiveDateTime::new(ts.date(), time)
            }
            AveragePeriod::Day => {
                let day = ts.day() as u32;
                let offset = match day % value {
                    0 => value,
                    rest => rest,
                };
                let back = i64::from(offset) - 1;
                let date = ts.date() - Duration::days(back);
                PrimitiveDateTime::new(date, midnight)
            }
        }
    }

    fn span(self, value: u32) -> Duration {
        let value = i64::from(value);
        match self {
            AveragePeriod::Minute => Duration::minutes(value),
            AveragePeriod::Hour => Duration::hours(value),
            AveragePeriod::Day => Duration::days(value),
        }
    }
}

/// Mean of the readings that fell into one averaging bucket
#[derive(Debug, Clone, PartialEq)]
pub struct AveragedPoint {
    pub period_start: PrimitiveDateTime,
    /// Bucket midpoint, the timestamp reported for the average
    pub timestamp: PrimitiveDateTime,
    pub angle: f64,
    pub pressure_psi: Option<f64>,
    pub pressure_bar: Option<f64>,
    pub count: usize,
}

impl AveragedPoint {
    fn from_bucket(
        start: PrimitiveDateTime,
        period: AveragePeriod,
        value: u32,
        bucket: &[&GaugeReading],
    ) -> Self {
        let count = bucket.len();
        let angle = bucket.iter().map(|r| r.angle()).sum::<f64>() / count as f64;
        AveragedPoint {
            period_start: start,
            timestamp: start + period.span(value) / 2_i32,
            angle,
            pressure_psi: mean(bucket.iter().map(|r| r.pressure_psi())),
            pressure_bar: mean(bucket.iter().map(|r| r.pressure_bar())),
            count,
        }
    }
}

/// Mean of the present values, `None` when every value is missing
fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, n) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { None } else { Some(sum / n as f64) }
}
