use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};
use tracing::debug;

/// Source of "now" for readings whose file name carries no timestamp
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

/// Wall clock in local time, falling back to UTC when the local offset is unknown
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub PrimitiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        self.0
    }
}

/// Parse the first `yymmdd_hhmm` token in `name` (year offset 2000).
///
/// Only the first place where six digits, an underscore and four digits line up
/// is considered; if its values do not form a valid date and time the result is
/// `None`.
pub fn parse_filename_timestamp(name: &str) -> Option<PrimitiveDateTime> {
    let bytes = name.as_bytes();
    let is_token = |start: usize| {
        bytes.len() >= start + 11
            && bytes[start..start + 6].iter().all(u8::is_ascii_digit)
            && bytes[start + 6] == b'_'
            && bytes[start + 7..start + 11].iter().all(u8::is_ascii_digit)
    };
    let start = (0..bytes.len()).find(|&i| is_token(i))?;
    let token = &name[start..start + 11];

    let field = |range: std::ops::Range<usize>| token[range].parse::<u8>().ok();
    let year = 2000 + i32::from(field(0..2)?);
    let month = Month::try_from(field(2..4)?).ok()?;
    let day = field(4..6)?;
    let hour = field(7..9)?;
    let minute = field(9..11)?;

    let date = Date::from_calendar_date(year, month, day).ok()?;
    let time = Time::from_hms(hour, minute, 0).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

/// Timestamp for a reading: from the file name when possible, otherwise from `clock`
pub fn resolve_timestamp(identifier: &str, clock: &dyn Clock) -> PrimitiveDateTime {
    let file_name = std::path::Path::new(identifier)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(identifier);

    match parse_filename_timestamp(file_name) {
        Some(timestamp) => timestamp,
        None => {
            debug!("No usable timestamp in {:?}, using current time", file_name);
            clock.now()
        }
    }
}
