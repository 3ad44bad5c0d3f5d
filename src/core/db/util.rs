use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Storage format for timestamps; sorts lexically in time order
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

pub fn format_timestamp(ts: PrimitiveDateTime) -> anyhow::Result<String> {
    Ok(ts.format(TIMESTAMP_FORMAT)?)
}

pub fn parse_timestamp(s: &str) -> anyhow::Result<PrimitiveDateTime> {
    Ok(PrimitiveDateTime::parse(s, TIMESTAMP_FORMAT)?)
}
