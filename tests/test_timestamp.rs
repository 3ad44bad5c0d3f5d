use gaugewatch::timestamp::{Clock, FixedClock, parse_filename_timestamp, resolve_timestamp};
use time::macros::datetime;

#[test]
fn test_parse_token_in_file_name() {
    assert_eq!(
        parse_filename_timestamp("gauge_240315_0930.jpg"),
        Some(datetime!(2024-03-15 09:30))
    );
    assert_eq!(
        parse_filename_timestamp("231231_2359.png"),
        Some(datetime!(2023-12-31 23:59))
    );
}

#[test]
fn test_first_token_wins() {
    assert_eq!(
        parse_filename_timestamp("cam_240101_0800_240202_0900.jpg"),
        Some(datetime!(2024-01-01 08:00))
    );
}

#[test]
fn test_invalid_or_missing_token() {
    assert_eq!(parse_filename_timestamp("gauge.jpg"), None);
    assert_eq!(parse_filename_timestamp("gauge_2403_0930.jpg"), None);
    // month 13
    assert_eq!(parse_filename_timestamp("gauge_241315_0930.jpg"), None);
    // 25:00
    assert_eq!(parse_filename_timestamp("gauge_240315_2500.jpg"), None);
}

#[test]
fn test_resolve_uses_clock_as_fallback() {
    let clock = FixedClock(datetime!(2025-06-01 12:00));
    assert_eq!(resolve_timestamp("no_time_here.jpg", &clock), clock.now());
    assert_eq!(
        resolve_timestamp("dial_images/dial_240315_0930.jpg", &clock),
        datetime!(2024-03-15 09:30)
    );
}

#[test]
fn test_resolve_only_looks_at_the_file_name() {
    let clock = FixedClock(datetime!(2025-06-01 12:00));
    assert_eq!(
        resolve_timestamp("archive/240101_0000/dial.jpg", &clock),
        datetime!(2025-06-01 12:00)
    );
}
