//! UTC day keys (`YYYY-MM-DD`) used by the daily PR counters.

use time::{Date, OffsetDateTime};

pub fn day_key(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Today's key in UTC.
pub fn today() -> String {
    day_key(OffsetDateTime::now_utc().date())
}

/// Shape check only; keys of this shape order chronologically as strings.
pub fn is_day_key(key: &str) -> bool {
    let b = key.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b.iter()
            .enumerate()
            .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit())
}
