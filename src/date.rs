use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};

/// Display styles used across the dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateFormat {
    /// Jan 5, 2024
    Short,
    /// Jan 5, 2024, 02:30 PM
    Medium,
    /// Friday, January 5, 2024
    Long,
}

/// Collapses every date shape the store can hold into one canonical UTC instant.
///
/// Accepted shapes:
/// - timestamp objects `{"seconds": i64, "nanoseconds": i64}`, underscore prefixed keys too
/// - RFC 3339 strings
/// - plain `YYYY-MM-DD` strings, taken as UTC midnight
/// - numbers, taken as milliseconds since the Unix epoch
pub fn normalize(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::Object(map) => {
            let seconds = map.get("seconds").or_else(|| map.get("_seconds"))?.as_i64()?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            OffsetDateTime::from_unix_timestamp_nanos(
                i128::from(seconds) * 1_000_000_000 + i128::from(nanos),
            )
            .ok()
        }
        Value::String(text) => parse_str(text),
        Value::Number(number) => {
            let millis = number
                .as_i64()
                .or_else(|| number.as_f64().map(|it| it as i64))?;
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
        }
        _ => None,
    }
}

fn parse_str(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();
    if let Ok(date_time) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(date_time);
    }
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
}

pub fn format(date: Option<OffsetDateTime>, format: DateFormat) -> String {
    let Some(date) = date else {
        return "N/A".into();
    };
    let res = match format {
        DateFormat::Short => {
            date.format(format_description!("[month repr:short] [day padding:none], [year]"))
        }
        DateFormat::Medium => date.format(format_description!(
            "[month repr:short] [day padding:none], [year], [hour repr:12]:[minute] [period]"
        )),
        DateFormat::Long => date.format(format_description!(
            "[weekday], [month repr:long] [day padding:none], [year]"
        )),
    };
    res.unwrap_or_else(|_| "N/A".into())
}

/// Full years elapsed between the date of birth and `today`
pub fn age_in_years(date_of_birth: Date, today: Date) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month() as u8, today.day()) < (date_of_birth.month() as u8, date_of_birth.day()) {
        age -= 1;
    }
    age
}
