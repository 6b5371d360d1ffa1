use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a date cell leniently. Returns `None` for anything unrecognised.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok().map(|dt| dt.date()))
        .or_else(|| DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok()))
}

/// `YYYY-MM`.
pub fn month_period(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Monday-to-Sunday week containing `date`, as `YYYY-MM-DD/YYYY-MM-DD`.
pub fn week_period(date: NaiveDate) -> String {
    let start = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    let end = start + Duration::days(6);
    format!("{}/{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
}
