use chrono::NaiveDate;

/// Calendar-day keys are ISO dates, so lexicographic and chronological order agree.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Parse a calendar-day key. Surrounding whitespace is ignored.
pub fn parse_date_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_KEY_FORMAT).ok()
}

pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}
