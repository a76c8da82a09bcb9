use chrono::{Local, NaiveDate};

/// Get current local date in YYYY-MM-DD format
pub fn current_date() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Parse a user-supplied date, accepting only YYYY-MM-DD
pub fn parse_date_arg(raw: &str) -> Result<String, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|_| format!("'{}' is not a date in YYYY-MM-DD format", raw))
}

/// Format YYYY-MM-DD date string for display (e.g. "June 3, 2025")
pub fn format_date_for_display(date_str: &str) -> String {
    match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
        Ok(date) => date.format("%B %-d, %Y").to_string(),
        Err(_) => date_str.to_string(),
    }
}
