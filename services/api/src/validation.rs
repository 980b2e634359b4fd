//! Input validation utilities
//!
//! Each helper returns a human-readable message on failure; the services
//! wrap it into a `VALIDATION_ERROR`.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Validate and normalise an email address (trimmed, lower-cased)
pub fn validate_email(email: &str) -> Result<String, String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(email.to_ascii_lowercase())
}

/// Validate password length
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

/// Validate a phone number
pub fn validate_phone(phone: &str) -> Result<String, String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err("Phone is required".to_string());
    }

    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX
        .get_or_init(|| Regex::new(r"^\+?[0-9 \-]{7,20}$").expect("Failed to compile phone regex"));

    if !regex.is_match(phone) {
        return Err("Phone must be 7 to 20 digits".to_string());
    }

    Ok(phone.to_string())
}

/// Require a non-blank string, returning it trimmed
pub fn required(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(value.to_string())
}

/// Require an optional string to be present and non-blank
pub fn required_opt(field: &str, value: Option<&str>) -> Result<String, String> {
    required(field, value.unwrap_or_default())
}

/// Trim an optional string, dropping it when blank
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Require a strictly positive amount
pub fn positive(field: &str, value: i64) -> Result<i64, String> {
    if value <= 0 {
        return Err(format!("{} must be greater than zero", field));
    }
    Ok(value)
}

/// Require a non-negative amount
pub fn non_negative(field: &str, value: i64) -> Result<i64, String> {
    if value < 0 {
        return Err(format!("{} cannot be negative", field));
    }
    Ok(value)
}

/// Expected attendees must fit a positive 32-bit count
pub fn attendee_count(value: i64) -> Result<i32, String> {
    let value = positive("Expected attendees", value)?;
    i32::try_from(value).map_err(|_| "Expected attendees is too large".to_string())
}

/// Parse an event date given either as RFC 3339 or as a plain `YYYY-MM-DD`
pub fn parse_event_date(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("Event date is required".to_string());
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
        .ok_or_else(|| "Event date must be YYYY-MM-DD or an RFC 3339 timestamp".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalised() {
        assert_eq!(
            validate_email("  Sponsor@Acme.COM ").unwrap(),
            "sponsor@acme.com"
        );
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn password_bounds() {
        assert!(validate_password("a@12345").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn phone_formats() {
        assert!(validate_phone("+91 98765-43210").is_ok());
        assert!(validate_phone("12ab").is_err());
    }

    #[test]
    fn blank_strings_are_missing() {
        assert_eq!(required("Title", "  TechFest "), Ok("TechFest".to_string()));
        assert_eq!(required("Title", "   "), Err("Title is required".to_string()));
        assert_eq!(optional(Some("  ")), None);
    }

    #[test]
    fn event_dates_accept_both_forms() {
        let plain = parse_event_date("2025-03-15").unwrap();
        assert_eq!(plain.to_rfc3339(), "2025-03-15T00:00:00+00:00");

        let full = parse_event_date("2025-03-15T10:30:00+05:30").unwrap();
        assert_eq!(full.to_rfc3339(), "2025-03-15T05:00:00+00:00");

        assert!(parse_event_date("15/03/2025").is_err());
    }

    #[test]
    fn attendee_counts_must_be_positive() {
        assert_eq!(attendee_count(300), Ok(300));
        assert!(attendee_count(0).is_err());
        assert!(attendee_count(i64::MAX).is_err());
    }
}
