//! Form validation with per-field error collection.
//!
//! Checks never short-circuit: a form reports every failing field at once, the
//! way a web form shows one message under each bad input.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

pub const NAME_MAX: usize = 150;
pub const TITLE_MAX: usize = 200;
pub const TEXT_MAX: usize = 10_000;
pub const EMAIL_MAX: usize = 254;

/// Implemented by every request form accepted through `ValidatedJson`.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn required(&mut self, field: &str, value: &str, max: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "is required");
        } else if trimmed.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    pub fn optional(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(v) = value
            && v.trim().chars().count() > max
        {
            self.add(field, format!("must be at most {max} characters"));
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        let Some(email) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };
        if let Err(reason) = check_email(email) {
            self.add(field, reason);
        }
    }

    pub fn phone(&mut self, field: &str, value: Option<&str>) {
        let Some(phone) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return;
        };
        if let Err(reason) = check_phone(phone) {
            self.add(field, reason);
        }
    }

    pub fn amount(&mut self, field: &str, value: Option<f64>) {
        let Some(v) = value else {
            return;
        };
        if !v.is_finite() {
            self.add(field, "must be a number");
        } else if v < 0.0 {
            self.add(field, "must not be negative");
        }
    }

    pub fn positive_id(&mut self, field: &str, value: i64) {
        if value <= 0 {
            self.add(field, "is required");
        }
    }

    pub fn date_order(
        &mut self,
        field: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) {
        if let (Some(start), Some(end)) = (start, end)
            && end < start
        {
            self.add(field, "must not be before the start date");
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field} {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]{1,64}@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .expect("Invalid email regex")
});

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("Invalid phone regex"));

/// Formatting people type between digits: spaces, dashes, dots and parentheses.
static PHONE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-().]").expect("Invalid phone separator regex"));

fn check_email(email: &str) -> Result<(), &'static str> {
    if email.len() > EMAIL_MAX {
        return Err("must be at most 254 characters");
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("must be a valid email address");
    }
    Ok(())
}

fn check_phone(phone: &str) -> Result<(), &'static str> {
    let compact = PHONE_SEPARATORS.replace_all(phone, "");
    if !PHONE_REGEX.is_match(&compact) {
        return Err("must be a phone number with 7 to 15 digits and an optional leading +");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_failing_field() {
        let mut errors = ValidationErrors::new();
        errors.required("name", "   ", NAME_MAX);
        errors.email("email", Some("not-an-email"));
        errors.amount("amount", Some(-1.0));
        errors.phone("phone", None);

        assert_eq!(errors.fields().len(), 3);
        assert_eq!(errors.get("name"), Some(&["is required".to_string()][..]));
        assert!(errors.get("phone").is_none());
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn email_rules() {
        assert!(check_email("ana@example.com").is_ok());
        assert!(check_email("ana.b+crm@mail.example.es").is_ok());
        assert!(check_email("ana@localhost").is_err());
        assert!(check_email("@example.com").is_err());
        assert!(check_email("ana@@example.com").is_err());
        assert!(check_email("ana@example..com").is_err());
        assert!(check_email("ana maria@example.com").is_err());
        assert!(check_email("ana@-example.com").is_err());
    }

    #[test]
    fn phone_rules() {
        assert!(check_phone("+34 600 123 456").is_ok());
        assert!(check_phone("(555) 010-2030").is_ok());
        assert!(check_phone("12345").is_err());
        assert!(check_phone("600-abc-123").is_err());
        assert!(check_phone("600+123456").is_err());
        assert!(check_phone("+34.600.123.456").is_ok());
        assert!(check_phone("1234567890123456").is_err());
    }

    #[test]
    fn blank_optional_values_are_skipped() {
        let mut errors = ValidationErrors::new();
        errors.email("email", Some("  "));
        errors.phone("phone", Some(""));
        errors.optional("company", None, NAME_MAX);
        assert!(errors.is_empty());
    }

    #[test]
    fn due_date_before_start_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 10);
        let end = NaiveDate::from_ymd_opt(2026, 3, 1);
        let mut errors = ValidationErrors::new();
        errors.date_order("due_date", start, end);
        errors.date_order("other", start, None);
        assert_eq!(errors.fields().len(), 1);
        assert_eq!(
            errors.to_string(),
            "due_date must not be before the start date"
        );
    }
}
