//! Lexical value formats shared by element text, text fields and attributes.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::{DdmsError, Result};
use crate::version::Version;
use crate::vocabulary::Vocabularies;

/// The lexical space a value must fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// Any string.
    Text,
    Uri,
    PositiveInteger,
    Decimal,
    Boolean,
    /// One of `xs:gYear`, `xs:gYearMonth`, `xs:date` or `xs:dateTime`.
    Date,
    /// A date, or one of the markers `Not Applicable` and `Unknown`.
    DateOrMarker,
    OneOf(&'static [&'static str]),
    /// A single token of the named controlled vocabulary.
    Vocabulary(&'static str),
    /// A whitespace-separated list of tokens of the named controlled vocabulary.
    VocabularyList(&'static str),
}

/// Markers accepted in place of a date by temporal coverage bounds.
pub const DATE_MARKERS: &[&str] = &["Not Applicable", "Unknown"];

/// Cached regex for URI schemes
static URI_SCHEME_REGEX: OnceLock<Regex> = OnceLock::new();

/// Cached regex for the date family, with an optional timezone
static DATE_REGEX: OnceLock<Regex> = OnceLock::new();

fn uri_scheme_regex() -> &'static Regex {
    URI_SCHEME_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").expect("Failed to compile URI scheme regex")
    })
}

fn date_regex() -> &'static Regex {
    DATE_REGEX.get_or_init(|| {
        Regex::new(r"^(-?\d{4})(?:-(\d{2})(?:-(\d{2}))?)?(Z|[+\-]\d{2}:\d{2})?$")
            .expect("Failed to compile date regex")
    })
}

impl ValueFormat {
    /// Checks `value`, naming `label` (an attribute or element name) in the failure message.
    pub fn check(
        &self,
        value: &str,
        label: &str,
        version: &Version,
        vocabularies: &Vocabularies,
    ) -> Result<()> {
        let valid = match self {
            ValueFormat::Text => true,
            ValueFormat::Uri => is_uri(value),
            ValueFormat::PositiveInteger => value.parse::<u64>().map(|n| n > 0).unwrap_or(false),
            ValueFormat::Decimal => value.parse::<f64>().map(f64::is_finite).unwrap_or(false),
            ValueFormat::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            ValueFormat::Date => is_date(value),
            ValueFormat::DateOrMarker => DATE_MARKERS.contains(&value) || is_date(value),
            ValueFormat::OneOf(allowed) => allowed.contains(&value),
            ValueFormat::Vocabulary(key) => {
                return vocabularies.validate(version, key, value);
            }
            ValueFormat::VocabularyList(key) => {
                return vocabularies.validate_list(version, key, value);
            }
        };
        if valid {
            Ok(())
        } else {
            Err(DdmsError::unlocated(self.failure(value, label)))
        }
    }

    fn failure(&self, value: &str, label: &str) -> String {
        match self {
            ValueFormat::Uri => format!("Invalid URI (Illegal character in {}): {}", label, value),
            ValueFormat::PositiveInteger => format!("The {} must be a positive integer.", label),
            ValueFormat::Decimal => format!("The {} must be a decimal number.", label),
            ValueFormat::Boolean => format!("The {} must be a boolean.", label),
            ValueFormat::Date => format!(
                "The {} must be in the xs:dateTime, xs:date, xs:gYearMonth, or xs:gYear format.",
                label
            ),
            ValueFormat::DateOrMarker => format!(
                "The {} must be a date or one of {}.",
                label,
                DATE_MARKERS.join(", ")
            ),
            ValueFormat::OneOf(allowed) => format!(
                "The {} must be one of {}.",
                label,
                allowed.join(", ")
            ),
            _ => format!("{} is not a valid {}.", value, label),
        }
    }
}

/// Loose `xs:anyURI` check: no whitespace, and a well-formed scheme if one is present.
pub fn is_uri(value: &str) -> bool {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once(':') {
        Some((scheme, _)) if !scheme.contains('/') => uri_scheme_regex().is_match(scheme),
        _ => true,
    }
}

/// Accepts the `xs:gYear`, `xs:gYearMonth`, `xs:date` and `xs:dateTime` lexical forms.
pub fn is_date(value: &str) -> bool {
    if value.contains('T') {
        return DateTime::parse_from_rfc3339(value).is_ok()
            || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok();
    }
    let Some(captures) = date_regex().captures(value) else {
        return false;
    };
    let year = &captures[1];
    match (captures.get(2), captures.get(3)) {
        (None, _) => true,
        (Some(month), None) => {
            NaiveDate::parse_from_str(&format!("{}-{}-01", year, month.as_str()), "%Y-%m-%d").is_ok()
        }
        (Some(month), Some(day)) => NaiveDate::parse_from_str(
            &format!("{}-{}-{}", year, month.as_str(), day.as_str()),
            "%Y-%m-%d",
        )
        .is_ok(),
    }
}
