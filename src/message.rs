use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::locator_for;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A validation result with the path of the component it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationMessage {
    pub severity: Severity,
    pub text: String,
    pub locator: String,
}

impl ValidationMessage {
    pub fn error(text: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
            locator: locator.into(),
        }
    }

    pub fn warning(text: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
            locator: locator.into(),
        }
    }

    /// Re-homes this message under an enclosing element.
    pub fn prepend_locator(&mut self, qualified_name: &str) {
        self.locator = format!("{}{}", locator_for(qualified_name), self.locator);
    }

    pub fn within(mut self, qualified_name: &str) -> Self {
        self.prepend_locator(qualified_name);
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.locator.is_empty() {
            write!(f, "[{}] {}", self.severity, self.text)
        } else {
            write!(f, "[{}] {}: {}", self.severity, self.locator, self.text)
        }
    }
}

impl From<&crate::error::DdmsError> for ValidationMessage {
    fn from(error: &crate::error::DdmsError) -> Self {
        ValidationMessage::error(error.to_string(), error.locator().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DdmsError;

    #[test]
    fn test_prepend_builds_path() {
        let message = ValidationMessage::warning("A ddms:dates element was found with no values.", "/ddms:dates")
            .within("ddms:resource");
        assert_eq!(message.locator, "/ddms:resource/ddms:dates");
        assert!(message.is_warning());
    }

    #[test]
    fn test_display_includes_locator() {
        let message = ValidationMessage::error("bad", "/ddms:title");
        assert_eq!(message.to_string(), "[error] /ddms:title: bad");
        let bare = ValidationMessage::warning("note", "");
        assert_eq!(bare.to_string(), "[warning] note");
    }

    #[test]
    fn test_from_invalid_error() {
        let error = DdmsError::invalid("missing", "ddms:title").within("ddms:resource");
        let message = ValidationMessage::from(&error);
        assert_eq!(message.severity, Severity::Error);
        assert_eq!(message.locator, "/ddms:resource/ddms:title");
        assert_eq!(message.text, "missing");
    }
}
