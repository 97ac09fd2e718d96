use std::path::PathBuf;

use thiserror::Error;

/// Main library error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum DdmsError {
    /// A structural, format, vocabulary or cross-component check failed.
    #[error("{message}")]
    Invalid { message: String, locator: String },

    #[error("Unsupported DDMS version: {0}")]
    UnsupportedVersion(String),

    #[error("DDMS version {0} is already registered")]
    DuplicateVersion(String),

    /// Lookup of a vocabulary key that no version defines. Always a programming error.
    #[error("No controlled vocabulary named {key} exists for DDMS {version}")]
    UnknownVocabulary { key: String, version: String },

    #[error("Invalid vocabulary definition: {details}")]
    Vocabulary { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record document could not be read: {file} - {details}")]
    Document { file: PathBuf, details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Concurrency error: {details}")]
    Concurrency { details: String },
}

impl DdmsError {
    /// Creates an `Invalid` error located at a single qualified name.
    pub fn invalid(message: impl Into<String>, qualified_name: &str) -> Self {
        DdmsError::Invalid {
            message: message.into(),
            locator: locator_for(qualified_name),
        }
    }

    /// Creates an `Invalid` error without a location, used by attribute groups
    /// which inherit the locator of their owning element.
    pub fn unlocated(message: impl Into<String>) -> Self {
        DdmsError::Invalid {
            message: message.into(),
            locator: String::new(),
        }
    }

    /// Prepends a qualified name to the locator of an `Invalid` error. Other
    /// variants pass through untouched.
    pub fn within(self, qualified_name: &str) -> Self {
        match self {
            DdmsError::Invalid { message, locator } => DdmsError::Invalid {
                message,
                locator: format!("{}{}", locator_for(qualified_name), locator),
            },
            other => other,
        }
    }

    /// Returns true for recoverable data errors.
    pub fn is_invalid(&self) -> bool {
        matches!(self, DdmsError::Invalid { .. })
    }

    pub fn locator(&self) -> Option<&str> {
        match self {
            DdmsError::Invalid { locator, .. } => Some(locator),
            _ => None,
        }
    }
}

pub(crate) fn locator_for(qualified_name: &str) -> String {
    format!("/{}", qualified_name)
}

impl From<crate::config::ConfigError> for DdmsError {
    fn from(err: crate::config::ConfigError) -> Self {
        DdmsError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DdmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_display_is_message_only() {
        let error = DdmsError::invalid("A value is required.", "ddms:title");
        assert_eq!(error.to_string(), "A value is required.");
        assert_eq!(error.locator(), Some("/ddms:title"));
        assert!(error.is_invalid());
    }

    #[test]
    fn test_within_prepends_path_segments() {
        let error = DdmsError::invalid("bad keyword", "ddms:keyword")
            .within("ddms:subjectCoverage")
            .within("ddms:resource");
        assert_eq!(
            error.locator(),
            Some("/ddms:resource/ddms:subjectCoverage/ddms:keyword")
        );
    }

    #[test]
    fn test_unlocated_takes_owner_locator() {
        let error = DdmsError::unlocated("classification is required.").within("ddms:title");
        assert_eq!(error.locator(), Some("/ddms:title"));
    }

    #[test]
    fn test_within_ignores_fatal_errors() {
        let error = DdmsError::UnsupportedVersion("9.9".to_string()).within("ddms:resource");
        assert!(!error.is_invalid());
        assert!(error.locator().is_none());
        assert!(error.to_string().contains("9.9"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: DdmsError = io_error.into();

        match error {
            DdmsError::Io(_) => (),
            _ => panic!("Expected DdmsError::Io"),
        }
    }

    #[test]
    fn test_unknown_vocabulary_display() {
        let error = DdmsError::UnknownVocabulary {
            key: "colours".to_string(),
            version: "4.1".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("colours"));
        assert!(text.contains("4.1"));
    }
}
