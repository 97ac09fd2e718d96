//! Explicit version context
//!
//! A [`Session`] carries the DDMS version that synthesised components are built
//! for, and the controlled vocabularies they are checked against. Sessions are
//! plain values: switching versions produces a new session and leaves
//! components built under the old one untouched, so independent records can be
//! processed on separate threads.

use std::sync::Arc;

use tracing::{debug, info};

use crate::component::{Component, ComponentFields};
use crate::config::Config;
use crate::element::Element;
use crate::error::{DdmsError, Result};
use crate::kind::ComponentKind;
use crate::record::{Record, RecordAttributes};
use crate::version::{Version, VersionRegistry};
use crate::vocabulary::Vocabularies;

#[derive(Debug, Clone)]
pub struct Session {
    version: Version,
    vocabularies: Arc<Vocabularies>,
}

impl Session {
    /// A session for `version` using the built-in vocabularies.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            vocabularies: Vocabularies::builtin(),
        }
    }

    /// A session for a version token such as `4.1` or the alias `4.0`.
    pub fn for_token(token: &str) -> Result<Self> {
        Ok(Self::new(VersionRegistry::global().resolve(token)?))
    }

    /// A session for the newest registered version.
    pub fn latest() -> Result<Self> {
        VersionRegistry::global()
            .latest()
            .cloned()
            .map(Self::new)
            .ok_or_else(|| DdmsError::UnsupportedVersion("latest".to_string()))
    }

    pub fn with_vocabularies(mut self, vocabularies: Arc<Vocabularies>) -> Self {
        self.vocabularies = vocabularies;
        self
    }

    /// Builds a session from configuration: its default version, plus any
    /// extra vocabulary files layered on the built-in tables.
    pub fn from_config(config: &Config) -> Result<Self> {
        let session = Self::for_token(&config.ddms.version)?;
        if config.ddms.vocabulary_files.is_empty() {
            return Ok(session);
        }

        let mut vocabularies = (*Vocabularies::builtin()).clone();
        for path in &config.ddms.vocabulary_files {
            vocabularies.load_file(path)?;
        }
        info!(
            "Session for DDMS {} uses {} extra vocabulary file(s)",
            session.version,
            config.ddms.vocabulary_files.len()
        );
        Ok(session.with_vocabularies(Arc::new(vocabularies)))
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocabularies
    }

    /// This session's vocabularies under another, already resolved, version.
    pub(crate) fn with_version(&self, version: Version) -> Self {
        Self {
            version,
            vocabularies: Arc::clone(&self.vocabularies),
        }
    }

    /// A new session for another version, sharing these vocabularies.
    pub fn switch_to(&self, token: &str) -> Result<Self> {
        let version = VersionRegistry::global().resolve(token)?;
        debug!("Switching session from DDMS {} to {}", self.version, version);
        Ok(self.with_version(version))
    }

    /// Synthesises and validates one component for this session's version.
    pub fn component(&self, kind: ComponentKind, fields: ComponentFields) -> Result<Component> {
        Component::build(self, kind, fields)
    }

    /// Wraps and validates a parsed element.
    pub fn parse(&self, element: Element) -> Result<Component> {
        Component::from_element(self, element)
    }

    /// Assembles and validates a record for this session's version.
    pub fn record(&self, components: Vec<Component>, attributes: RecordAttributes) -> Result<Record> {
        Record::new(self, components, attributes)
    }

    /// Wraps and validates a parsed `ddms:resource` element.
    pub fn parse_record(&self, element: Element) -> Result<Record> {
        Record::from_element(self, element)
    }
}
