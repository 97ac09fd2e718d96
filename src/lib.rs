//! # validate-ddms Library
//!
//! Models DDMS (DoD Discovery Metadata Specification) metadata records across
//! versions 2.0 through 5.0. Components are built from, or parsed into, a
//! namespace-aware element tree and validated on construction; a record
//! aggregates them and checks whole-record rules. Builders provide a mutable,
//! form-friendly counterpart. A rayon-backed batch engine validates directories
//! of JSON record documents.

pub mod attributes;
pub mod builder;
pub mod cli;
pub mod component;
pub mod config;
pub mod element;
pub mod error;
pub mod file_discovery;
pub mod format;
pub mod kind;
pub mod message;
pub mod output;
pub mod record;
pub mod render;
mod rules;
pub mod session;
pub mod validator;
pub mod version;
pub mod vocabulary;

pub use attributes::{AttributeGroup, GroupKind};
pub use builder::{AttributeGroupBuilder, Builder, BuilderList, ComponentBuilder, RecordBuilder};
pub use cli::{Cli, OutputFormat, RenderFormat, VerbosityLevel};
pub use component::{Component, ComponentFields};
pub use config::{Config, ConfigError, ConfigManager, EnvProvider};
pub use element::{Attribute, Element, Node};
pub use error::{DdmsError, Result};
pub use file_discovery::FileDiscovery;
pub use format::ValueFormat;
pub use kind::ComponentKind;
pub use message::{Severity, ValidationMessage};
pub use output::Output;
pub use record::{Record, RecordAttributes};
pub use session::Session;
pub use validator::{
    FileValidationResult, PerformanceMetrics, ProgressCallback, ValidationConfig, ValidationEngine,
    ValidationPhase, ValidationProgress, ValidationResults, ValidationStatus,
};
pub use version::{NamespaceKind, Version, VersionDescriptor, VersionRegistry};
pub use vocabulary::{TokenSet, Vocabularies};
