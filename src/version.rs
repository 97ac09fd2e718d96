//! DDMS Version Registry
//!
//! Each supported revision of the metadata standard is described by a
//! [`VersionDescriptor`]: its token, the namespaces it declares and the schema it
//! validates against. Descriptors are registered in ascending order; the
//! registration position is what orders versions, since tokens such as `4.0.1`
//! and `4.1` do not compare sensibly as strings.
//!
//! Some revisions are purely syntactic and are folded onto a canonical token by
//! the alias table (`3.0.1` is `3.0`, `4.0` is `4.0.1`). Distinct canonical
//! versions may share namespaces: `4.0.1` and `4.1` publish the same DDMS
//! namespace, and every version from `3.0` onward uses the same ISM namespace.
//! Namespace lookups resolve to the most recently registered version declaring
//! the URI, because schema changes without a namespace change are additive.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DdmsError, Result};

/// The kinds of namespace a version may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    Ddms,
    Gml,
    Ism,
    Ntk,
    Virt,
    Tspi,
    Xlink,
}

impl NamespaceKind {
    pub const ALL: [NamespaceKind; 7] = [
        NamespaceKind::Ddms,
        NamespaceKind::Gml,
        NamespaceKind::Ism,
        NamespaceKind::Ntk,
        NamespaceKind::Virt,
        NamespaceKind::Tspi,
        NamespaceKind::Xlink,
    ];

    /// The conventional prefix used when writing elements of this namespace.
    pub fn prefix(self) -> &'static str {
        match self {
            NamespaceKind::Ddms => "ddms",
            NamespaceKind::Gml => "gml",
            NamespaceKind::Ism => "ism",
            NamespaceKind::Ntk => "ntk",
            NamespaceKind::Virt => "virt",
            NamespaceKind::Tspi => "tspi",
            NamespaceKind::Xlink => "xlink",
        }
    }
}

/// Static description of one version, as supplied to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub token: String,
    pub namespaces: BTreeMap<NamespaceKind, String>,
    pub schema_location: String,
    /// The ISM data encoding specification version bundled with this release, if any.
    pub ism_des_version: Option<String>,
}

impl VersionDescriptor {
    pub fn new(token: impl Into<String>, primary_namespace: impl Into<String>) -> Self {
        let token = token.into();
        let mut namespaces = BTreeMap::new();
        namespaces.insert(NamespaceKind::Ddms, primary_namespace.into());
        Self {
            schema_location: format!("/schemas/{}/DDMS/ddms.xsd", token),
            token,
            namespaces,
            ism_des_version: None,
        }
    }

    pub fn with_namespace(mut self, kind: NamespaceKind, uri: impl Into<String>) -> Self {
        self.namespaces.insert(kind, uri.into());
        self
    }

    pub fn with_ism_des_version(mut self, des_version: impl Into<String>) -> Self {
        self.ism_des_version = Some(des_version.into());
        self
    }
}

#[derive(Debug)]
struct VersionInner {
    descriptor: VersionDescriptor,
    position: usize,
}

/// A registered version. Cheap to clone; immutable once registered.
#[derive(Debug, Clone)]
pub struct Version(Arc<VersionInner>);

impl Version {
    pub fn token(&self) -> &str {
        &self.0.descriptor.token
    }

    /// Position in registration order, starting at zero.
    pub fn position(&self) -> usize {
        self.0.position
    }

    pub fn namespace(&self, kind: NamespaceKind) -> Option<&str> {
        self.0.descriptor.namespaces.get(&kind).map(String::as_str)
    }

    /// The primary DDMS namespace of this version.
    pub fn primary_namespace(&self) -> &str {
        self.namespace(NamespaceKind::Ddms).unwrap_or_default()
    }

    /// Returns the kind under which this version declares `uri`, if any.
    pub fn declares(&self, uri: &str) -> Option<NamespaceKind> {
        self.0
            .descriptor
            .namespaces
            .iter()
            .find(|(_, candidate)| candidate.as_str() == uri)
            .map(|(kind, _)| *kind)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = (NamespaceKind, &str)> {
        self.0
            .descriptor
            .namespaces
            .iter()
            .map(|(kind, uri)| (*kind, uri.as_str()))
    }

    pub fn schema_location(&self) -> &str {
        &self.0.descriptor.schema_location
    }

    pub fn ism_des_version(&self) -> Option<&str> {
        self.0.descriptor.ism_des_version.as_deref()
    }

    pub fn descriptor(&self) -> &VersionDescriptor {
        &self.0.descriptor
    }

    /// Compares registration order with another version of the same registry.
    pub fn is_at_least(&self, other: &Version) -> bool {
        self.position() >= other.position()
    }

    /// Version gate against a token of the built-in registry.
    pub fn at_least(&self, token: &str) -> Result<bool> {
        VersionRegistry::global().is_at_least(self, token)
    }

    /// True when this version lies in `[since, before)`. Missing bounds are open.
    pub fn in_window(&self, since: Option<&str>, before: Option<&str>) -> bool {
        let after_start = since.is_none_or(|token| self.at_least(token).unwrap_or(false));
        let before_end = before.is_none_or(|token| !self.at_least(token).unwrap_or(true));
        after_start && before_end
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.position() == other.position() && self.token() == other.token()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token().hash(state);
        self.position().hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Resolves tokens and namespace URIs to registered versions.
#[derive(Debug, Clone, Default)]
pub struct VersionRegistry {
    versions: Vec<Version>,
    aliases: HashMap<String, String>,
}

static GLOBAL_REGISTRY: OnceLock<VersionRegistry> = OnceLock::new();

const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
const GML_32_NAMESPACE: &str = "http://www.opengis.net/gml/3.2";
const ISM_NAMESPACE: &str = "urn:us:gov:ic:ism";
const NTK_NAMESPACE: &str = "urn:us:gov:ic:ntk";
const VIRT_NAMESPACE: &str = "urn:us:gov:ic:virt";

impl VersionRegistry {
    /// A registry with no versions and no aliases.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The registry of every DDMS release this crate understands.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        let descriptors = [
            VersionDescriptor::new("2.0", "http://metadata.dod.mil/mdr/ns/DDMS/2.0/")
                .with_namespace(NamespaceKind::Gml, "http://www.opengis.net/gml")
                .with_namespace(NamespaceKind::Ism, "urn:us:gov:ic:ism:v2")
                .with_namespace(NamespaceKind::Xlink, XLINK_NAMESPACE),
            VersionDescriptor::new("3.0", "http://metadata.dod.mil/mdr/ns/DDMS/3.0/")
                .with_namespace(NamespaceKind::Gml, GML_32_NAMESPACE)
                .with_namespace(NamespaceKind::Ism, ISM_NAMESPACE)
                .with_namespace(NamespaceKind::Xlink, XLINK_NAMESPACE)
                .with_ism_des_version("2"),
            VersionDescriptor::new("3.1", "http://metadata.dod.mil/mdr/ns/DDMS/3.1/")
                .with_namespace(NamespaceKind::Gml, GML_32_NAMESPACE)
                .with_namespace(NamespaceKind::Ism, ISM_NAMESPACE)
                .with_namespace(NamespaceKind::Xlink, XLINK_NAMESPACE)
                .with_ism_des_version("5"),
            VersionDescriptor::new("4.0.1", "urn:us:mil:ces:metadata:ddms:4")
                .with_namespace(NamespaceKind::Gml, GML_32_NAMESPACE)
                .with_namespace(NamespaceKind::Ism, ISM_NAMESPACE)
                .with_namespace(NamespaceKind::Ntk, NTK_NAMESPACE)
                .with_namespace(NamespaceKind::Virt, VIRT_NAMESPACE)
                .with_namespace(NamespaceKind::Xlink, XLINK_NAMESPACE)
                .with_ism_des_version("7"),
            VersionDescriptor::new("4.1", "urn:us:mil:ces:metadata:ddms:4")
                .with_namespace(NamespaceKind::Gml, GML_32_NAMESPACE)
                .with_namespace(NamespaceKind::Ism, ISM_NAMESPACE)
                .with_namespace(NamespaceKind::Ntk, NTK_NAMESPACE)
                .with_namespace(NamespaceKind::Virt, VIRT_NAMESPACE)
                .with_namespace(NamespaceKind::Xlink, XLINK_NAMESPACE)
                .with_ism_des_version("9"),
            VersionDescriptor::new("5.0", "urn:us:mil:ces:metadata:ddms:5")
                .with_namespace(NamespaceKind::Gml, GML_32_NAMESPACE)
                .with_namespace(NamespaceKind::Ism, ISM_NAMESPACE)
                .with_namespace(NamespaceKind::Ntk, NTK_NAMESPACE)
                .with_namespace(NamespaceKind::Virt, VIRT_NAMESPACE)
                .with_namespace(
                    NamespaceKind::Tspi,
                    "http://metadata.ces.mil/mdr/ns/GSIP/tspi/2.0",
                )
                .with_namespace(NamespaceKind::Xlink, XLINK_NAMESPACE)
                .with_ism_des_version("13"),
        ];
        for descriptor in descriptors {
            // Tokens above are distinct, so registration cannot fail.
            let _ = registry.register(descriptor);
        }
        registry.alias("3.0.1", "3.0");
        registry.alias("4.0", "4.0.1");
        registry
    }

    /// The process-wide built-in registry. Read-only.
    pub fn global() -> &'static VersionRegistry {
        GLOBAL_REGISTRY.get_or_init(Self::builtin)
    }

    /// Appends a version after every version registered so far.
    pub fn register(&mut self, descriptor: VersionDescriptor) -> Result<Version> {
        if self.versions.iter().any(|v| v.token() == descriptor.token) {
            return Err(DdmsError::DuplicateVersion(descriptor.token));
        }
        let version = Version(Arc::new(VersionInner {
            position: self.versions.len(),
            descriptor,
        }));
        debug!(
            "Registered DDMS version {} at position {}",
            version.token(),
            version.position()
        );
        self.versions.push(version.clone());
        Ok(version)
    }

    /// Declares `alias` as a syntactically identical spelling of `canonical`.
    pub fn alias(&mut self, alias: impl Into<String>, canonical: impl Into<String>) {
        self.aliases.insert(alias.into(), canonical.into());
    }

    /// Applies the alias table to a token.
    pub fn canonical_token<'a>(&'a self, token: &'a str) -> &'a str {
        self.aliases.get(token).map(String::as_str).unwrap_or(token)
    }

    pub fn resolve(&self, token: &str) -> Result<Version> {
        let canonical = self.canonical_token(token.trim());
        self.versions
            .iter()
            .find(|v| v.token() == canonical)
            .cloned()
            .ok_or_else(|| DdmsError::UnsupportedVersion(token.to_string()))
    }

    /// Finds the newest version declaring `uri` under any namespace kind.
    pub fn resolve_for_namespace(&self, uri: &str) -> Result<Version> {
        let found = self
            .versions
            .iter()
            .rev()
            .find(|v| v.declares(uri).is_some())
            .cloned();
        match found {
            Some(version) => {
                debug!("Namespace {} resolved to DDMS {}", uri, version);
                Ok(version)
            }
            None => Err(DdmsError::UnsupportedVersion(uri.to_string())),
        }
    }

    pub fn is_at_least(&self, version: &Version, token: &str) -> Result<bool> {
        let other = self.resolve(token)?;
        Ok(version.position() >= other.position())
    }

    pub fn supported_versions(&self) -> Vec<&str> {
        self.versions.iter().map(Version::token).collect()
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn is_supported(&self, token: &str) -> bool {
        self.resolve(token).is_ok()
    }
}
