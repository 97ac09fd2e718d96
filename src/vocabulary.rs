//! Controlled Vocabulary Engine
//!
//! Attribute values from the ISM and NTK families must be drawn from controlled
//! vocabularies. Each vocabulary has a symbolic key and, per DDMS version, a
//! token set made of literal tokens and regular-expression patterns (for token
//! families with structured suffixes such as `RD-SG-14`). Membership varies by
//! version, so every lookup goes through an explicit [`Version`].
//!
//! The built-in tables cover the vocabularies bundled with each release.
//! Additional definitions can be layered on from TOML files:
//!
//! ```toml
//! [[vocabulary]]
//! version = "4.1"
//! key = "owner-producers"
//! tokens = ["XYZ"]
//! patterns = ["ZZ[A-Z]"]
//! replace = false
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{DdmsError, Result};
use crate::version::{Version, VersionRegistry};

/// Symbolic keys of the built-in vocabularies.
pub mod keys {
    pub const CLASSIFICATIONS: &str = "classifications";
    pub const OWNER_PRODUCERS: &str = "owner-producers";
    pub const SCI_CONTROLS: &str = "sci-controls";
    pub const SAR_IDENTIFIERS: &str = "sar-identifiers";
    pub const DISSEMINATION_CONTROLS: &str = "dissemination-controls";
    pub const ATOMIC_ENERGY_MARKINGS: &str = "atomic-energy-markings";
    pub const FGI_SOURCE_OPEN: &str = "fgi-source-open";
    pub const FGI_SOURCE_PROTECTED: &str = "fgi-source-protected";
    pub const RELEASABLE_TO: &str = "releasable-to";
    pub const DISPLAY_ONLY_TO: &str = "display-only-to";
    pub const NON_IC_MARKINGS: &str = "non-ic-markings";
    pub const NON_US_CONTROLS: &str = "non-us-controls";
    pub const DECLASS_EXEMPTIONS: &str = "declass-exemptions";
    pub const TYPES_OF_EXEMPTED_SOURCE: &str = "types-of-exempted-source";
    pub const COMPLIES_WITH: &str = "complies-with";
    pub const EXEMPT_FROM: &str = "exempt-from";
    pub const NOTICE_TYPES: &str = "notice-types";
    pub const POC_TYPES: &str = "poc-types";
}

/// The permitted values of one vocabulary in one version.
#[derive(Debug, Clone, Default)]
pub struct TokenSet {
    tokens: BTreeSet<String>,
    patterns: Vec<Regex>,
}

impl TokenSet {
    /// Builds a token set. Patterns are anchored to the whole value.
    pub fn new<T, P>(tokens: T, patterns: P) -> Result<Self>
    where
        T: IntoIterator,
        T::Item: Into<String>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut set = Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            patterns: Vec::new(),
        };
        for pattern in patterns {
            set.add_pattern(pattern.as_ref())?;
        }
        Ok(set)
    }

    fn literal(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            patterns: Vec::new(),
        }
    }

    fn add_pattern(&mut self, pattern: &str) -> Result<()> {
        let anchored = format!("^(?:{})$", pattern);
        let regex = Regex::new(&anchored).map_err(|e| DdmsError::Vocabulary {
            details: format!("Invalid pattern '{}': {}", pattern, e),
        })?;
        self.patterns.push(regex);
        Ok(())
    }

    fn with_tokens(mut self, tokens: &[&str]) -> Self {
        self.tokens.extend(tokens.iter().map(|t| t.to_string()));
        self
    }

    fn without_tokens(mut self, tokens: &[&str]) -> Self {
        for token in tokens {
            self.tokens.remove(*token);
        }
        self
    }

    /// Literal membership first, then each pattern in order.
    pub fn contains(&self, value: &str) -> bool {
        self.tokens.contains(value) || self.patterns.iter().any(|p| p.is_match(value))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.as_str())
    }

    /// Merges another set into this one.
    pub fn extend(&mut self, other: TokenSet) {
        self.tokens.extend(other.tokens);
        self.patterns.extend(other.patterns);
    }
}

/// One entry of a vocabulary definition file.
#[derive(Debug, Clone, Deserialize)]
struct VocabularyEntry {
    version: String,
    key: String,
    #[serde(default)]
    tokens: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    replace: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct VocabularyFile {
    #[serde(default)]
    vocabulary: Vec<VocabularyEntry>,
}

/// Every vocabulary of every version, keyed by canonical version token then key.
#[derive(Debug, Clone, Default)]
pub struct Vocabularies {
    by_version: HashMap<String, HashMap<String, TokenSet>>,
}

static BUILTIN_VOCABULARIES: OnceLock<Arc<Vocabularies>> = OnceLock::new();

impl Vocabularies {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared, immutable built-in tables.
    pub fn builtin() -> Arc<Vocabularies> {
        BUILTIN_VOCABULARIES
            .get_or_init(|| Arc::new(builtin_tables()))
            .clone()
    }

    pub fn insert(&mut self, version_token: &str, key: &str, set: TokenSet) {
        self.by_version
            .entry(version_token.to_string())
            .or_default()
            .insert(key.to_string(), set);
    }

    /// Looks up the token set for `key` under `version`.
    pub fn token_set(&self, version: &Version, key: &str) -> Result<&TokenSet> {
        self.by_version
            .get(version.token())
            .and_then(|sets| sets.get(key))
            .ok_or_else(|| DdmsError::UnknownVocabulary {
                key: key.to_string(),
                version: version.token().to_string(),
            })
    }

    pub fn contains(&self, version: &Version, key: &str, value: &str) -> Result<bool> {
        Ok(self.token_set(version, key)?.contains(value))
    }

    /// Validates one value. An unknown key is reported as
    /// [`DdmsError::UnknownVocabulary`], never as an invalid value.
    pub fn validate(&self, version: &Version, key: &str, value: &str) -> Result<()> {
        if self.token_set(version, key)?.contains(value) {
            Ok(())
        } else {
            Err(DdmsError::unlocated(format!(
                "{} is not a valid enumeration token for this attribute, as specified in {}.",
                value, key
            )))
        }
    }

    /// Validates each whitespace-separated token of a list value.
    pub fn validate_list(&self, version: &Version, key: &str, values: &str) -> Result<()> {
        for value in values.split_whitespace() {
            self.validate(version, key, value)?;
        }
        Ok(())
    }

    pub fn keys(&self, version: &Version) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .by_version
            .get(version.token())
            .map(|sets| sets.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    /// Layers definitions from TOML text onto these tables.
    pub fn load_toml(&mut self, content: &str) -> Result<usize> {
        let file: VocabularyFile = toml::from_str(content).map_err(|e| DdmsError::Vocabulary {
            details: e.to_string(),
        })?;
        let registry = VersionRegistry::global();
        let count = file.vocabulary.len();
        for entry in file.vocabulary {
            let version = registry.resolve(&entry.version)?;
            let set = TokenSet::new(entry.tokens, entry.patterns)?;
            let sets = self
                .by_version
                .entry(version.token().to_string())
                .or_default();
            match sets.get_mut(&entry.key) {
                Some(existing) if !entry.replace => existing.extend(set),
                _ => {
                    sets.insert(entry.key.clone(), set);
                }
            }
            debug!("Loaded vocabulary {} for DDMS {}", entry.key, version);
        }
        Ok(count)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let count = self.load_toml(&content)?;
        info!(
            "Loaded {} vocabulary definitions from {}",
            count,
            path.display()
        );
        Ok(count)
    }
}

const US_CLASSIFICATIONS: &[&str] = &["U", "C", "S", "TS", "R"];
const NATO_CLASSIFICATIONS: &[&str] = &[
    "CTS", "CTS-B", "CTS-BALK", "NU", "NR", "NC", "NS", "CTSA", "NSAT", "NCA",
];
const COUNTRY_TRIGRAPH: &str = "[A-Z]{3}";
const TETRAGRAPHS: &[&str] = &[
    "ACGU", "APFS", "BWCS", "CFCK", "CMFC", "CMFP", "CPMT", "CWCS", "GCTF", "ISAF", "KFOR",
    "MCFI", "MIFH", "MLEC", "NACT", "NATO", "NFAK", "NFPC", "OSTY", "SFOR", "TEYE", "UNCK",
];
const SCI_CONTROLS: &[&str] = &["HCS", "KDK", "SI", "TK", "RSV", "EL", "BUR"];
const SCI_PATTERNS: &[&str] = &["SI-G-[A-Z]{4}", "SI-ECI-[A-Z]{3}", "HCS-[A-Z]", "TK-[A-Z]{3,4}"];
const SAR_PATTERN: &str = "SAR-[A-Z0-9]{2,3}";
const DISSEMINATION_CONTROLS: &[&str] = &[
    "FOUO", "OC", "IMC", "NF", "PR", "REL", "RELIDO", "RSEN", "EYES", "DSEN", "FISA",
];
const LEGACY_ATOMIC_ENERGY: &[&str] = &["RD", "FRD", "RD-CNWDI"];
const ATOMIC_ENERGY_MARKINGS: &[&str] = &["RD", "FRD", "CNWDI", "UCNI", "DCNI", "TFNI"];
const SIGMA_PATTERNS: &[&str] = &["RD-SG-[1-9][0-9]?", "FRD-SG-[1-9][0-9]?"];
const NON_IC_MARKINGS: &[&str] = &["DS", "XD", "ND", "SBU", "SBU-NF", "LES", "LES-NF", "SSI"];
const NON_US_CONTROLS: &[&str] = &["ATOMAL", "BOHEMIA", "BALK"];
const DECLASS_EXEMPTIONS: &[&str] = &[
    "25X1", "25X2", "25X3", "25X4", "25X5", "25X6", "25X7", "25X8", "25X9", "25X1-human",
    "50X1-HUM", "50X2-WMD",
];
const TYPES_OF_EXEMPTED_SOURCE: &[&str] = &["OADR", "X1", "X2", "X3", "X4", "X5", "X6", "X7", "X8"];
const NOTICE_TYPES: &[&str] = &[
    "FISA", "IMC", "CNWDI", "RD", "FRD", "DS", "LES", "LES-NF", "DSEN",
];
const DISTRIBUTION_STATEMENT_PATTERN: &str = "DoD-Dist-[A-FX]";

/// Builds the built-in tables. Differences between releases are applied as
/// edits on top of the previous release's set, mirroring how the ISM
/// vocabularies evolved.
fn builtin_tables() -> Vocabularies {
    let mut vocabularies = Vocabularies::empty();
    let registry = VersionRegistry::global();

    for version in registry.versions() {
        let token = version.token();
        let at_least = |other: &str| registry.is_at_least(version, other).unwrap_or(false);

        let mut classifications = TokenSet::literal(US_CLASSIFICATIONS).with_tokens(NATO_CLASSIFICATIONS);
        if at_least("5.0") {
            classifications = classifications.without_tokens(&["NSAT", "NCA"]);
        }

        let mut countries = TokenSet::literal(TETRAGRAPHS);
        countries.patterns.push(anchored(COUNTRY_TRIGRAPH));
        if at_least("3.1") {
            countries = countries.with_tokens(&["FVEY"]);
        }

        let mut sci = TokenSet::literal(SCI_CONTROLS);
        sci.patterns.extend(SCI_PATTERNS.iter().map(|p| anchored(p)));

        let mut sar = TokenSet::default();
        sar.patterns.push(anchored(SAR_PATTERN));

        let mut dissemination = TokenSet::literal(DISSEMINATION_CONTROLS);
        if !at_least("4.1") {
            // Atomic energy markings were part of dissemination controls until ISM v9.
            dissemination = dissemination.with_tokens(LEGACY_ATOMIC_ENERGY);
            dissemination
                .patterns
                .extend(SIGMA_PATTERNS.iter().map(|p| anchored(p)));
        }

        let mut non_ic = TokenSet::literal(NON_IC_MARKINGS);
        if at_least("4.0.1") {
            non_ic = non_ic.with_tokens(&["NNPI"]);
        }

        let sets = [
            (keys::CLASSIFICATIONS, classifications),
            (keys::OWNER_PRODUCERS, countries.clone()),
            (keys::FGI_SOURCE_OPEN, countries.clone()),
            (keys::FGI_SOURCE_PROTECTED, countries.clone()),
            (keys::RELEASABLE_TO, countries.clone()),
            (keys::SCI_CONTROLS, sci),
            (keys::SAR_IDENTIFIERS, sar),
            (keys::DISSEMINATION_CONTROLS, dissemination),
            (keys::NON_IC_MARKINGS, non_ic),
            (keys::TYPES_OF_EXEMPTED_SOURCE, TokenSet::literal(TYPES_OF_EXEMPTED_SOURCE)),
        ];
        for (key, set) in sets {
            vocabularies.insert(token, key, set);
        }

        if !at_least("5.0") {
            vocabularies.insert(
                token,
                keys::DECLASS_EXEMPTIONS,
                TokenSet::literal(DECLASS_EXEMPTIONS),
            );
        }
        if at_least("3.1") {
            let mut complies = TokenSet::literal(&["USGov", "USIC"]);
            if at_least("4.0.1") {
                complies = complies.with_tokens(&["USDOD", "OtherAuthority"]);
            }
            vocabularies.insert(token, keys::COMPLIES_WITH, complies);
            vocabularies.insert(token, keys::NON_US_CONTROLS, TokenSet::literal(NON_US_CONTROLS));
        }
        if at_least("4.0.1") {
            let mut notices = TokenSet::literal(NOTICE_TYPES);
            notices.patterns.push(anchored(DISTRIBUTION_STATEMENT_PATTERN));
            vocabularies.insert(token, keys::NOTICE_TYPES, notices);
        }
        if at_least("4.1") {
            let mut atomic = TokenSet::literal(ATOMIC_ENERGY_MARKINGS);
            atomic
                .patterns
                .extend(SIGMA_PATTERNS.iter().map(|p| anchored(p)));
            vocabularies.insert(token, keys::ATOMIC_ENERGY_MARKINGS, atomic);
            vocabularies.insert(token, keys::DISPLAY_ONLY_TO, countries.clone());
            vocabularies.insert(
                token,
                keys::EXEMPT_FROM,
                TokenSet::literal(&["IC_710_MANDATORY_FDR", "DOD_DISTRO_STATEMENT"]),
            );
            let mut poc = TokenSet::literal(&["ICD-710"]);
            poc.patterns.push(anchored(DISTRIBUTION_STATEMENT_PATTERN));
            vocabularies.insert(token, keys::POC_TYPES, poc);
        }
    }
    vocabularies
}

/// Compiles one of the constant patterns above.
fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{})$", pattern)).expect("Failed to compile built-in vocabulary pattern")
}
