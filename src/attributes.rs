//! Attribute groups
//!
//! ISM security markings, ISM notice markings and the resource-level
//! attributes are not components of their own: they decorate the element that
//! owns them. Their messages therefore carry no locator segment of their own and
//! take the owner's location.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::window_message;
use crate::element::Element;
use crate::error::{DdmsError, Result};
use crate::format::ValueFormat;
use crate::message::ValidationMessage;
use crate::version::{NamespaceKind, Version};
use crate::vocabulary::{keys, Vocabularies};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Security,
    Notice,
    Resource,
}

/// One attribute an attribute group may carry.
#[derive(Debug, Clone, Copy)]
pub struct GroupAttributeRule {
    pub namespace: NamespaceKind,
    pub name: &'static str,
    pub format: ValueFormat,
    /// Required whenever the group itself is required.
    pub required: bool,
    pub since: Option<&'static str>,
    pub before: Option<&'static str>,
}

impl GroupAttributeRule {
    const fn new(namespace: NamespaceKind, name: &'static str, format: ValueFormat) -> Self {
        Self {
            namespace,
            name,
            format,
            required: false,
            since: None,
            before: None,
        }
    }

    const fn ism(name: &'static str, format: ValueFormat) -> Self {
        Self::new(NamespaceKind::Ism, name, format)
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn since(mut self, token: &'static str) -> Self {
        self.since = Some(token);
        self
    }

    const fn before(mut self, token: &'static str) -> Self {
        self.before = Some(token);
        self
    }

    /// Key under which the value is stored, e.g. `ism:classification`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.name)
    }

    pub fn is_list(&self) -> bool {
        matches!(self.format, ValueFormat::VocabularyList(_))
    }
}

const SECURITY_RULES: &[GroupAttributeRule] = &[
    GroupAttributeRule::ism("classification", ValueFormat::Vocabulary(keys::CLASSIFICATIONS)).required(),
    GroupAttributeRule::ism("ownerProducer", ValueFormat::VocabularyList(keys::OWNER_PRODUCERS)).required(),
    GroupAttributeRule::ism("SCIcontrols", ValueFormat::VocabularyList(keys::SCI_CONTROLS)),
    GroupAttributeRule::ism("SARIdentifier", ValueFormat::VocabularyList(keys::SAR_IDENTIFIERS)),
    GroupAttributeRule::ism("atomicEnergyMarkings", ValueFormat::VocabularyList(keys::ATOMIC_ENERGY_MARKINGS)).since("4.1"),
    GroupAttributeRule::ism("disseminationControls", ValueFormat::VocabularyList(keys::DISSEMINATION_CONTROLS)),
    GroupAttributeRule::ism("displayOnlyTo", ValueFormat::VocabularyList(keys::DISPLAY_ONLY_TO)).since("4.1"),
    GroupAttributeRule::ism("FGIsourceOpen", ValueFormat::VocabularyList(keys::FGI_SOURCE_OPEN)),
    GroupAttributeRule::ism("FGIsourceProtected", ValueFormat::VocabularyList(keys::FGI_SOURCE_PROTECTED)),
    GroupAttributeRule::ism("releasableTo", ValueFormat::VocabularyList(keys::RELEASABLE_TO)),
    GroupAttributeRule::ism("nonICmarkings", ValueFormat::VocabularyList(keys::NON_IC_MARKINGS)),
    GroupAttributeRule::ism("nonUSControls", ValueFormat::VocabularyList(keys::NON_US_CONTROLS)).since("3.1"),
    GroupAttributeRule::ism("classifiedBy", ValueFormat::Text),
    GroupAttributeRule::ism("compilationReason", ValueFormat::Text).since("3.0"),
    GroupAttributeRule::ism("derivativelyClassifiedBy", ValueFormat::Text),
    GroupAttributeRule::ism("classificationReason", ValueFormat::Text),
    GroupAttributeRule::ism("derivedFrom", ValueFormat::Text),
    GroupAttributeRule::ism("declassDate", ValueFormat::Date),
    GroupAttributeRule::ism("declassEvent", ValueFormat::Text),
    GroupAttributeRule::ism("declassException", ValueFormat::VocabularyList(keys::DECLASS_EXEMPTIONS)).before("5.0"),
    GroupAttributeRule::ism("declassManualReview", ValueFormat::Boolean).before("3.0"),
    GroupAttributeRule::ism("typeOfExemptedSource", ValueFormat::VocabularyList(keys::TYPES_OF_EXEMPTED_SOURCE)).before("3.1"),
    GroupAttributeRule::ism("dateOfExemptedSource", ValueFormat::Date).before("3.1"),
    GroupAttributeRule::ism("compliesWith", ValueFormat::VocabularyList(keys::COMPLIES_WITH)).since("3.1"),
    GroupAttributeRule::ism("exemptFrom", ValueFormat::VocabularyList(keys::EXEMPT_FROM)).since("4.1"),
];

const NOTICE_RULES: &[GroupAttributeRule] = &[
    GroupAttributeRule::ism("noticeType", ValueFormat::Vocabulary(keys::NOTICE_TYPES)).since("4.0.1"),
    GroupAttributeRule::ism("noticeReason", ValueFormat::Text).since("4.0.1"),
    GroupAttributeRule::ism("noticeDate", ValueFormat::Date).since("4.0.1"),
    GroupAttributeRule::ism("unregisteredNoticeType", ValueFormat::Text).since("4.0.1"),
    GroupAttributeRule::ism("externalNotice", ValueFormat::Boolean).since("4.1"),
];

const RESOURCE_RULES: &[GroupAttributeRule] = &[
    GroupAttributeRule::ism("resourceElement", ValueFormat::Boolean).required(),
    GroupAttributeRule::ism("createDate", ValueFormat::Date).required(),
    GroupAttributeRule::ism("DESVersion", ValueFormat::PositiveInteger).required(),
    GroupAttributeRule::new(NamespaceKind::Ntk, "DESVersion", ValueFormat::PositiveInteger).since("4.0.1"),
];

impl GroupKind {
    pub fn rules(self) -> &'static [GroupAttributeRule] {
        match self {
            GroupKind::Security => SECURITY_RULES,
            GroupKind::Notice => NOTICE_RULES,
            GroupKind::Resource => RESOURCE_RULES,
        }
    }

    pub fn rule(self, key: &str) -> Option<&'static GroupAttributeRule> {
        self.rules().iter().find(|rule| rule.key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupKind::Security => "security attributes",
            GroupKind::Notice => "notice attributes",
            GroupKind::Resource => "resource attributes",
        }
    }
}

/// The attribute values of one group, keyed by qualified name (`ism:classification`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeGroup {
    kind: GroupKind,
    values: BTreeMap<String, String>,
}

impl AttributeGroup {
    pub fn new(kind: GroupKind) -> Self {
        Self {
            kind,
            values: BTreeMap::new(),
        }
    }

    /// Security attributes with just the two markings most elements need.
    pub fn security(classification: &str, owner_producers: &[&str]) -> Self {
        Self::new(GroupKind::Security)
            .with("ism:classification", classification)
            .with("ism:ownerProducer", owner_producers.join(" "))
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Stores a value. Blank values are dropped so that they read as absent.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.values.remove(key);
        } else {
            self.values.insert(key.to_string(), value.trim().to_string());
        }
    }

    /// Collects this group's attributes from an element.
    pub fn from_element(kind: GroupKind, element: &Element, version: &Version) -> Self {
        let mut group = Self::new(kind);
        for rule in kind.rules() {
            let Some(namespace) = version.namespace(rule.namespace) else {
                continue;
            };
            if let Some(value) = element.attribute(Some(namespace), rule.name) {
                group.insert(&rule.key(), value);
            }
        }
        group
    }

    /// Writes this group's attributes onto an element.
    pub fn apply_to(&self, element: &mut Element, version: &Version) -> Result<()> {
        for (key, value) in &self.values {
            let rule = self.rule_for(key)?;
            let namespace = version.namespace(rule.namespace).ok_or_else(|| {
                DdmsError::unlocated(format!(
                    "The {} attribute cannot be used in DDMS {}.",
                    key, version
                ))
            })?;
            element.set_attribute(
                Some(rule.namespace.prefix()),
                Some(namespace),
                rule.name,
                value.clone(),
            );
        }
        Ok(())
    }

    fn rule_for(&self, key: &str) -> Result<&'static GroupAttributeRule> {
        self.kind.rule(key).ok_or_else(|| {
            DdmsError::unlocated(format!("{} is not one of the {}.", key, self.kind.label()))
        })
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Splits a list-valued attribute into its tokens.
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn classification(&self) -> Option<&str> {
        self.get("ism:classification")
    }

    pub fn owner_producers(&self) -> Vec<&str> {
        self.get_list("ism:ownerProducer")
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks every value, and the required ones when `required` is set.
    pub fn validate(&self, version: &Version, vocabularies: &Vocabularies, required: bool) -> Result<()> {
        for (key, value) in &self.values {
            let rule = self.rule_for(key)?;
            if !version.in_window(rule.since, rule.before) {
                return Err(DdmsError::unlocated(window_message(
                    &format!("{} attribute", key),
                    rule.since,
                    rule.before,
                    version,
                )));
            }
            rule.format.check(value, key, version, vocabularies)?;
        }
        if required {
            for rule in self.kind.rules().iter().filter(|rule| rule.required) {
                if !self.values.contains_key(&rule.key()) {
                    return Err(DdmsError::unlocated(format!("{} is required.", rule.key())));
                }
            }
        }
        if self.kind == GroupKind::Notice
            && self.get("ism:noticeType").is_some()
            && self.get("ism:unregisteredNoticeType").is_some()
        {
            return Err(DdmsError::unlocated(
                "Only one of ism:noticeType and ism:unregisteredNoticeType may be set.",
            ));
        }
        Ok(())
    }

    /// Warnings for this group, with empty locators.
    pub fn warnings(&self, version: &Version) -> Vec<ValidationMessage> {
        let mut warnings = Vec::new();
        if self.get("ism:dateOfExemptedSource").is_some() && version.at_least("3.0").unwrap_or(false) {
            warnings.push(ValidationMessage::warning(
                "ism:dateOfExemptedSource is deprecated as of DDMS 3.0.",
                "",
            ));
        }
        if let (Some(declared), Some(bundled)) = (self.get("ism:DESVersion"), version.ism_des_version()) {
            if declared != bundled {
                warnings.push(ValidationMessage::warning(
                    format!(
                        "The ism:DESVersion is {}, but DDMS {} is bundled with ISM DES version {}.",
                        declared, version, bundled
                    ),
                    "",
                ));
            }
        }
        warnings
    }

    /// Name/value pairs for rendering, named `<prefix>.<attribute>`.
    pub fn output_entries(&self, prefix: &str) -> Vec<(String, String)> {
        self.kind
            .rules()
            .iter()
            .filter_map(|rule| {
                let value = self.get(&rule.key())?;
                let name = match rule.namespace {
                    NamespaceKind::Ism => rule.name.to_string(),
                    other => format!("{}{}", other.prefix(), rule.name),
                };
                Some((join_path(prefix, &name), value.to_string()))
            })
            .collect()
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}
