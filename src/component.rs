//! Component envelope and validation framework
//!
//! A [`Component`] wraps exactly one [`Element`] of a known [`ComponentKind`]
//! together with the version it was validated against, its nested components
//! and its attribute groups. Components come into existence in one of two
//! ways:
//!
//! * parsing: an existing element is wrapped, its children are parsed into
//!   nested components, and the whole is validated;
//! * synthesis: a fresh element is built from [`ComponentFields`] for the
//!   session's version, then validated.
//!
//! Either way, validation completes before the value is returned, so a
//! `Component` in hand is always valid. Warnings are computed once, after
//! validation succeeds, and are re-homed under each enclosing element as they
//! propagate upward.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::attributes::{join_path, AttributeGroup, GroupKind};
use crate::element::Element;
use crate::error::{DdmsError, Result};
use crate::kind::{ComponentKind, ContentRule, GroupRule, KindDescriptor, TextRule};
use crate::message::ValidationMessage;
use crate::rules;
use crate::session::Session;
use crate::version::{NamespaceKind, Version, VersionRegistry};
use crate::vocabulary::Vocabularies;

/// Explicit values for synthesising a component.
///
/// Attribute keys are `name` for unqualified attributes and `prefix:name`
/// otherwise (`ddms:order`, `virt:network`, `xlink:href`). Field values are
/// text-valued child elements such as a person's `surname`; they are written
/// in schema order regardless of the order given here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentFields {
    pub text: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub fields: Vec<(String, String)>,
    pub children: Vec<Component>,
    pub security: Option<AttributeGroup>,
    pub notice: Option<AttributeGroup>,
}

impl ComponentFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_string(), value.into()));
        self
    }

    pub fn child(mut self, child: Component) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Component>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn security(mut self, group: AttributeGroup) -> Self {
        self.security = Some(group);
        self
    }

    pub fn notice(mut self, group: AttributeGroup) -> Self {
        self.notice = Some(group);
        self
    }
}

/// A validated metadata element.
#[derive(Debug, Clone)]
pub struct Component {
    kind: ComponentKind,
    version: Version,
    element: Element,
    children: Vec<Component>,
    security: Option<AttributeGroup>,
    notice: Option<AttributeGroup>,
    warnings: Vec<ValidationMessage>,
}

impl Component {
    /// Synthesises a component of `kind` for the session's version.
    pub fn build(session: &Session, kind: ComponentKind, fields: ComponentFields) -> Result<Self> {
        let version = session.version().clone();
        let descriptor = kind.descriptor();
        let qualified_name = kind.to_string();
        if kind == ComponentKind::Extension {
            return Err(DdmsError::invalid(
                "Extensible elements are wrapped from an existing element.",
                &qualified_name,
            ));
        }
        let namespace = version.namespace(descriptor.namespace).ok_or_else(|| {
            DdmsError::invalid(
                format!("The {} element cannot be used in DDMS {}.", qualified_name, version),
                &qualified_name,
            )
        })?;

        let mut element = Element::new(descriptor.namespace.prefix(), descriptor.name, namespace);
        for (key, value) in &fields.attributes {
            if value.trim().is_empty() {
                continue;
            }
            let rule = descriptor.attribute(key).ok_or_else(|| {
                DdmsError::invalid(
                    format!("{} is not a valid attribute of {}.", key, qualified_name),
                    &qualified_name,
                )
            })?;
            let attribute_namespace = match rule.namespace {
                None => None,
                Some(kind) => Some(version.namespace(kind).ok_or_else(|| {
                    DdmsError::invalid(
                        format!("The {} attribute cannot be used in DDMS {}.", key, version),
                        &qualified_name,
                    )
                })?),
            };
            element.set_attribute(
                rule.namespace.map(NamespaceKind::prefix),
                attribute_namespace,
                rule.name,
                value.trim(),
            );
        }
        for group in [&fields.security, &fields.notice].into_iter().flatten() {
            group
                .apply_to(&mut element, &version)
                .map_err(|e| e.within(&qualified_name))?;
        }

        for (name, _) in &fields.fields {
            if descriptor.field(name).is_none() {
                return Err(DdmsError::invalid(
                    format!("{} is not a valid child of {}.", name, qualified_name),
                    &qualified_name,
                ));
            }
        }
        for child in &fields.children {
            if descriptor.child_rule(child.kind).is_none() {
                return Err(DdmsError::invalid(
                    format!("{} is not a valid child of {}.", child.kind, qualified_name),
                    &qualified_name,
                ));
            }
        }

        let mut remaining = fields.children;
        let mut children = Vec::with_capacity(remaining.len());
        for rule in descriptor.content {
            match rule {
                ContentRule::Field(field) => {
                    for (_, value) in fields.fields.iter().filter(|(name, _)| name == field.name) {
                        element.push_element(
                            Element::new(descriptor.namespace.prefix(), field.name, namespace)
                                .with_text(value.trim()),
                        );
                    }
                }
                ContentRule::Child(rule) => {
                    let (matching, rest): (Vec<_>, Vec<_>) =
                        remaining.into_iter().partition(|c| rule.kinds.contains(&c.kind));
                    remaining = rest;
                    for child in matching {
                        element.push_element(child.element.clone());
                        children.push(child);
                    }
                }
            }
        }
        if let Some(text) = fields.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            element.push_text(text);
        }

        Self {
            kind,
            version,
            element,
            children,
            security: fields.security.filter(|g| !g.is_empty()),
            notice: fields.notice.filter(|g| !g.is_empty()),
            warnings: Vec::new(),
        }
        .finish(session.vocabularies())
    }

    /// Wraps a parsed element, resolving its version from its namespace.
    ///
    /// The session's version is used when it declares the element's
    /// namespace; otherwise the newest version declaring it is chosen.
    pub fn from_element(session: &Session, element: Element) -> Result<Self> {
        let version = if session.version().declares(&element.namespace).is_some() {
            session.version().clone()
        } else {
            VersionRegistry::global().resolve_for_namespace(&element.namespace)?
        };
        let kind = identify(&version, &element)?;
        Self::wrap(session, version, kind, element)?.finish(session.vocabularies())
    }

    /// Wraps a foreign-namespace element carried inside a record.
    pub fn extension(session: &Session, element: Element) -> Result<Self> {
        Self {
            kind: ComponentKind::Extension,
            version: session.version().clone(),
            element,
            children: Vec::new(),
            security: None,
            notice: None,
            warnings: Vec::new(),
        }
        .finish(session.vocabularies())
    }

    /// Parses a nested element for a parent of `parent_version`. Elements in a
    /// namespace the parent declares share its version; anything else is
    /// resolved through the registry, so a mismatch is reported by the parent.
    pub(crate) fn parse_child(session: &Session, parent_version: &Version, element: Element) -> Result<Self> {
        let version = if parent_version.declares(&element.namespace).is_some() {
            parent_version.clone()
        } else {
            VersionRegistry::global()
                .resolve_for_namespace(&element.namespace)
                .map_err(|_| unexpected(&element))?
        };
        let kind = identify(&version, &element)?;
        Self::wrap(session, version, kind, element)?.finish(session.vocabularies())
    }

    /// First step of parsing: splits the element into fields, nested
    /// components and attribute groups, without validating this level.
    fn wrap(session: &Session, version: Version, kind: ComponentKind, element: Element) -> Result<Self> {
        let descriptor = kind.descriptor();
        let qualified_name = element.qualified_name();
        let mut children = Vec::new();
        for child in element.child_elements() {
            if child.namespace == element.namespace && descriptor.field(&child.name).is_some() {
                continue;
            }
            let component = Self::parse_child(session, &version, child.clone())
                .map_err(|e| e.within(&qualified_name))?;
            if descriptor.child_rule(component.kind).is_none() {
                return Err(DdmsError::invalid(
                    format!("{} is not a valid child of {}.", component.qualified_name(), qualified_name),
                    &qualified_name,
                ));
            }
            children.push(component);
        }

        let group = |kind: GroupKind| Some(AttributeGroup::from_element(kind, &element, &version)).filter(|g| !g.is_empty());
        let security = group(GroupKind::Security);
        let notice = group(GroupKind::Notice);
        Ok(Self {
            kind,
            version,
            element,
            children,
            security,
            notice,
            warnings: Vec::new(),
        })
    }

    /// Second step: validates this level, then computes warnings.
    fn finish(mut self, vocabularies: &Vocabularies) -> Result<Self> {
        let qualified_name = self.qualified_name();
        self.validate(vocabularies).map_err(|e| e.within(&qualified_name))?;
        self.warnings = self.collect_warnings();
        Ok(self)
    }

    /// Element-local checks followed by the nested version check. Errors are
    /// unlocated; `finish` adds this element's locator.
    fn validate(&self, vocabularies: &Vocabularies) -> Result<()> {
        if self.kind == ComponentKind::Extension {
            return rules::validate(self);
        }
        let descriptor = self.descriptor();
        let version = &self.version;
        let qualified_name = self.qualified_name();

        if !descriptor.exists_in(version) {
            return Err(DdmsError::unlocated(window_message(
                &format!("{} element", qualified_name),
                descriptor.since,
                descriptor.before,
                version,
            )));
        }
        if version.declares(&self.element.namespace) != Some(descriptor.namespace) || self.element.name != descriptor.name {
            return Err(DdmsError::unlocated(format!(
                "Unexpected namespace URI and local name encountered: {}",
                qualified_name
            )));
        }

        for rule in descriptor.attributes {
            let key = rule.key();
            let value = self.attribute(&key);
            if !version.in_window(rule.since, rule.before) {
                if value.is_some() {
                    return Err(DdmsError::unlocated(window_message(
                        &format!("{} attribute", key),
                        rule.since,
                        rule.before,
                        version,
                    )));
                }
                continue;
            }
            match value {
                Some(value) => rule.format.check(value, &key, version, vocabularies)?,
                None if rule.required => {
                    return Err(DdmsError::unlocated(format!("{} is required.", key)));
                }
                None => {}
            }
        }

        let text = self.text();
        match descriptor.text {
            TextRule::Required(_) if text.is_empty() => {
                return Err(DdmsError::unlocated(format!("A value is required for {}.", qualified_name)));
            }
            TextRule::Required(format) | TextRule::Optional(format) if !text.is_empty() => {
                format.check(&text, &qualified_name, version, vocabularies)?;
            }
            TextRule::None if !text.is_empty() => {
                return Err(DdmsError::unlocated(format!("{} must not contain text.", qualified_name)));
            }
            _ => {}
        }

        for rule in descriptor.content {
            match rule {
                ContentRule::Field(field) => {
                    let field_name = format!("{}:{}", self.prefix(), field.name);
                    let values = self.fields(field.name);
                    let filled: Vec<&String> = values.iter().filter(|v| !v.is_empty()).collect();
                    check_cardinality(&field_name, filled.len(), values.len(), field.min, field.max)?;
                    for value in filled {
                        field.format.check(value, &field_name, version, vocabularies)?;
                    }
                }
                ContentRule::Child(child) => {
                    let count = self.children.iter().filter(|c| child.kinds.contains(&c.kind)).count();
                    let names: Vec<String> = child.kinds.iter().map(ToString::to_string).collect();
                    check_cardinality(&names.join(" or "), count, count, child.min, child.max)?;
                }
            }
        }

        self.validate_group(GroupKind::Security, descriptor.security, self.security.as_ref(), vocabularies)?;
        self.validate_group(GroupKind::Notice, descriptor.notice, self.notice.as_ref(), vocabularies)?;

        rules::validate(self)?;

        for child in &self.children {
            if child.version != self.version {
                return Err(DdmsError::unlocated(format!(
                    "A child component, {}, is using a different version of DDMS from its parent.",
                    child.qualified_name()
                )));
            }
        }
        Ok(())
    }

    fn validate_group(
        &self,
        kind: GroupKind,
        rule: GroupRule,
        group: Option<&AttributeGroup>,
        vocabularies: &Vocabularies,
    ) -> Result<()> {
        let required = rule.requires(&self.version);
        match group {
            Some(_) if !rule.allows() => Err(DdmsError::unlocated(format!(
                "The {} cannot be applied to {}.",
                kind.label(),
                self.qualified_name()
            ))),
            Some(group) => group.validate(&self.version, vocabularies, required),
            None if required => AttributeGroup::new(kind).validate(&self.version, vocabularies, true),
            None => Ok(()),
        }
    }

    /// Own warnings and attribute-group warnings take this element's locator;
    /// nested warnings are re-homed beneath it.
    fn collect_warnings(&self) -> Vec<ValidationMessage> {
        let qualified_name = self.qualified_name();
        let mut warnings = rules::warnings(self);
        for group in [&self.security, &self.notice].into_iter().flatten() {
            warnings.extend(group.warnings(&self.version));
        }
        for warning in &mut warnings {
            warning.prepend_locator(&qualified_name);
        }
        for child in &self.children {
            warnings.extend(child.warnings.iter().cloned().map(|w| w.within(&qualified_name)));
        }
        warnings
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn descriptor(&self) -> &'static KindDescriptor {
        self.kind.descriptor()
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn into_element(self) -> Element {
        self.element
    }

    pub fn name(&self) -> &str {
        &self.element.name
    }

    pub fn namespace(&self) -> &str {
        &self.element.namespace
    }

    pub fn prefix(&self) -> &str {
        &self.element.prefix
    }

    pub fn qualified_name(&self) -> String {
        self.element.qualified_name()
    }

    pub fn children(&self) -> &[Component] {
        &self.children
    }

    pub fn children_of(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    pub fn security(&self) -> Option<&AttributeGroup> {
        self.security.as_ref()
    }

    pub fn notice(&self) -> Option<&AttributeGroup> {
        self.notice.as_ref()
    }

    pub fn warnings(&self) -> &[ValidationMessage] {
        &self.warnings
    }

    /// A local attribute by key (`qualifier`, `ddms:order`). Blank values read as absent.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        let rule = self.descriptor().attribute(key)?;
        let namespace = match rule.namespace {
            None => None,
            Some(kind) => Some(self.version.namespace(kind)?),
        };
        self.element
            .attribute(namespace, rule.name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Trimmed text content.
    pub fn text(&self) -> String {
        self.element.text().trim().to_string()
    }

    /// The first value of a text field, if the field element exists.
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields(name).into_iter().next()
    }

    pub fn fields(&self, name: &str) -> Vec<String> {
        self.element
            .child_elements_named(&self.element.namespace, name)
            .map(|e| e.text().trim().to_string())
            .collect()
    }

    /// The `ddms:order` value, on the kinds that carry one.
    pub fn order(&self) -> Option<u64> {
        self.attribute("ddms:order")?.parse().ok()
    }

    /// Every `ddms:order` value in this subtree.
    pub fn orders(&self) -> Vec<u64> {
        let mut orders: Vec<u64> = self.order().into_iter().collect();
        for child in &self.children {
            orders.extend(child.orders());
        }
        orders
    }

    pub fn to_xml(&self) -> String {
        self.element.to_xml()
    }

    /// Name/value pairs for the HTML and text renderings, keyed by dotted path.
    pub fn output_entries(&self, prefix: &str) -> Vec<(String, String)> {
        if self.kind == ComponentKind::Extension {
            return vec![(join_path(prefix, "extensible"), self.qualified_name())];
        }
        let path = join_path(prefix, self.name());
        let mut entries = Vec::new();
        let text = self.text();
        if !text.is_empty() {
            entries.push((path.clone(), text));
        }
        for rule in self.descriptor().attributes {
            if let Some(value) = self.attribute(&rule.key()) {
                entries.push((join_path(&path, rule.name), value.to_string()));
            }
        }
        for rule in self.descriptor().content {
            match rule {
                ContentRule::Field(field) => {
                    for value in self.fields(field.name).into_iter().filter(|v| !v.is_empty()) {
                        entries.push((join_path(&path, field.name), value));
                    }
                }
                ContentRule::Child(child) => {
                    for component in self.children.iter().filter(|c| child.kinds.contains(&c.kind)) {
                        entries.extend(component.output_entries(&path));
                    }
                }
            }
        }
        for group in [&self.security, &self.notice].into_iter().flatten() {
            entries.extend(group.output_entries(&path));
        }
        entries
    }

    /// The values compared by structural equality, besides kind and nested components.
    fn local_values(&self) -> (Vec<Option<&str>>, String, Vec<Vec<String>>) {
        let descriptor = self.descriptor();
        let attributes = descriptor
            .attributes
            .iter()
            .map(|rule| self.attribute(&rule.key()))
            .collect();
        let fields = descriptor
            .content
            .iter()
            .filter_map(|rule| match rule {
                ContentRule::Field(field) => Some(self.fields(field.name)),
                ContentRule::Child(_) => None,
            })
            .collect();
        (attributes, self.text(), fields)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        if self.kind == ComponentKind::Extension {
            return self.element == other.element;
        }
        self.element.name == other.element.name
            && self.element.namespace == other.element.namespace
            && self.local_values() == other.local_values()
            && self.children == other.children
            && self.security == other.security
            && self.notice == other.notice
    }
}

impl Eq for Component {}

impl Hash for Component {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        if self.kind == ComponentKind::Extension {
            self.element.hash(state);
            return;
        }
        self.element.name.hash(state);
        self.element.namespace.hash(state);
        self.local_values().hash(state);
        self.children.hash(state);
        self.security.hash(state);
        self.notice.hash(state);
    }
}

/// Identifies the kind of an element under a version that declares its namespace.
fn identify(version: &Version, element: &Element) -> Result<ComponentKind> {
    version
        .declares(&element.namespace)
        .and_then(|namespace| ComponentKind::lookup(namespace, &element.name))
        .filter(|kind| *kind != ComponentKind::Extension)
        .ok_or_else(|| unexpected(element))
}

fn unexpected(element: &Element) -> DdmsError {
    let qualified_name = element.qualified_name();
    DdmsError::invalid(
        format!("Unexpected namespace URI and local name encountered: {}", qualified_name),
        &qualified_name,
    )
}

fn check_cardinality(name: &str, filled: usize, present: usize, min: usize, max: Option<usize>) -> Result<()> {
    if filled < min {
        let message = if max == Some(min) {
            format!("Exactly {} {} element must exist.", min, name)
        } else {
            format!("At least {} {} element must exist.", min, name)
        };
        return Err(DdmsError::unlocated(message));
    }
    if let Some(max) = max {
        if present > max {
            let message = if max == min {
                format!("Exactly {} {} element must exist.", max, name)
            } else {
                format!("No more than {} {} element can exist.", max, name)
            };
            return Err(DdmsError::unlocated(message));
        }
    }
    Ok(())
}

/// Message for an element or attribute used outside its version window.
pub(crate) fn window_message(
    subject: &str,
    since: Option<&str>,
    before: Option<&str>,
    version: &Version,
) -> String {
    match (since, before) {
        (Some(since), _) if !version.in_window(Some(since), None) => {
            format!("The {} must not be used until DDMS {} or later.", subject, since)
        }
        (_, Some(before)) => format!("The {} must not be used in DDMS {} or later.", subject, before),
        _ => format!("The {} cannot be used in DDMS {}.", subject, version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> Session {
        Session::for_token(token).unwrap()
    }

    fn title(session: &Session, text: &str) -> Result<Component> {
        Component::build(
            session,
            ComponentKind::Title,
            ComponentFields::new()
                .text(text)
                .security(AttributeGroup::security("U", &["USA"])),
        )
    }

    #[test]
    fn test_build_title() {
        let session = session("4.1");
        let component = title(&session, "DDMSence").unwrap();
        assert_eq!(component.qualified_name(), "ddms:title");
        assert_eq!(component.namespace(), "urn:us:mil:ces:metadata:ddms:4");
        assert_eq!(component.text(), "DDMSence");
        assert_eq!(component.security().unwrap().classification(), Some("U"));
        assert!(component.warnings().is_empty());
    }

    #[test]
    fn test_missing_text_is_located() {
        let error = title(&session("4.1"), " ").unwrap_err();
        assert_eq!(error.to_string(), "A value is required for ddms:title.");
        assert_eq!(error.locator(), Some("/ddms:title"));
    }

    #[test]
    fn test_security_group_errors_use_owner_locator() {
        let error = Component::build(
            &session("4.1"),
            ComponentKind::Title,
            ComponentFields::new()
                .text("DDMSence")
                .security(AttributeGroup::security("ZOO", &["USA"])),
        )
        .unwrap_err();
        assert!(error.to_string().contains("ZOO is not a valid enumeration token"));
        assert_eq!(error.locator(), Some("/ddms:title"));
    }

    #[test]
    fn test_parse_round_trip_is_equal() {
        let session = session("5.0");
        let built = title(&session, "DDMSence").unwrap();
        let parsed = Component::from_element(&session, built.element().clone()).unwrap();
        assert_eq!(parsed, built);
    }

    #[test]
    fn test_kinds_differ_even_with_same_content() {
        let session = session("4.1");
        let title = title(&session, "Same").unwrap();
        let subtitle = Component::build(
            &session,
            ComponentKind::Subtitle,
            ComponentFields::new()
                .text("Same")
                .security(AttributeGroup::security("U", &["USA"])),
        )
        .unwrap();
        assert_ne!(title, subtitle);
    }

    #[test]
    fn test_cardinality_message() {
        let error = Component::build(
            &session("4.1"),
            ComponentKind::Person,
            ComponentFields::new().field("name", "Brian"),
        )
        .unwrap_err();
        assert_eq!(error.to_string(), "Exactly 1 ddms:surname element must exist.");
        assert_eq!(error.locator(), Some("/ddms:person"));
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let error = Component::build(
            &session("4.1"),
            ComponentKind::Keyword,
            ComponentFields::new().attribute("colour", "red"),
        )
        .unwrap_err();
        assert!(error.to_string().contains("colour is not a valid attribute"));
    }

    #[test]
    fn test_window_message() {
        let v30 = VersionRegistry::global().resolve("3.0").unwrap();
        assert_eq!(
            window_message("ddms:nonStateActor element", Some("4.0.1"), None, &v30),
            "The ddms:nonStateActor element must not be used until DDMS 4.0.1 or later."
        );
        let v50 = VersionRegistry::global().resolve("5.0").unwrap();
        assert_eq!(
            window_message("ddms:security element", None, Some("5.0"), &v50),
            "The ddms:security element must not be used in DDMS 5.0 or later."
        );
    }
}
