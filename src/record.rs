//! Record aggregator
//!
//! A [`Record`] is the top-level `ddms:resource`. It accepts top-level
//! components in any order, files them into named slots, and rebuilds them in
//! schema order. Checks that no single component can make on its own live
//! here: slot cardinality, the presence of a producer, version-gated attribute
//! groups on the resource itself, and the `ddms:order` sequence shared by
//! geospatial coverages and the non-state actors inside subject coverages.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::attributes::{AttributeGroup, GroupKind};
use crate::component::Component;
use crate::element::Element;
use crate::error::{DdmsError, Result};
use crate::kind::ComponentKind;
use crate::message::ValidationMessage;
use crate::render;
use crate::session::Session;
use crate::version::{NamespaceKind, Version, VersionRegistry};
use crate::vocabulary::Vocabularies;

pub const RESOURCE_NAME: &str = "resource";
pub const RESOURCE_QNAME: &str = "ddms:resource";

/// Attribute groups carried directly on `ddms:resource`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct RecordAttributes {
    pub resource: Option<AttributeGroup>,
    pub security: Option<AttributeGroup>,
    pub notice: Option<AttributeGroup>,
}

impl RecordAttributes {
    pub fn from_element(element: &Element, version: &Version) -> Self {
        let group = |kind| Some(AttributeGroup::from_element(kind, element, version)).filter(|g| !g.is_empty());
        Self {
            resource: group(GroupKind::Resource),
            security: group(GroupKind::Security),
            notice: group(GroupKind::Notice),
        }
    }

    fn groups(&self) -> impl Iterator<Item = &AttributeGroup> {
        [&self.resource, &self.security, &self.notice].into_iter().flatten()
    }
}

/// Slots holding at most one component; a later component replaces an earlier one.
fn is_single_slot(kind: ComponentKind) -> bool {
    matches!(
        kind,
        ComponentKind::MetacardInfo
            | ComponentKind::Description
            | ComponentKind::Dates
            | ComponentKind::Rights
            | ComponentKind::Format
            | ComponentKind::ResourceManagement
            | ComponentKind::Security
    )
}

#[derive(Debug, Clone)]
pub struct Record {
    version: Version,
    element: Element,
    slots: BTreeMap<ComponentKind, Vec<Component>>,
    ordered: Vec<Component>,
    attributes: RecordAttributes,
    warnings: Vec<ValidationMessage>,
}

impl Record {
    /// Assembles a record for the session's version from top-level components
    /// given in any order.
    pub fn new(session: &Session, components: Vec<Component>, attributes: RecordAttributes) -> Result<Self> {
        let version = session.version().clone();
        let mut element = Element::new(
            NamespaceKind::Ddms.prefix(),
            RESOURCE_NAME,
            version.primary_namespace(),
        );
        for group in attributes.groups() {
            group
                .apply_to(&mut element, &version)
                .map_err(|e| e.within(RESOURCE_QNAME))?;
        }

        let mut inputs = components;
        inputs.sort_by_key(Component::kind);
        for component in &inputs {
            element.push_element(component.element().clone());
        }
        Self::assemble(session, version, element, inputs, attributes)
    }

    /// Wraps a parsed `ddms:resource` element.
    pub fn from_element(session: &Session, element: Element) -> Result<Self> {
        let registry = VersionRegistry::global();
        let version = if session.version().declares(&element.namespace).is_some() {
            session.version().clone()
        } else {
            registry
                .resolve_for_namespace(&element.namespace)
                .map_err(|_| unexpected_root(&element))?
        };
        if version.declares(&element.namespace) != Some(NamespaceKind::Ddms) || element.name != RESOURCE_NAME {
            return Err(unexpected_root(&element));
        }

        let scoped = session.with_version(version.clone());
        let mut components = Vec::new();
        for child in element.child_elements() {
            let is_ddms = registry
                .resolve_for_namespace(&child.namespace)
                .map(|v| v.declares(&child.namespace) == Some(NamespaceKind::Ddms))
                .unwrap_or(false);
            let component = if is_ddms {
                Component::parse_child(&scoped, &version, child.clone())
            } else {
                Component::extension(&scoped, child.clone())
            };
            components.push(component.map_err(|e| e.within(RESOURCE_QNAME))?);
        }
        let attributes = RecordAttributes::from_element(&element, &version);
        Self::assemble(&scoped, version, element, components, attributes)
    }

    fn assemble(
        session: &Session,
        version: Version,
        element: Element,
        inputs: Vec<Component>,
        attributes: RecordAttributes,
    ) -> Result<Self> {
        let mut counts: BTreeMap<ComponentKind, usize> = BTreeMap::new();
        for component in &inputs {
            *counts.entry(component.kind()).or_default() += 1;
        }

        let mut slots: BTreeMap<ComponentKind, Vec<Component>> = BTreeMap::new();
        let mut orders = Vec::new();
        let mut versions_match = Ok(());
        for component in inputs {
            if !component.kind().is_top_level() {
                return Err(DdmsError::invalid(
                    format!("{} cannot be a direct child of {}.", component.qualified_name(), RESOURCE_QNAME),
                    RESOURCE_QNAME,
                ));
            }
            if versions_match.is_ok() && component.version() != &version {
                versions_match = Err(component.qualified_name());
            }
            orders.extend(component.orders());
            let slot = slots.entry(component.kind()).or_default();
            if is_single_slot(component.kind()) {
                slot.clear();
            }
            slot.push(component);
        }
        let ordered: Vec<Component> = slots.values().flatten().cloned().collect();

        let mut record = Self {
            version,
            element,
            slots,
            ordered,
            attributes,
            warnings: Vec::new(),
        };
        record
            .validate(session.vocabularies(), &counts, orders, versions_match)
            .map_err(|e| e.within(RESOURCE_QNAME))?;
        record.warnings = record.collect_warnings();
        debug!(
            "Assembled DDMS {} record with {} components and {} warnings",
            record.version,
            record.ordered.len(),
            record.warnings.len()
        );
        Ok(record)
    }

    /// Whole-record checks. Errors are unlocated; the caller adds `/ddms:resource`.
    fn validate(
        &self,
        vocabularies: &Vocabularies,
        counts: &BTreeMap<ComponentKind, usize>,
        mut orders: Vec<u64>,
        versions_match: std::result::Result<(), String>,
    ) -> Result<()> {
        let version = &self.version;

        let in_marking_window = version.in_window(Some("3.0"), Some("5.0"));
        for (kind, group) in [
            (GroupKind::Resource, &self.attributes.resource),
            (GroupKind::Security, &self.attributes.security),
        ] {
            match group {
                Some(_) if !in_marking_window => {
                    return Err(DdmsError::unlocated(format!(
                        "The {} cannot be applied to {} in DDMS {}.",
                        kind.label(),
                        RESOURCE_QNAME,
                        version
                    )));
                }
                Some(group) => group.validate(version, vocabularies, true)?,
                None if in_marking_window => {
                    AttributeGroup::new(kind).validate(version, vocabularies, true)?;
                }
                None => {}
            }
        }
        if let Some(notice) = &self.attributes.notice {
            if !version.at_least("4.0.1").unwrap_or(false) {
                return Err(DdmsError::unlocated(format!(
                    "The notice attributes cannot be applied to {} until DDMS 4.0.1 or later.",
                    RESOURCE_QNAME
                )));
            }
            notice.validate(version, vocabularies, false)?;
        }

        for kind in ComponentKind::ALL.iter().copied().filter(|k| k.is_top_level()) {
            let (min, max) = self.bounds(kind);
            let count = counts.get(&kind).copied().unwrap_or(0);
            if count < min || max.is_some_and(|max| count > max) {
                return Err(DdmsError::unlocated(cardinality_message(kind, min, max, version)));
            }
        }

        let producers = self.ordered.iter().filter(|c| c.kind().is_producer()).count();
        if producers == 0 {
            return Err(DdmsError::unlocated(
                "At least 1 producer role (creator, publisher, contributor, or pointOfContact) must exist.",
            ));
        }

        orders.sort_unstable();
        let consecutive = orders.iter().enumerate().all(|(i, order)| *order == (i + 1) as u64);
        if !consecutive {
            return Err(DdmsError::unlocated(
                "The ddms:order attributes throughout this resource must form a complete, consecutive sequence starting at 1.",
            ));
        }

        if let Err(qualified_name) = versions_match {
            return Err(DdmsError::unlocated(format!(
                "A child component, {}, is using a different version of DDMS from its parent.",
                qualified_name
            )));
        }
        Ok(())
    }

    /// Cardinality of each top-level slot for this record's version.
    fn bounds(&self, kind: ComponentKind) -> (usize, Option<usize>) {
        let at_least = |token: &str| self.version.at_least(token).unwrap_or(false);
        match kind {
            ComponentKind::Identifier | ComponentKind::Title => (1, None),
            ComponentKind::Description | ComponentKind::Dates | ComponentKind::Rights | ComponentKind::Format => {
                (0, Some(1))
            }
            ComponentKind::SubjectCoverage if at_least("4.0.1") => (1, None),
            ComponentKind::SubjectCoverage => (1, Some(1)),
            ComponentKind::Security if at_least("5.0") => (0, Some(0)),
            ComponentKind::Security => (1, Some(1)),
            ComponentKind::MetacardInfo if at_least("5.0") => (1, Some(1)),
            ComponentKind::MetacardInfo => (0, Some(0)),
            ComponentKind::ResourceManagement if at_least("4.1") => (0, Some(1)),
            ComponentKind::ResourceManagement => (0, Some(0)),
            ComponentKind::Extension if !at_least("3.0") => (0, Some(1)),
            _ => (0, None),
        }
    }

    fn collect_warnings(&self) -> Vec<ValidationMessage> {
        let mut warnings: Vec<ValidationMessage> = self
            .attributes
            .groups()
            .flat_map(|group| group.warnings(&self.version))
            .map(|w| w.within(RESOURCE_QNAME))
            .collect();
        for component in &self.ordered {
            warnings.extend(component.warnings().iter().cloned().map(|w| w.within(RESOURCE_QNAME)));
        }
        warnings
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn attributes(&self) -> &RecordAttributes {
        &self.attributes
    }

    pub fn warnings(&self) -> &[ValidationMessage] {
        &self.warnings
    }

    /// Every present top-level component, in schema order.
    pub fn components(&self) -> &[Component] {
        &self.ordered
    }

    /// The components filed in one slot.
    pub fn components_of(&self, kind: ComponentKind) -> &[Component] {
        self.slots.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// The component of a single-valued slot.
    pub fn component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components_of(kind).last()
    }

    pub fn identifiers(&self) -> &[Component] {
        self.components_of(ComponentKind::Identifier)
    }

    pub fn titles(&self) -> &[Component] {
        self.components_of(ComponentKind::Title)
    }

    pub fn description(&self) -> Option<&Component> {
        self.component(ComponentKind::Description)
    }

    pub fn dates(&self) -> Option<&Component> {
        self.component(ComponentKind::Dates)
    }

    pub fn subject_coverages(&self) -> &[Component] {
        self.components_of(ComponentKind::SubjectCoverage)
    }

    pub fn geospatial_coverages(&self) -> &[Component] {
        self.components_of(ComponentKind::GeospatialCoverage)
    }

    pub fn security(&self) -> Option<&Component> {
        self.component(ComponentKind::Security)
    }

    pub fn metacard_info(&self) -> Option<&Component> {
        self.component(ComponentKind::MetacardInfo)
    }

    /// Creators, publishers, contributors and points of contact, in that order.
    pub fn producers(&self) -> impl Iterator<Item = &Component> {
        self.ordered.iter().filter(|c| c.kind().is_producer())
    }

    pub fn extensions(&self) -> &[Component] {
        self.components_of(ComponentKind::Extension)
    }

    pub fn to_xml(&self) -> String {
        self.element.to_xml()
    }

    /// Name/value pairs of the whole record, keyed by dotted path.
    pub fn output_entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![("ddms.version".to_string(), self.version.token().to_string())];
        for component in &self.ordered {
            entries.extend(component.output_entries(""));
        }
        for group in self.attributes.groups() {
            entries.extend(group.output_entries(RESOURCE_NAME));
        }
        entries
    }

    pub fn to_html(&self) -> String {
        render::to_html(&self.output_entries())
    }

    pub fn to_text(&self) -> String {
        render::to_text(&self.output_entries())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.ordered == other.ordered && self.attributes == other.attributes
    }
}

impl Eq for Record {}

fn unexpected_root(element: &Element) -> DdmsError {
    DdmsError::invalid(
        format!(
            "Unexpected namespace URI and local name encountered: {}",
            element.qualified_name()
        ),
        RESOURCE_QNAME,
    )
}

fn cardinality_message(kind: ComponentKind, min: usize, max: Option<usize>, version: &Version) -> String {
    match max {
        Some(0) => format!("The {} element must not be used in DDMS {}.", kind, version),
        Some(max) if max == min => format!("Exactly {} {} element must exist.", min, kind),
        Some(max) if min == 0 => format!("No more than {} {} element can exist.", max, kind),
        _ => format!("At least {} {} element must exist.", min, kind),
    }
}
