//! Kind-specific rules that a [`KindDescriptor`](crate::kind::KindDescriptor)
//! cannot express: constraints between values, range checks, and warnings.
//!
//! Errors and warnings produced here carry empty locators; the owning
//! component adds its own.

use std::collections::HashSet;

use crate::component::Component;
use crate::error::{DdmsError, Result};
use crate::kind::ComponentKind as K;
use crate::message::ValidationMessage;

/// Kind-specific error checks, run after the descriptor-driven checks pass.
pub(crate) fn validate(component: &Component) -> Result<()> {
    match component.kind() {
        K::Language | K::Type | K::Extent => require_qualifier_with_value(component)?,
        K::VirtualCoverage => {
            if component.attribute("address").is_some() && component.attribute("protocol").is_none() {
                return Err(DdmsError::unlocated(
                    "If an address is provided, the protocol is required and must not be empty.",
                ));
            }
        }
        K::SubjectCoverage => {
            let count = component.children_of(K::Keyword).count() + component.children_of(K::Category).count();
            if count == 0 {
                return Err(DdmsError::unlocated("At least 1 keyword or category must exist."));
            }
        }
        K::GeospatialCoverage => validate_geospatial_coverage(component)?,
        K::GeographicIdentifier => {
            let has_location = !component.fields("name").is_empty()
                || !component.fields("region").is_empty()
                || component.children_of(K::CountryCode).next().is_some();
            if !has_location {
                return Err(DdmsError::unlocated(
                    "At least 1 of name, region, or countryCode must be used.",
                ));
            }
        }
        K::BoundingBox => validate_bounding_box(component)?,
        K::Notice => {
            let notice = component.notice();
            let has_type = notice
                .map(|group| {
                    group.get("ism:noticeType").is_some() || group.get("ism:unregisteredNoticeType").is_some()
                })
                .unwrap_or(false);
            if !has_type {
                return Err(DdmsError::unlocated(
                    "One of ism:noticeType or ism:unregisteredNoticeType must be set.",
                ));
            }
        }
        K::Extension => {
            let version = component.version();
            if version.namespace(crate::version::NamespaceKind::Ddms) == Some(component.namespace()) {
                return Err(DdmsError::unlocated(
                    "Extensible elements cannot be defined in the DDMS namespace.",
                ));
            }
        }
        _ => {}
    }

    if component.kind() == K::Type
        && !component.text().is_empty()
        && !component.version().at_least("4.0.1").unwrap_or(false)
    {
        return Err(DdmsError::unlocated(
            "The ddms:type element must not have a description until DDMS 4.0.1 or later.",
        ));
    }
    Ok(())
}

fn require_qualifier_with_value(component: &Component) -> Result<()> {
    if component.attribute("value").is_some() && component.attribute("qualifier").is_none() {
        return Err(DdmsError::unlocated("A qualifier must exist when a value is provided."));
    }
    Ok(())
}

fn validate_geospatial_coverage(component: &Component) -> Result<()> {
    let locations = component.children_of(K::GeographicIdentifier).count()
        + component.children_of(K::BoundingBox).count();
    if locations != 1 {
        return Err(DdmsError::unlocated(
            "A ddms:geospatialCoverage must contain exactly 1 location component.",
        ));
    }
    if component.attribute("ddms:precedence").is_some() {
        let has_country_code = component
            .children_of(K::GeographicIdentifier)
            .any(|identifier| identifier.children_of(K::CountryCode).next().is_some());
        if !has_country_code {
            return Err(DdmsError::unlocated(
                "The ddms:precedence attribute must only be applied to a geospatialCoverage containing a country code.",
            ));
        }
    }
    Ok(())
}

fn validate_bounding_box(component: &Component) -> Result<()> {
    let bounds = [
        ("westBL", "longitude", 180.0),
        ("eastBL", "longitude", 180.0),
        ("southBL", "latitude", 90.0),
        ("northBL", "latitude", 90.0),
    ];
    for (name, axis, limit) in bounds {
        let Some(value) = component.field(name) else {
            continue;
        };
        let degrees: f64 = value
            .parse()
            .map_err(|_| DdmsError::unlocated(format!("The {} must be a decimal number.", name)))?;
        if !(-limit..=limit).contains(&degrees) {
            return Err(DdmsError::unlocated(format!(
                "A {} value must be between -{} and {} degrees: {}",
                axis, limit, limit, value
            )));
        }
    }
    Ok(())
}

/// Warnings local to one component, with empty locators.
pub(crate) fn warnings(component: &Component) -> Vec<ValidationMessage> {
    let mut warnings = Vec::new();
    let mut warn = |text: String| warnings.push(ValidationMessage::warning(text, ""));
    let qualified_name = component.qualified_name();
    let qualifier = component.attribute("qualifier");
    let value = component.attribute("value");

    match component.kind() {
        K::Language | K::Type => {
            if qualifier.is_none() && value.is_none() && component.text().is_empty() {
                warn(format!("Neither a qualifier nor a value was set on this {}.", qualified_name));
            } else if qualifier.is_some() && value.is_none() {
                warn("A qualifier has been set without an accompanying value attribute.".to_string());
            }
        }
        K::Extent => {
            if qualifier.is_none() && value.is_none() {
                warn("A completely empty ddms:extent element was found.".to_string());
            } else if qualifier.is_some() && value.is_none() {
                warn("A qualifier has been set without an accompanying value attribute.".to_string());
            }
        }
        K::Dates | K::Source | K::VirtualCoverage if component.element().attributes().is_empty() => {
            warn(format!("A completely empty {} element was found.", qualified_name));
        }
        K::Subtitle | K::Description | K::NonStateActor if component.text().is_empty() => {
            warn(format!("A {} element was found with no value.", qualified_name));
        }
        K::SubjectCoverage => {
            if has_duplicates(component.children_of(K::Keyword).map(|k| k.attribute("value").unwrap_or_default())) {
                warn("1 or more keywords have the same value.".to_string());
            }
            if has_duplicates(component.children_of(K::Category).map(|c| c.attribute("label").unwrap_or_default())) {
                warn("1 or more categories have the same value.".to_string());
            }
        }
        K::TemporalCoverage => {
            if component.field("name").is_some_and(|name| name.is_empty()) {
                warn("A ddms:name element was found with no value.".to_string());
            }
        }
        _ => {}
    }
    warnings
}

fn has_duplicates<'a>(values: impl Iterator<Item = &'a str>) -> bool {
    let mut seen = HashSet::new();
    values.into_iter().any(|value| !seen.insert(value))
}
