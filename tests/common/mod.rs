#![allow(dead_code)]

use std::path::{Path, PathBuf};

use validate_ddms::{
    AttributeGroup, Component, ComponentFields, ComponentKind, Element, GroupKind, Record,
    RecordAttributes, Session,
};

pub fn session(token: &str) -> Session {
    Session::for_token(token).unwrap()
}

pub fn security() -> AttributeGroup {
    AttributeGroup::security("U", &["USA"])
}

pub fn build(session: &Session, kind: ComponentKind, fields: ComponentFields) -> Component {
    session.component(kind, fields).unwrap()
}

pub fn identifier(session: &Session) -> Component {
    build(
        session,
        ComponentKind::Identifier,
        ComponentFields::new()
            .attribute("qualifier", "URI")
            .attribute("value", "urn:buri:ddmsence:testIdentifier"),
    )
}

/// Titles, subtitles and descriptions need security attributes from 3.0 on.
pub fn title(session: &Session, text: &str) -> Component {
    let mut fields = ComponentFields::new().text(text);
    if session.version().at_least("3.0").unwrap() {
        fields = fields.security(security());
    }
    build(session, ComponentKind::Title, fields)
}

pub fn organization(session: &Session, name: &str) -> Component {
    build(
        session,
        ComponentKind::Organization,
        ComponentFields::new().field("name", name).field("email", "ddms@fgm.com"),
    )
}

pub fn person(session: &Session) -> Component {
    build(
        session,
        ComponentKind::Person,
        ComponentFields::new()
            .field("name", "Brian")
            .field("surname", "Uri")
            .field("phone", "703-885-1000"),
    )
}

pub fn producer(session: &Session, kind: ComponentKind) -> Component {
    build(
        session,
        kind,
        ComponentFields::new().child(organization(session, "DISA")),
    )
}

pub fn keyword(session: &Session, value: &str) -> Component {
    build(
        session,
        ComponentKind::Keyword,
        ComponentFields::new().attribute("value", value),
    )
}

pub fn subject_coverage(session: &Session, keywords: &[&str]) -> Component {
    build(
        session,
        ComponentKind::SubjectCoverage,
        ComponentFields::new().children(keywords.iter().map(|k| keyword(session, k))),
    )
}

pub fn non_state_actor(session: &Session, text: &str, order: u64) -> Component {
    build(
        session,
        ComponentKind::NonStateActor,
        ComponentFields::new()
            .text(text)
            .attribute("ddms:order", order.to_string()),
    )
}

/// A subject coverage whose non-state actors carry the given orders.
pub fn subject_coverage_with_actors(session: &Session, orders: &[u64]) -> Component {
    let actors = orders
        .iter()
        .map(|order| non_state_actor(session, "Laotian Monks", *order));
    build(
        session,
        ComponentKind::SubjectCoverage,
        ComponentFields::new()
            .child(keyword(session, "DDMSence"))
            .children(actors),
    )
}

pub fn geographic_identifier(session: &Session, name: &str) -> Component {
    build(
        session,
        ComponentKind::GeographicIdentifier,
        ComponentFields::new().field("name", name),
    )
}

pub fn geospatial_coverage(session: &Session, order: Option<u64>) -> Component {
    let mut fields = ComponentFields::new().child(geographic_identifier(session, "The White House"));
    if let Some(order) = order {
        fields = fields.attribute("ddms:order", order.to_string());
    }
    build(session, ComponentKind::GeospatialCoverage, fields)
}

pub fn dates(session: &Session) -> Component {
    build(
        session,
        ComponentKind::Dates,
        ComponentFields::new()
            .attribute("created", "2003")
            .attribute("posted", "2003-02"),
    )
}

pub fn security_component(session: &Session) -> Component {
    let mut fields = ComponentFields::new().security(security());
    if session.version().at_least("3.0").unwrap() {
        fields = fields.attribute("ism:excludeFromRollup", "true");
    }
    build(session, ComponentKind::Security, fields)
}

pub fn metacard_info(session: &Session) -> Component {
    build(
        session,
        ComponentKind::MetacardInfo,
        ComponentFields::new()
            .child(identifier(session))
            .child(dates(session))
            .child(producer(session, ComponentKind::Publisher))
            .security(security()),
    )
}

/// Resource-level attributes for the versions that require them.
pub fn record_attributes(session: &Session) -> RecordAttributes {
    let version = session.version();
    if !version.in_window(Some("3.0"), Some("5.0")) {
        return RecordAttributes::default();
    }
    let resource = AttributeGroup::new(GroupKind::Resource)
        .with("ism:resourceElement", "true")
        .with("ism:createDate", "2010-01-21")
        .with("ism:DESVersion", version.ism_des_version().unwrap_or("2"));
    RecordAttributes {
        resource: Some(resource),
        security: Some(security()),
        notice: None,
    }
}

/// The smallest valid set of top-level components for the session's version.
pub fn minimal_components(session: &Session) -> Vec<Component> {
    let mut components = vec![
        identifier(session),
        title(session, "DDMSence"),
        producer(session, ComponentKind::Creator),
        subject_coverage(session, &["DDMSence"]),
    ];
    if session.version().at_least("5.0").unwrap() {
        components.push(metacard_info(session));
    } else {
        components.push(security_component(session));
    }
    components
}

pub fn minimal_record(session: &Session) -> Record {
    session
        .record(minimal_components(session), record_attributes(session))
        .unwrap()
}

/// Writes a record element as a JSON document.
pub fn write_document(dir: &Path, name: &str, element: &Element) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(element).unwrap()).unwrap();
    path
}
