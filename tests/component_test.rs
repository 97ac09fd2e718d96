mod common;

use std::sync::Arc;

use common::*;
use tempfile::TempDir;
use validate_ddms::{
    AttributeGroup, ComponentFields, ComponentKind, Config, DdmsError, Element, Vocabularies,
    VersionRegistry,
};

#[test]
fn test_parse_matches_synthesis() {
    let session = session("4.1");
    let built = producer(&session, ComponentKind::Creator);
    let parsed = session.parse(built.element().clone()).unwrap();
    assert_eq!(parsed, built);
    assert_eq!(parsed.children_of(ComponentKind::Organization).count(), 1);
}

#[test]
fn test_equality_ignores_attribute_order_and_prefix() {
    let session = session("4.1");
    let built = identifier(&session);
    let mut element = built.element().clone();
    element.attributes.reverse();
    element.prefix = "d".to_string();
    let parsed = session.parse(element).unwrap();
    assert_eq!(parsed, built);

    let other = session
        .component(
            ComponentKind::Identifier,
            ComponentFields::new()
                .attribute("qualifier", "URI")
                .attribute("value", "other"),
        )
        .unwrap();
    assert_ne!(other, built);
}

#[test]
fn test_equality_is_version_sensitive() {
    let title_31 = title(&session("3.1"), "DDMSence");
    let title_41 = title(&session("4.1"), "DDMSence");
    assert_ne!(title_31, title_41);
}

#[test]
fn test_required_child_is_reported_with_locator() {
    let session = session("4.1");
    let error = session
        .component(ComponentKind::Creator, ComponentFields::new())
        .unwrap_err();
    assert!(error.is_invalid());
    assert_eq!(error.locator(), Some("/ddms:creator"));
}

#[test]
fn test_nested_parse_errors_are_located() {
    let session = session("4.1");
    let mut element = subject_coverage(&session, &["DDMSence"]).element().clone();
    element.push_element(Element::new("ddms", "keyword", session.version().primary_namespace()));

    let error = session.parse(element).unwrap_err();
    assert_eq!(error.locator(), Some("/ddms:subjectCoverage/ddms:keyword"));
}

#[test]
fn test_unknown_attribute_is_rejected() {
    let session = session("4.1");
    let error = session
        .component(
            ComponentKind::Keyword,
            ComponentFields::new().attribute("value", "a").attribute("colour", "red"),
        )
        .unwrap_err();
    assert_eq!(error.to_string(), "colour is not a valid attribute of ddms:keyword.");
}

#[test]
fn test_version_gated_kinds() {
    let v20 = session("2.0");
    let error = v20
        .component(ComponentKind::Unknown, ComponentFields::new().field("name", "Unknown"))
        .unwrap_err();
    assert!(error.is_invalid());

    let v50 = session("5.0");
    assert!(v50
        .component(ComponentKind::Security, ComponentFields::new().security(security()))
        .is_err());
    assert!(metacard_info(&v50).security().is_some());
}

#[test]
fn test_duplicate_keywords_warn() {
    let session = session("4.1");
    let coverage = subject_coverage(&session, &["DDMSence", "DDMSence"]);
    assert_eq!(coverage.warnings().len(), 1);
    assert_eq!(coverage.warnings()[0].locator, "/ddms:subjectCoverage");
    assert_eq!(coverage.warnings()[0].text, "1 or more keywords have the same value.");
}

#[test]
fn test_nested_warning_locators() {
    let session = session("5.0");
    let empty_dates = session.component(ComponentKind::Dates, ComponentFields::new()).unwrap();
    let metacard = session
        .component(
            ComponentKind::MetacardInfo,
            ComponentFields::new()
                .child(identifier(&session))
                .child(empty_dates)
                .child(producer(&session, ComponentKind::Publisher))
                .security(security()),
        )
        .unwrap();
    assert_eq!(metacard.warnings().len(), 1);
    assert_eq!(metacard.warnings()[0].locator, "/ddms:metacardInfo/ddms:dates");
}

#[test]
fn test_orders_are_collected_from_nested_components() {
    let session = session("4.1");
    let coverage = subject_coverage_with_actors(&session, &[2, 1]);
    let mut orders = coverage.orders();
    orders.sort_unstable();
    assert_eq!(orders, vec![1, 2]);
    assert_eq!(geospatial_coverage(&session, Some(3)).order(), Some(3));
    assert_eq!(
        geospatial_coverage(&session, Some(4_294_967_296)).order(),
        Some(4_294_967_296)
    );
}

#[test]
fn test_security_vocabulary_is_checked() {
    let session = session("4.1");
    let error = session
        .component(
            ComponentKind::Title,
            ComponentFields::new()
                .text("DDMSence")
                .security(AttributeGroup::security("ZOO", &["USA"])),
        )
        .unwrap_err();
    assert_eq!(error.locator(), Some("/ddms:title"));
    assert!(error.to_string().starts_with("ZOO is not a valid enumeration token"));
}

#[test]
fn test_extra_vocabularies_extend_the_session() {
    let session = session("4.1");
    let mut vocabularies = (*Vocabularies::builtin()).clone();
    vocabularies
        .load_toml(
            r#"
[[vocabulary]]
version = "4.1"
key = "classifications"
tokens = ["ZOO"]
"#,
        )
        .unwrap();
    let extended = session.clone().with_vocabularies(Arc::new(vocabularies));

    let fields = || {
        ComponentFields::new()
            .text("DDMSence")
            .security(AttributeGroup::security("ZOO", &["USA"]))
    };
    assert!(session.component(ComponentKind::Title, fields()).is_err());
    assert!(extended.component(ComponentKind::Title, fields()).is_ok());
}

#[test]
fn test_session_from_config_loads_vocabulary_files() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("extra.toml");
    std::fs::write(
        &path,
        "[[vocabulary]]\nversion = \"3.1\"\nkey = \"owner-producers\"\ntokens = [\"ZZZ\"]\n",
    )
    .unwrap();

    let mut config = Config::default();
    config.ddms.version = "3.1".to_string();
    config.ddms.vocabulary_files = vec![path];

    let session = validate_ddms::Session::from_config(&config).unwrap();
    assert_eq!(session.version().token(), "3.1");
    assert!(session
        .component(
            ComponentKind::Title,
            ComponentFields::new()
                .text("DDMSence")
                .security(AttributeGroup::security("U", &["ZZZ"])),
        )
        .is_ok());
}

#[test]
fn test_unknown_vocabulary_key_is_not_a_data_error() {
    let version = VersionRegistry::global().resolve("4.1").unwrap();
    match Vocabularies::builtin().validate(&version, "colours", "red") {
        Err(DdmsError::UnknownVocabulary { key, .. }) => assert_eq!(key, "colours"),
        other => panic!("Expected UnknownVocabulary, got {:?}", other),
    }
}

#[test]
fn test_shared_namespaces_resolve_to_newest_version() {
    let registry = VersionRegistry::global();
    assert_eq!(
        registry
            .resolve_for_namespace("urn:us:mil:ces:metadata:ddms:4")
            .unwrap()
            .token(),
        "4.1"
    );
    assert_eq!(registry.resolve("4.0").unwrap().token(), "4.0.1");
    assert_eq!(registry.resolve("3.0.1").unwrap().token(), "3.0");

    let v401 = session("4.0.1");
    let parsed = v401.parse(identifier(&v401).element().clone()).unwrap();
    assert_eq!(parsed.version().token(), "4.0.1");
    let parsed = session("3.1").parse(identifier(&v401).element().clone()).unwrap();
    assert_eq!(parsed.version().token(), "4.1");
}

#[test]
fn test_component_renderings() {
    let session = session("4.1");
    let creator = producer(&session, ComponentKind::Creator);
    let entries = creator.output_entries("");
    assert!(entries.contains(&("creator.organization.name".to_string(), "DISA".to_string())));
    assert!(creator.to_xml().contains("<ddms:name>DISA</ddms:name>"));
}
