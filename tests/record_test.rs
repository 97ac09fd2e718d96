mod common;

use common::*;
use validate_ddms::{AttributeGroup, ComponentKind, DdmsError, Element, GroupKind, RecordAttributes};

fn expect_invalid(result: validate_ddms::Result<validate_ddms::Record>) -> (String, String) {
    match result {
        Err(DdmsError::Invalid { message, locator }) => (message, locator),
        Err(other) => panic!("Expected an invalid record, got {:?}", other),
        Ok(_) => panic!("Expected an invalid record"),
    }
}

#[test]
fn test_minimal_record_for_every_version() {
    for token in ["2.0", "3.0", "3.1", "4.0.1", "4.1", "5.0"] {
        let session = session(token);
        let record = minimal_record(&session);
        assert_eq!(record.version().token(), token);
        assert_eq!(record.identifiers().len(), 1);
        assert_eq!(record.titles().len(), 1);
        assert_eq!(record.producers().count(), 1);
        assert!(record.warnings().is_empty(), "{} warned: {:?}", token, record.warnings());
    }
}

#[test]
fn test_components_are_placed_in_schema_order() {
    let session = session("4.1");
    let mut components = minimal_components(&session);
    components.reverse();
    let record = session.record(components, record_attributes(&session)).unwrap();

    let kinds: Vec<ComponentKind> = record.components().iter().map(|c| c.kind()).collect();
    let mut sorted = kinds.clone();
    sorted.sort();
    assert_eq!(kinds, sorted);

    let names: Vec<&str> = record.element().child_elements().map(|e| e.name.as_str()).collect();
    assert_eq!(names.first(), Some(&"identifier"));
    assert_eq!(names.last(), Some(&"security"));
}

#[test]
fn test_missing_title() {
    let session = session("4.1");
    let components = minimal_components(&session)
        .into_iter()
        .filter(|c| c.kind() != ComponentKind::Title)
        .collect();
    let (message, locator) = expect_invalid(session.record(components, record_attributes(&session)));
    assert_eq!(message, "At least 1 ddms:title element must exist.");
    assert_eq!(locator, "/ddms:resource");
}

#[test]
fn test_producer_required() {
    let session = session("4.1");
    let components = minimal_components(&session)
        .into_iter()
        .filter(|c| !c.kind().is_producer())
        .collect();
    let (message, _) = expect_invalid(session.record(components, record_attributes(&session)));
    assert_eq!(
        message,
        "At least 1 producer role (creator, publisher, contributor, or pointOfContact) must exist."
    );
}

#[test]
fn test_any_producer_role_satisfies_the_producer_rule() {
    let session = session("3.1");
    let mut components: Vec<_> = minimal_components(&session)
        .into_iter()
        .filter(|c| !c.kind().is_producer())
        .collect();
    components.push(producer(&session, ComponentKind::PointOfContact));
    let record = session.record(components, record_attributes(&session)).unwrap();
    assert_eq!(
        record.producers().map(|p| p.kind()).collect::<Vec<_>>(),
        vec![ComponentKind::PointOfContact]
    );
}

#[test]
fn test_security_forbidden_in_5_0() {
    let session = session("5.0");
    let mut components = minimal_components(&session);
    components.push(security_component(&session));
    let (message, _) = expect_invalid(session.record(components, record_attributes(&session)));
    assert_eq!(message, "The ddms:security element must not be used in DDMS 5.0.");
}

#[test]
fn test_metacard_info_required_in_5_0() {
    let session = session("5.0");
    let components = minimal_components(&session)
        .into_iter()
        .filter(|c| c.kind() != ComponentKind::MetacardInfo)
        .collect();
    let (message, _) = expect_invalid(session.record(components, record_attributes(&session)));
    assert_eq!(message, "Exactly 1 ddms:metacardInfo element must exist.");
}

#[test]
fn test_second_dates_is_rejected_by_cardinality() {
    let session = session("4.1");
    let mut components = minimal_components(&session);
    components.push(dates(&session));
    components.push(dates(&session));
    let (message, _) = expect_invalid(session.record(components, record_attributes(&session)));
    assert_eq!(message, "No more than 1 ddms:dates element can exist.");
}

#[test]
fn test_single_subject_coverage_before_4_0_1() {
    let session = session("3.1");
    let mut components = minimal_components(&session);
    components.push(subject_coverage(&session, &["second"]));
    let (message, _) = expect_invalid(session.record(components, record_attributes(&session)));
    assert_eq!(message, "Exactly 1 ddms:subjectCoverage element must exist.");

    let session = session.switch_to("4.1").unwrap();
    let mut components = minimal_components(&session);
    components.push(subject_coverage(&session, &["second"]));
    let record = session.record(components, record_attributes(&session)).unwrap();
    assert_eq!(record.subject_coverages().len(), 2);
}

#[test]
fn test_nested_component_cannot_be_top_level() {
    let session = session("4.1");
    let mut components = minimal_components(&session);
    components.push(keyword(&session, "stray"));
    let (message, _) = expect_invalid(session.record(components, record_attributes(&session)));
    assert_eq!(message, "ddms:keyword cannot be a direct child of ddms:resource.");
}

#[test]
fn test_consecutive_orders_pass() {
    let session = session("4.1");
    let mut components: Vec<_> = minimal_components(&session)
        .into_iter()
        .filter(|c| c.kind() != ComponentKind::SubjectCoverage)
        .collect();
    components.push(subject_coverage_with_actors(&session, &[1, 3]));
    components.push(geospatial_coverage(&session, Some(2)));
    let record = session.record(components, record_attributes(&session)).unwrap();
    assert_eq!(record.geospatial_coverages().len(), 1);
}

#[test]
fn test_orders_with_a_gap_fail() {
    let session = session("4.1");
    for orders in [[1, 2, 4], [2, 3, 4]] {
        let mut components: Vec<_> = minimal_components(&session)
            .into_iter()
            .filter(|c| c.kind() != ComponentKind::SubjectCoverage)
            .collect();
        components.push(subject_coverage_with_actors(&session, &orders[..2]));
        components.push(geospatial_coverage(&session, Some(orders[2])));
        let (message, _) = expect_invalid(session.record(components, record_attributes(&session)));
        assert_eq!(
            message,
            "The ddms:order attributes throughout this resource must form a complete, consecutive sequence starting at 1."
        );
    }
}

#[test]
fn test_duplicate_orders_fail() {
    let session = session("4.1");
    let mut components: Vec<_> = minimal_components(&session)
        .into_iter()
        .filter(|c| c.kind() != ComponentKind::SubjectCoverage)
        .collect();
    components.push(subject_coverage_with_actors(&session, &[1, 1]));
    assert!(session.record(components, record_attributes(&session)).is_err());
}

#[test]
fn test_orders_beyond_32_bits_still_count() {
    let session = session("4.1");
    let mut components: Vec<_> = minimal_components(&session)
        .into_iter()
        .filter(|c| c.kind() != ComponentKind::SubjectCoverage)
        .collect();
    let large = u64::from(u32::MAX) + 1;
    components.push(subject_coverage_with_actors(&session, &[large]));
    components.push(geospatial_coverage(&session, Some(1)));
    let (message, _) = expect_invalid(session.record(components, record_attributes(&session)));
    assert_eq!(
        message,
        "The ddms:order attributes throughout this resource must form a complete, consecutive sequence starting at 1."
    );
}

#[test]
fn test_warning_locator_includes_resource() {
    let session = session("4.1");
    let mut components = minimal_components(&session);
    components.push(session.component(ComponentKind::Dates, Default::default()).unwrap());
    let record = session.record(components, record_attributes(&session)).unwrap();

    assert_eq!(record.warnings().len(), 1);
    let warning = &record.warnings()[0];
    assert!(warning.is_warning());
    assert_eq!(warning.locator, "/ddms:resource/ddms:dates");
    assert_eq!(warning.text, "A completely empty ddms:dates element was found.");
}

#[test]
fn test_des_version_mismatch_warns() {
    let session = session("4.1");
    let mut attributes = record_attributes(&session);
    attributes.resource = attributes.resource.map(|group| group.with("ism:DESVersion", "2"));
    let record = session.record(minimal_components(&session), attributes).unwrap();
    assert_eq!(record.warnings().len(), 1);
    assert_eq!(record.warnings()[0].locator, "/ddms:resource");
    assert!(record.warnings()[0].text.contains("ISM DES version 9"));
}

#[test]
fn test_resource_attributes_required_between_3_0_and_5_0() {
    let session = session("3.1");
    let (message, locator) = expect_invalid(session.record(minimal_components(&session), RecordAttributes::default()));
    assert!(message.contains("required"), "{}", message);
    assert_eq!(locator, "/ddms:resource");
}

#[test]
fn test_resource_attributes_rejected_in_2_0() {
    let session = session("2.0");
    let attributes = RecordAttributes {
        resource: Some(
            AttributeGroup::new(GroupKind::Resource)
                .with("ism:resourceElement", "true")
                .with("ism:createDate", "2010-01-21")
                .with("ism:DESVersion", "2"),
        ),
        ..RecordAttributes::default()
    };
    let (message, _) = expect_invalid(session.record(minimal_components(&session), attributes));
    assert_eq!(message, "The resource attributes cannot be applied to ddms:resource in DDMS 2.0.");
}

#[test]
fn test_classification_vocabulary() {
    let session = session("4.1");
    let mut attributes = record_attributes(&session);
    attributes.security = Some(AttributeGroup::security("ZOO", &["USA"]));
    let (message, _) = expect_invalid(session.record(minimal_components(&session), attributes));
    assert!(message.contains("ZOO"), "{}", message);
}

#[test]
fn test_mixed_versions_are_rejected() {
    let session = session("4.1");
    let older = session.switch_to("3.1").unwrap();
    let mut components: Vec<_> = minimal_components(&session)
        .into_iter()
        .filter(|c| c.kind() != ComponentKind::Title)
        .collect();
    components.push(title(&older, "Older"));
    let (message, _) = expect_invalid(session.record(components, record_attributes(&session)));
    assert_eq!(
        message,
        "A child component, ddms:title, is using a different version of DDMS from its parent."
    );
}

#[test]
fn test_parse_record_round_trip() {
    for token in ["2.0", "3.1", "4.1", "5.0"] {
        let session = session(token);
        let record = minimal_record(&session);
        let json = serde_json::to_string(record.element()).unwrap();
        let element: Element = serde_json::from_str(&json).unwrap();
        let parsed = session.parse_record(element).unwrap();
        assert_eq!(parsed, record, "round trip failed for {}", token);
    }
}

#[test]
fn test_parse_record_resolves_version_from_namespace() {
    let record = minimal_record(&session("3.0"));
    let parsed = session("5.0").parse_record(record.element().clone()).unwrap();
    assert_eq!(parsed.version().token(), "3.0");
}

#[test]
fn test_parse_record_rejects_other_roots() {
    let session = session("4.1");
    let element = Element::new("ddms", "title", session.version().primary_namespace());
    let (message, locator) = expect_invalid(session.parse_record(element));
    assert!(message.starts_with("Unexpected namespace URI and local name encountered"));
    assert_eq!(locator, "/ddms:resource");

    let foreign = Element::new("ex", "resource", "http://example.com/other");
    assert!(session.parse_record(foreign).is_err());
}

#[test]
fn test_parse_record_keeps_extensions() {
    let session = session("4.1");
    let record = minimal_record(&session);
    let mut element = record.element().clone();
    element.push_element(Element::new("ex", "extra", "http://example.com/ext").with_text("payload"));
    let parsed = session.parse_record(element).unwrap();
    assert_eq!(parsed.extensions().len(), 1);
    assert_eq!(parsed.extensions()[0].name(), "extra");
}

#[test]
fn test_parse_errors_are_located_beneath_resource() {
    let session = session("4.1");
    let mut element = minimal_record(&session).element().clone();
    element.push_element(Element::new("ddms", "dates", session.version().primary_namespace()));
    let bad_subject = Element::new("ddms", "subjectCoverage", session.version().primary_namespace());
    element.push_element(bad_subject);

    let (_, locator) = expect_invalid(session.parse_record(element));
    assert_eq!(locator, "/ddms:resource/ddms:subjectCoverage");
}

#[test]
fn test_renderings() {
    let session = session("4.1");
    let record = minimal_record(&session);

    let text = record.to_text();
    assert!(text.starts_with("ddms.version: 4.1\n"));
    assert!(text.contains("title: DDMSence"));
    assert!(text.contains("resource.classification: U\n"));
    assert!(text.contains("resource.ownerProducer: USA\n"));

    let html = record.to_html();
    assert!(html.contains("<meta name=\"ddms.version\" content=\"4.1\" />"));

    let xml = record.to_xml();
    assert!(xml.starts_with("<ddms:resource"));
    assert!(xml.contains("urn:us:mil:ces:metadata:ddms:4"));
}
