//! Element kinds
//!
//! Every metadata element this crate understands is one [`ComponentKind`]. The
//! per-kind layout lives in a static [`KindDescriptor`]: which namespace and
//! local name the element has, in which releases it exists, what text,
//! attributes and content it may carry, and which attribute groups decorate it.
//! The generic machinery in `component` reads these descriptors; anything a
//! descriptor cannot express lives in `rules`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::format::ValueFormat;
use crate::version::{NamespaceKind, Version};
use crate::vocabulary::keys;

/// The closed set of element kinds.
///
/// Top-level kinds are declared first, in the order they appear inside a
/// record; that declaration order is the canonical record order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    MetacardInfo,
    Identifier,
    Title,
    Subtitle,
    Description,
    Language,
    Dates,
    Rights,
    Source,
    Type,
    Creator,
    Publisher,
    Contributor,
    PointOfContact,
    Format,
    SubjectCoverage,
    VirtualCoverage,
    TemporalCoverage,
    GeospatialCoverage,
    RelatedResource,
    ResourceManagement,
    Security,
    /// A foreign-namespace element carried verbatim.
    Extension,

    Organization,
    SubOrganization,
    Person,
    Service,
    Unknown,
    Extent,
    Keyword,
    Category,
    ProductionMetric,
    NonStateActor,
    GeographicIdentifier,
    CountryCode,
    BoundingBox,
    Link,
    ProcessingInfo,
    Notice,
    NoticeText,
}

/// Whether an element carries text content.
#[derive(Debug, Clone, Copy)]
pub enum TextRule {
    None,
    Optional(ValueFormat),
    Required(ValueFormat),
}

/// Whether an element may, or must, carry an attribute group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRule {
    Forbidden,
    Optional,
    /// Optional before the given release, required from it onward.
    RequiredSince(&'static str),
    Required,
}

impl GroupRule {
    pub fn allows(self) -> bool {
        self != GroupRule::Forbidden
    }

    pub fn requires(self, version: &Version) -> bool {
        match self {
            GroupRule::Required => true,
            GroupRule::RequiredSince(token) => version.at_least(token).unwrap_or(false),
            GroupRule::Forbidden | GroupRule::Optional => false,
        }
    }
}

/// An attribute local to an element (not part of an attribute group).
#[derive(Debug, Clone, Copy)]
pub struct AttributeRule {
    /// `None` for unqualified attributes.
    pub namespace: Option<NamespaceKind>,
    pub name: &'static str,
    pub format: ValueFormat,
    pub required: bool,
    pub since: Option<&'static str>,
    pub before: Option<&'static str>,
}

impl AttributeRule {
    const fn plain(name: &'static str, format: ValueFormat) -> Self {
        Self {
            namespace: None,
            name,
            format,
            required: false,
            since: None,
            before: None,
        }
    }

    const fn qualified(namespace: NamespaceKind, name: &'static str, format: ValueFormat) -> Self {
        Self {
            namespace: Some(namespace),
            name,
            format,
            required: false,
            since: None,
            before: None,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn since(mut self, token: &'static str) -> Self {
        self.since = Some(token);
        self
    }

    /// `name` or `prefix:name`.
    pub fn key(&self) -> String {
        match self.namespace {
            Some(kind) => format!("{}:{}", kind.prefix(), self.name),
            None => self.name.to_string(),
        }
    }
}

/// A text-valued child element in the owner's namespace, such as `ddms:name`.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub format: ValueFormat,
    pub min: usize,
    pub max: Option<usize>,
}

/// Nested components of one or more kinds sharing a cardinality.
#[derive(Debug, Clone, Copy)]
pub struct ChildRule {
    pub kinds: &'static [ComponentKind],
    pub min: usize,
    pub max: Option<usize>,
}

/// Element content, in schema order.
#[derive(Debug, Clone, Copy)]
pub enum ContentRule {
    Field(FieldRule),
    Child(ChildRule),
}

const fn field(name: &'static str, min: usize, max: Option<usize>) -> ContentRule {
    ContentRule::Field(FieldRule {
        name,
        format: ValueFormat::Text,
        min,
        max,
    })
}

const fn formatted_field(name: &'static str, format: ValueFormat) -> ContentRule {
    ContentRule::Field(FieldRule {
        name,
        format,
        min: 1,
        max: Some(1),
    })
}

const fn child(kinds: &'static [ComponentKind], min: usize, max: Option<usize>) -> ContentRule {
    ContentRule::Child(ChildRule { kinds, min, max })
}

/// Static layout of one element kind.
#[derive(Debug, Clone, Copy)]
pub struct KindDescriptor {
    pub kind: ComponentKind,
    pub namespace: NamespaceKind,
    pub name: &'static str,
    pub since: Option<&'static str>,
    pub before: Option<&'static str>,
    pub text: TextRule,
    pub attributes: &'static [AttributeRule],
    pub content: &'static [ContentRule],
    pub security: GroupRule,
    pub notice: GroupRule,
}

impl KindDescriptor {
    const fn ddms(kind: ComponentKind, name: &'static str) -> Self {
        Self {
            kind,
            namespace: NamespaceKind::Ddms,
            name,
            since: None,
            before: None,
            text: TextRule::None,
            attributes: &[],
            content: &[],
            security: GroupRule::Forbidden,
            notice: GroupRule::Forbidden,
        }
    }

    const fn since(mut self, token: &'static str) -> Self {
        self.since = Some(token);
        self
    }

    const fn before(mut self, token: &'static str) -> Self {
        self.before = Some(token);
        self
    }

    const fn text(mut self, rule: TextRule) -> Self {
        self.text = rule;
        self
    }

    const fn attributes(mut self, rules: &'static [AttributeRule]) -> Self {
        self.attributes = rules;
        self
    }

    const fn content(mut self, rules: &'static [ContentRule]) -> Self {
        self.content = rules;
        self
    }

    const fn security(mut self, rule: GroupRule) -> Self {
        self.security = rule;
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&'static AttributeRule> {
        self.attributes.iter().find(|rule| rule.key() == key)
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldRule> {
        self.content.iter().find_map(|rule| match rule {
            ContentRule::Field(field) if field.name == name => Some(field),
            _ => None,
        })
    }

    /// The content rule covering nested components of `kind`.
    pub fn child_rule(&self, kind: ComponentKind) -> Option<&'static ChildRule> {
        self.content.iter().find_map(|rule| match rule {
            ContentRule::Child(child) if child.kinds.contains(&kind) => Some(child),
            _ => None,
        })
    }

    pub fn exists_in(&self, version: &Version) -> bool {
        version.in_window(self.since, self.before)
    }
}

use ComponentKind as K;

const ENTITY_KINDS: &[ComponentKind] = &[K::Organization, K::Person, K::Service, K::Unknown];
const ADDRESS_FIELDS: [ContentRule; 2] = [field("phone", 0, None), field("email", 0, None)];

const PRODUCER_ATTRIBUTES: &[AttributeRule] =
    &[AttributeRule::qualified(NamespaceKind::Ism, "pocType", ValueFormat::VocabularyList(keys::POC_TYPES)).since("4.1")];
const PRODUCER_CONTENT: &[ContentRule] = &[child(ENTITY_KINDS, 1, Some(1))];

const QUALIFIED_VALUE: &[AttributeRule] = &[
    AttributeRule::plain("qualifier", ValueFormat::Uri).required(),
    AttributeRule::plain("value", ValueFormat::Text).required(),
];
const OPTIONAL_QUALIFIED_VALUE: &[AttributeRule] = &[
    AttributeRule::plain("qualifier", ValueFormat::Text),
    AttributeRule::plain("value", ValueFormat::Text),
];

const DESCRIPTORS: &[KindDescriptor] = &[
    KindDescriptor::ddms(K::MetacardInfo, "metacardInfo")
        .since("5.0")
        .content(&[
            child(&[K::Identifier], 1, None),
            child(&[K::Dates], 1, Some(1)),
            child(&[K::Publisher], 1, None),
            child(&[K::Contributor, K::Creator, K::PointOfContact], 0, None),
            child(&[K::Description], 0, Some(1)),
        ])
        .security(GroupRule::Required),
    KindDescriptor::ddms(K::Identifier, "identifier").attributes(QUALIFIED_VALUE),
    KindDescriptor::ddms(K::Title, "title")
        .text(TextRule::Required(ValueFormat::Text))
        .security(GroupRule::RequiredSince("3.0")),
    KindDescriptor::ddms(K::Subtitle, "subtitle")
        .text(TextRule::Optional(ValueFormat::Text))
        .security(GroupRule::RequiredSince("3.0")),
    KindDescriptor::ddms(K::Description, "description")
        .text(TextRule::Optional(ValueFormat::Text))
        .security(GroupRule::RequiredSince("3.0")),
    KindDescriptor::ddms(K::Language, "language").attributes(OPTIONAL_QUALIFIED_VALUE),
    KindDescriptor::ddms(K::Dates, "dates").attributes(&[
        AttributeRule::plain("created", ValueFormat::Date),
        AttributeRule::plain("posted", ValueFormat::Date),
        AttributeRule::plain("validTil", ValueFormat::Date),
        AttributeRule::plain("infoCutOff", ValueFormat::Date),
        AttributeRule::plain("approvedOn", ValueFormat::Date).since("3.1"),
        AttributeRule::plain("receivedOn", ValueFormat::Date).since("4.0.1"),
    ]),
    KindDescriptor::ddms(K::Rights, "rights").attributes(&[
        AttributeRule::plain("privacyAct", ValueFormat::Boolean),
        AttributeRule::plain("intellectualProperty", ValueFormat::Boolean),
        AttributeRule::plain("copyright", ValueFormat::Boolean),
    ]),
    KindDescriptor::ddms(K::Source, "source")
        .attributes(&[
            AttributeRule::plain("qualifier", ValueFormat::Text),
            AttributeRule::plain("value", ValueFormat::Text),
            AttributeRule::plain("schemaQualifier", ValueFormat::Text),
            AttributeRule::plain("schemaHref", ValueFormat::Uri),
        ])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::Type, "type")
        .text(TextRule::Optional(ValueFormat::Text))
        .attributes(OPTIONAL_QUALIFIED_VALUE)
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::Creator, "creator")
        .attributes(PRODUCER_ATTRIBUTES)
        .content(PRODUCER_CONTENT)
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::Publisher, "publisher")
        .attributes(PRODUCER_ATTRIBUTES)
        .content(PRODUCER_CONTENT)
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::Contributor, "contributor")
        .attributes(PRODUCER_ATTRIBUTES)
        .content(PRODUCER_CONTENT)
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::PointOfContact, "pointOfContact")
        .attributes(PRODUCER_ATTRIBUTES)
        .content(PRODUCER_CONTENT)
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::Format, "format").content(&[
        field("mimeType", 1, Some(1)),
        child(&[K::Extent], 0, Some(1)),
        field("medium", 0, Some(1)),
    ]),
    KindDescriptor::ddms(K::SubjectCoverage, "subjectCoverage")
        .content(&[
            child(&[K::Keyword], 0, None),
            child(&[K::Category], 0, None),
            child(&[K::ProductionMetric], 0, None),
            child(&[K::NonStateActor], 0, None),
        ])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::VirtualCoverage, "virtualCoverage")
        .attributes(&[
            AttributeRule::plain("address", ValueFormat::Text),
            AttributeRule::plain("protocol", ValueFormat::Text),
            AttributeRule::qualified(NamespaceKind::Virt, "access", ValueFormat::Text).since("4.0.1"),
            AttributeRule::qualified(
                NamespaceKind::Virt,
                "network",
                ValueFormat::OneOf(&["NIPRNet", "SIPRNet", "JWICS", "ADSN", "StoneGhost", "LOCAL", "OTHER"]),
            )
            .since("4.0.1"),
        ])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::TemporalCoverage, "temporalCoverage")
        .content(&[
            field("name", 0, Some(1)),
            formatted_field("start", ValueFormat::DateOrMarker),
            formatted_field("end", ValueFormat::DateOrMarker),
        ])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::GeospatialCoverage, "geospatialCoverage")
        .attributes(&[
            AttributeRule::qualified(NamespaceKind::Ddms, "order", ValueFormat::PositiveInteger).since("4.0.1"),
            AttributeRule::qualified(NamespaceKind::Ddms, "precedence", ValueFormat::OneOf(&["Primary", "Secondary"]))
                .since("4.0.1"),
        ])
        .content(&[
            child(&[K::GeographicIdentifier], 0, Some(1)),
            child(&[K::BoundingBox], 0, Some(1)),
        ])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::RelatedResource, "relatedResource")
        .attributes(&[
            AttributeRule::plain("relationship", ValueFormat::Uri).required(),
            AttributeRule::plain("direction", ValueFormat::OneOf(&["outbound", "inbound", "bidirectional"])),
            AttributeRule::plain("qualifier", ValueFormat::Uri).required(),
            AttributeRule::plain("value", ValueFormat::Text).required(),
        ])
        .content(&[child(&[K::Link], 1, None)])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::ResourceManagement, "resourceManagement")
        .since("4.1")
        .content(&[child(&[K::ProcessingInfo], 0, None)])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::Security, "security")
        .before("5.0")
        .attributes(&[AttributeRule::qualified(NamespaceKind::Ism, "excludeFromRollup", ValueFormat::OneOf(&["true"]))
            .required()
            .since("3.0")])
        .content(&[child(&[K::Notice], 0, None)])
        .security(GroupRule::Required),
    KindDescriptor::ddms(K::Extension, "*"),
    KindDescriptor::ddms(K::Organization, "organization")
        .attributes(&[AttributeRule::plain("acronym", ValueFormat::Text).since("4.0.1")])
        .content(&[
            field("name", 1, None),
            ADDRESS_FIELDS[0],
            ADDRESS_FIELDS[1],
            child(&[K::SubOrganization], 0, None),
        ]),
    KindDescriptor::ddms(K::SubOrganization, "subOrganization")
        .since("4.0.1")
        .text(TextRule::Required(ValueFormat::Text))
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::Person, "person").content(&[
        field("name", 1, None),
        field("surname", 1, Some(1)),
        field("userID", 0, Some(1)),
        field("affiliation", 0, None),
        ADDRESS_FIELDS[0],
        ADDRESS_FIELDS[1],
    ]),
    KindDescriptor::ddms(K::Service, "service").content(&[field("name", 1, None), ADDRESS_FIELDS[0], ADDRESS_FIELDS[1]]),
    KindDescriptor::ddms(K::Unknown, "unknown")
        .since("3.0")
        .content(&[field("name", 1, None), ADDRESS_FIELDS[0], ADDRESS_FIELDS[1]]),
    KindDescriptor::ddms(K::Extent, "extent").attributes(&[
        AttributeRule::plain("qualifier", ValueFormat::Uri),
        AttributeRule::plain("value", ValueFormat::Text),
    ]),
    KindDescriptor::ddms(K::Keyword, "keyword")
        .attributes(&[AttributeRule::plain("value", ValueFormat::Text).required()])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::Category, "category")
        .attributes(&[
            AttributeRule::plain("qualifier", ValueFormat::Uri),
            AttributeRule::plain("code", ValueFormat::Text),
            AttributeRule::plain("label", ValueFormat::Text).required(),
        ])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::ProductionMetric, "productionMetric")
        .since("4.0.1")
        .attributes(&[
            AttributeRule::plain("subject", ValueFormat::Text).required(),
            AttributeRule::plain("coverage", ValueFormat::Text).required(),
        ])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::NonStateActor, "nonStateActor")
        .since("4.0.1")
        .text(TextRule::Optional(ValueFormat::Text))
        .attributes(&[
            AttributeRule::qualified(NamespaceKind::Ddms, "order", ValueFormat::PositiveInteger),
            AttributeRule::qualified(NamespaceKind::Ddms, "qualifier", ValueFormat::Uri).since("4.1"),
        ])
        .security(GroupRule::Optional),
    KindDescriptor::ddms(K::GeographicIdentifier, "geographicIdentifier").content(&[
        field("name", 0, None),
        field("region", 0, None),
        child(&[K::CountryCode], 0, Some(1)),
    ]),
    KindDescriptor::ddms(K::CountryCode, "countryCode").attributes(QUALIFIED_VALUE),
    KindDescriptor::ddms(K::BoundingBox, "boundingBox").content(&[
        formatted_field("westBL", ValueFormat::Decimal),
        formatted_field("eastBL", ValueFormat::Decimal),
        formatted_field("southBL", ValueFormat::Decimal),
        formatted_field("northBL", ValueFormat::Decimal),
    ]),
    KindDescriptor {
        namespace: NamespaceKind::Xlink,
        ..KindDescriptor::ddms(K::Link, "link")
    }
    .attributes(&[
        AttributeRule::qualified(NamespaceKind::Xlink, "type", ValueFormat::OneOf(&["locator"])).required(),
        AttributeRule::qualified(NamespaceKind::Xlink, "href", ValueFormat::Uri).required(),
        AttributeRule::qualified(NamespaceKind::Xlink, "role", ValueFormat::Text),
        AttributeRule::qualified(NamespaceKind::Xlink, "title", ValueFormat::Text),
        AttributeRule::qualified(NamespaceKind::Xlink, "label", ValueFormat::Text),
    ]),
    KindDescriptor::ddms(K::ProcessingInfo, "processingInfo")
        .since("4.1")
        .text(TextRule::Optional(ValueFormat::Text))
        .attributes(&[AttributeRule::plain("dateProcessed", ValueFormat::Date).required()])
        .security(GroupRule::Required),
    KindDescriptor {
        namespace: NamespaceKind::Ism,
        notice: GroupRule::Required,
        ..KindDescriptor::ddms(K::Notice, "Notice")
    }
    .since("4.0.1")
    .content(&[child(&[K::NoticeText], 1, None)])
    .security(GroupRule::Required),
    KindDescriptor {
        namespace: NamespaceKind::Ism,
        ..KindDescriptor::ddms(K::NoticeText, "NoticeText")
    }
    .since("4.0.1")
    .text(TextRule::Optional(ValueFormat::Text))
    .attributes(&[AttributeRule::qualified(NamespaceKind::Ism, "pocType", ValueFormat::VocabularyList(keys::POC_TYPES)).since("4.1")])
    .security(GroupRule::Required),
];

impl ComponentKind {
    pub const ALL: &'static [ComponentKind] = &[
        K::MetacardInfo,
        K::Identifier,
        K::Title,
        K::Subtitle,
        K::Description,
        K::Language,
        K::Dates,
        K::Rights,
        K::Source,
        K::Type,
        K::Creator,
        K::Publisher,
        K::Contributor,
        K::PointOfContact,
        K::Format,
        K::SubjectCoverage,
        K::VirtualCoverage,
        K::TemporalCoverage,
        K::GeospatialCoverage,
        K::RelatedResource,
        K::ResourceManagement,
        K::Security,
        K::Extension,
        K::Organization,
        K::SubOrganization,
        K::Person,
        K::Service,
        K::Unknown,
        K::Extent,
        K::Keyword,
        K::Category,
        K::ProductionMetric,
        K::NonStateActor,
        K::GeographicIdentifier,
        K::CountryCode,
        K::BoundingBox,
        K::Link,
        K::ProcessingInfo,
        K::Notice,
        K::NoticeText,
    ];

    pub fn descriptor(self) -> &'static KindDescriptor {
        // The table holds one entry per kind, in declaration order.
        &DESCRIPTORS[self as usize]
    }

    /// Identifies a kind from a namespace kind and local name.
    pub fn lookup(namespace: NamespaceKind, name: &str) -> Option<ComponentKind> {
        DESCRIPTORS
            .iter()
            .find(|d| d.namespace == namespace && d.name == name)
            .map(|d| d.kind)
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Kinds that appear directly inside a record.
    pub fn is_top_level(self) -> bool {
        self <= K::Extension
    }

    pub fn is_producer(self) -> bool {
        matches!(self, K::Creator | K::Publisher | K::Contributor | K::PointOfContact)
    }

    pub fn is_entity(self) -> bool {
        ENTITY_KINDS.contains(&self)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let descriptor = self.descriptor();
        if *self == K::Extension {
            write!(f, "extensible element")
        } else {
            write!(f, "{}:{}", descriptor.namespace.prefix(), descriptor.name)
        }
    }
}
