//! Builder layer
//!
//! Builders are the mutable, form-friendly mirror of components. Every field
//! is optional and nothing is checked until [`Builder::commit`], which treats
//! a builder whose fields are all blank as "not provided" and returns
//! `Ok(None)` rather than an error.
//!
//! Indexed collections are [`BuilderList`]s. Reading past the end returns
//! `None`; growing the list is always an explicit `push_default` or `resize`.

use std::collections::BTreeMap;

use crate::attributes::{AttributeGroup, GroupKind};
use crate::component::{Component, ComponentFields};
use crate::element::Element;
use crate::error::Result;
use crate::kind::{ComponentKind, ContentRule};
use crate::record::{Record, RecordAttributes};
use crate::session::Session;

/// Common contract of every builder.
pub trait Builder {
    type Output;

    /// True when every scalar is blank and every nested builder is empty.
    fn is_empty(&self) -> bool;

    /// `Ok(None)` when empty; otherwise the same construction and validation
    /// a direct synthesis would perform.
    fn commit(&self, session: &Session) -> Result<Option<Self::Output>>;
}

/// An explicitly sized list whose new slots are clones of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderList<T> {
    items: Vec<T>,
    template: T,
}

impl<T: Clone + Default> Default for BuilderList<T> {
    fn default() -> Self {
        Self::with_template(T::default())
    }
}

impl<T: Clone> BuilderList<T> {
    pub fn with_template(template: T) -> Self {
        Self {
            items: Vec::new(),
            template,
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Appends a fresh item and returns it for editing.
    pub fn push_default(&mut self) -> &mut T {
        let item = self.template.clone();
        self.items.push(item);
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    /// Grows with fresh items, or truncates, to exactly `len` items.
    pub fn resize(&mut self, len: usize) {
        let template = self.template.clone();
        self.items.resize(len, template);
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the list holds no items at all, blank or not.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }
}

impl<T: Clone + Default> FromIterator<T> for BuilderList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::default();
        list.items.extend(iter);
        list
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn all_blank(values: &BuilderList<String>) -> bool {
    values.iter().all(|v| is_blank(v))
}

/// Mutable attribute-group values. List-valued attributes are edited token by token.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeGroupBuilder {
    kind: GroupKind,
    values: BTreeMap<String, String>,
    lists: BTreeMap<String, BuilderList<String>>,
}

impl AttributeGroupBuilder {
    pub fn new(kind: GroupKind) -> Self {
        Self {
            kind,
            values: BTreeMap::new(),
            lists: BTreeMap::new(),
        }
    }

    pub fn from_group(group: &AttributeGroup) -> Self {
        let mut builder = Self::new(group.kind());
        for (key, value) in group.values() {
            builder.set(key, value);
        }
        builder
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    /// Sets an attribute; list-valued attributes are split on whitespace.
    pub fn set(&mut self, key: &str, value: &str) {
        let is_list = self.kind.rule(key).is_some_and(|rule| rule.is_list());
        if is_list {
            self.lists
                .insert(key.to_string(), value.split_whitespace().map(str::to_string).collect());
        } else {
            self.values.insert(key.to_string(), value.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn list(&self, key: &str) -> Option<&BuilderList<String>> {
        self.lists.get(key)
    }

    pub fn list_mut(&mut self, key: &str) -> &mut BuilderList<String> {
        self.lists.entry(key.to_string()).or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(|v| is_blank(v)) && self.lists.values().all(all_blank)
    }

    /// The group, or `None` when every value is blank.
    pub fn build(&self) -> Option<AttributeGroup> {
        if self.is_empty() {
            return None;
        }
        let mut group = AttributeGroup::new(self.kind);
        for (key, value) in &self.values {
            group.insert(key, value.as_str());
        }
        for (key, values) in &self.lists {
            let joined: Vec<&str> = values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
            group.insert(key, joined.join(" "));
        }
        Some(group)
    }
}

/// Mutable counterpart of any [`Component`].
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentBuilder {
    kind: ComponentKind,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    fields: BTreeMap<String, BuilderList<String>>,
    children: BTreeMap<ComponentKind, BuilderList<ComponentBuilder>>,
    pub security: AttributeGroupBuilder,
    pub notice: AttributeGroupBuilder,
}

impl ComponentBuilder {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            text: String::new(),
            attributes: BTreeMap::new(),
            fields: BTreeMap::new(),
            children: BTreeMap::new(),
            security: AttributeGroupBuilder::new(GroupKind::Security),
            notice: AttributeGroupBuilder::new(GroupKind::Notice),
        }
    }

    /// A builder holding every value of an existing component.
    pub fn from_component(component: &Component) -> Self {
        let mut builder = Self::new(component.kind());
        let descriptor = component.descriptor();
        builder.text = component.text();
        for rule in descriptor.attributes {
            let key = rule.key();
            if let Some(value) = component.attribute(&key) {
                builder.attributes.insert(key, value.to_string());
            }
        }
        for rule in descriptor.content {
            if let ContentRule::Field(field) = rule {
                let values = component.fields(field.name);
                if !values.is_empty() {
                    builder.fields.insert(field.name.to_string(), values.into_iter().collect());
                }
            }
        }
        for child in component.children() {
            builder.children_mut(child.kind()).push(Self::from_component(child));
        }
        if let Some(group) = component.security() {
            builder.security = AttributeGroupBuilder::from_group(group);
        }
        if let Some(group) = component.notice() {
            builder.notice = AttributeGroupBuilder::from_group(group);
        }
        builder
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn field(&self, name: &str) -> Option<&BuilderList<String>> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> &mut BuilderList<String> {
        self.fields.entry(name.to_string()).or_default()
    }

    pub fn children(&self, kind: ComponentKind) -> Option<&BuilderList<ComponentBuilder>> {
        self.children.get(&kind)
    }

    /// The nested builders of one kind; new slots are empty builders of that kind.
    pub fn children_mut(&mut self, kind: ComponentKind) -> &mut BuilderList<ComponentBuilder> {
        self.children
            .entry(kind)
            .or_insert_with(|| BuilderList::with_template(ComponentBuilder::new(kind)))
    }

    fn fields_for_commit(&self, session: &Session) -> Result<ComponentFields> {
        let qualified_name = self.kind.to_string();
        let mut fields = ComponentFields::new();
        if !is_blank(&self.text) {
            fields.text = Some(self.text.trim().to_string());
        }
        for (key, value) in &self.attributes {
            if !is_blank(value) {
                fields.attributes.insert(key.clone(), value.trim().to_string());
            }
        }
        for (name, values) in &self.fields {
            for value in values.iter().filter(|v| !is_blank(v)) {
                fields.fields.push((name.clone(), value.trim().to_string()));
            }
        }
        for builders in self.children.values() {
            for builder in builders.iter() {
                if let Some(child) = builder.commit(session).map_err(|e| e.within(&qualified_name))? {
                    fields.children.push(child);
                }
            }
        }
        fields.security = self.security.build();
        fields.notice = self.notice.build();
        Ok(fields)
    }
}

impl Builder for ComponentBuilder {
    type Output = Component;

    fn is_empty(&self) -> bool {
        is_blank(&self.text)
            && self.attributes.values().all(|v| is_blank(v))
            && self.fields.values().all(all_blank)
            && self
                .children
                .values()
                .all(|list| list.iter().all(Builder::is_empty))
            && self.security.is_empty()
            && self.notice.is_empty()
    }

    fn commit(&self, session: &Session) -> Result<Option<Component>> {
        if self.is_empty() {
            return Ok(None);
        }
        let fields = self.fields_for_commit(session)?;
        Component::build(session, self.kind, fields).map(Some)
    }
}

impl From<&Component> for ComponentBuilder {
    fn from(component: &Component) -> Self {
        Self::from_component(component)
    }
}

/// Mutable counterpart of a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBuilder {
    components: BTreeMap<ComponentKind, BuilderList<ComponentBuilder>>,
    pub resource: AttributeGroupBuilder,
    pub security: AttributeGroupBuilder,
    pub notice: AttributeGroupBuilder,
    pub extensions: Vec<Element>,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self {
            components: BTreeMap::new(),
            resource: AttributeGroupBuilder::new(GroupKind::Resource),
            security: AttributeGroupBuilder::new(GroupKind::Security),
            notice: AttributeGroupBuilder::new(GroupKind::Notice),
            extensions: Vec::new(),
        }
    }

    pub fn from_record(record: &Record) -> Self {
        let mut builder = Self::new();
        for component in record.components() {
            if component.kind() == ComponentKind::Extension {
                builder.extensions.push(component.element().clone());
            } else {
                builder
                    .components_mut(component.kind())
                    .push(ComponentBuilder::from_component(component));
            }
        }
        let attributes = record.attributes();
        if let Some(group) = &attributes.resource {
            builder.resource = AttributeGroupBuilder::from_group(group);
        }
        if let Some(group) = &attributes.security {
            builder.security = AttributeGroupBuilder::from_group(group);
        }
        if let Some(group) = &attributes.notice {
            builder.notice = AttributeGroupBuilder::from_group(group);
        }
        builder
    }

    pub fn components(&self, kind: ComponentKind) -> Option<&BuilderList<ComponentBuilder>> {
        self.components.get(&kind)
    }

    pub fn components_mut(&mut self, kind: ComponentKind) -> &mut BuilderList<ComponentBuilder> {
        self.components
            .entry(kind)
            .or_insert_with(|| BuilderList::with_template(ComponentBuilder::new(kind)))
    }
}

impl Builder for RecordBuilder {
    type Output = Record;

    fn is_empty(&self) -> bool {
        self.components
            .values()
            .all(|list| list.iter().all(Builder::is_empty))
            && self.resource.is_empty()
            && self.security.is_empty()
            && self.notice.is_empty()
            && self.extensions.is_empty()
    }

    fn commit(&self, session: &Session) -> Result<Option<Record>> {
        if self.is_empty() {
            return Ok(None);
        }
        let mut components = Vec::new();
        for builders in self.components.values() {
            for builder in builders.iter() {
                if let Some(component) = builder
                    .commit(session)
                    .map_err(|e| e.within(crate::record::RESOURCE_QNAME))?
                {
                    components.push(component);
                }
            }
        }
        for element in &self.extensions {
            components.push(Component::extension(session, element.clone())?);
        }
        let attributes = RecordAttributes {
            resource: self.resource.build(),
            security: self.security.build(),
            notice: self.notice.build(),
        };
        Record::new(session, components, attributes).map(Some)
    }
}

impl From<&Record> for RecordBuilder {
    fn from(record: &Record) -> Self {
        Self::from_record(record)
    }
}
