//! Raw element tree
//!
//! Components wrap an [`Element`]: a namespace-aware XML element with
//! attributes, text and child elements. Trees are produced by an external XML
//! parser, by JSON documents (`serde`), or by component synthesis, and can be
//! written back out as XML text.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// A namespace-qualified or unqualified attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, self.name),
            _ => self.name.clone(),
        }
    }
}

/// Content of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub prefix: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(
        prefix: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
            namespace: namespace.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.prefix, self.name)
        }
    }

    /// Finds an attribute by namespace (`None` for unqualified) and local name.
    pub fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    /// Sets an attribute, replacing any existing one with the same namespace and name.
    pub fn set_attribute(
        &mut self,
        prefix: Option<&str>,
        namespace: Option<&str>,
        name: &str,
        value: impl Into<String>,
    ) {
        let value = value.into();
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.name == name && a.namespace.as_deref() == namespace)
        {
            existing.value = value;
            return;
        }
        self.attributes.push(Attribute {
            namespace: namespace.map(str::to_string),
            prefix: prefix.map(str::to_string),
            name: name.to_string(),
            value,
        });
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn push_element(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn child_elements_named<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements()
            .filter(move |e| e.namespace == namespace && e.name == name)
    }

    /// Concatenation of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Writes this tree as XML text, declaring every namespace in use on the root.
    pub fn to_xml(&self) -> String {
        let mut declarations = BTreeMap::new();
        self.collect_namespaces(&mut declarations);

        let mut out = String::new();
        self.write_xml(&mut out, Some(&declarations), 0);
        out
    }

    fn collect_namespaces(&self, declarations: &mut BTreeMap<String, String>) {
        if !self.namespace.is_empty() {
            declarations
                .entry(self.prefix.clone())
                .or_insert_with(|| self.namespace.clone());
        }
        for attribute in &self.attributes {
            if let (Some(prefix), Some(namespace)) = (&attribute.prefix, &attribute.namespace) {
                declarations
                    .entry(prefix.clone())
                    .or_insert_with(|| namespace.clone());
            }
        }
        for child in self.child_elements() {
            child.collect_namespaces(declarations);
        }
    }

    fn write_xml(&self, out: &mut String, declarations: Option<&BTreeMap<String, String>>, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{}<{}", indent, self.qualified_name());
        if let Some(declarations) = declarations {
            for (prefix, namespace) in declarations {
                if prefix.is_empty() {
                    let _ = write!(out, " xmlns=\"{}\"", escape(namespace));
                } else {
                    let _ = write!(out, " xmlns:{}=\"{}\"", prefix, escape(namespace));
                }
            }
        }
        for attribute in &self.attributes {
            let _ = write!(
                out,
                " {}=\"{}\"",
                attribute.qualified_name(),
                escape(&attribute.value)
            );
        }

        if self.children.is_empty() {
            out.push_str(" />\n");
            return;
        }

        let has_elements = self.child_elements().next().is_some();
        if !has_elements {
            let _ = writeln!(out, ">{}</{}>", escape(&self.text()), self.qualified_name());
            return;
        }

        out.push_str(">\n");
        for node in &self.children {
            match node {
                Node::Element(child) => child.write_xml(out, None, depth + 1),
                Node::Text(text) if !text.trim().is_empty() => {
                    let _ = writeln!(out, "{}  {}", indent, escape(text.trim()));
                }
                Node::Text(_) => {}
            }
        }
        let _ = writeln!(out, "{}</{}>", indent, self.qualified_name());
    }
}

/// Escapes the five XML special characters.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
