//! Minimal namespace-aware element tree built from `quick-xml` events.
//!
//! ST96 lookups are "first descendant with this expanded name", and the
//! description walk needs mixed content in order, so the document is
//! materialised once per file and dropped as soon as extraction ends.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tokkyo_common::{Result, TokkyoError};

/// Namespace URI + local name, e.g. (`…/ST96/Patent`, `Claims`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub namespace: String,
    pub local: String,
}

/// Prefix → URI map used to turn `pat:Claims` into an [`ExpandedName`].
#[derive(Debug, Clone)]
pub struct Namespaces {
    prefixes: BTreeMap<String, String>,
}

impl Namespaces {
    pub fn new(prefixes: BTreeMap<String, String>) -> Self {
        Self { prefixes }
    }

    /// Resolve `prefix:Local`. Unknown prefixes and unprefixed names fail.
    pub fn resolve(&self, qualified: &str) -> Option<ExpandedName> {
        let (prefix, local) = qualified.split_once(':')?;
        let namespace = self.prefixes.get(prefix)?;
        Some(ExpandedName {
            namespace: namespace.clone(),
            local: local.to_string(),
        })
    }

    /// Like [`resolve`](Self::resolve) but reports the missing prefix.
    pub fn require(&self, qualified: &str) -> Result<ExpandedName> {
        self.resolve(qualified).ok_or_else(|| {
            TokkyoError::Config(format!("cannot resolve '{qualified}' with the configured namespaces"))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    pub namespace: Option<String>,
    pub local_name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub local_name: String,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn is(&self, name: &ExpandedName) -> bool {
        self.local_name == name.local && self.namespace.as_deref() == Some(name.namespace.as_str())
    }

    /// First descendant (not self) named `name`, depth-first document order.
    pub fn find(&self, name: &ExpandedName) -> Option<&XmlElement> {
        for child in self.child_elements() {
            if child.is(name) {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant (not self) named `name`, document order.
    pub fn find_all<'a>(&'a self, name: &ExpandedName) -> Vec<&'a XmlElement> {
        let mut out = Vec::new();
        self.collect_named(name, &mut out);
        out
    }

    fn collect_named<'a>(&'a self, name: &ExpandedName, out: &mut Vec<&'a XmlElement>) {
        for child in self.child_elements() {
            if child.is(name) {
                out.push(child);
            }
            child.collect_named(name, out);
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Attribute by namespace URI (`None` = unqualified) and local name.
    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local_name == local && a.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    /// All descendant text in document order. `Br` elements become newlines.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) if e.local_name == "Br" => out.push('\n'),
                XmlNode::Element(e) => e.collect_text(out),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Parse a complete document. Any well-formedness error fails the parse.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut buf = Vec::new();

        loop {
            let (ns, event) = match reader.read_resolved_event_into(&mut buf) {
                Ok(resolved) => resolved,
                Err(e) => return Err(TokkyoError::Xml(e.to_string())),
            };
            let namespace = namespace_uri(&ns);

            match event {
                Event::Start(ref e) => {
                    stack.push(open_element(&reader, namespace, e)?);
                }
                Event::Empty(ref e) => {
                    let element = open_element(&reader, namespace, e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| TokkyoError::Xml("unexpected closing tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(ref e) => {
                    let text = e.unescape().map_err(|e| TokkyoError::Xml(e.to_string()))?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(text.into_owned()));
                    }
                }
                Event::CData(e) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                        parent.children.push(XmlNode::Text(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(TokkyoError::Xml(format!("unclosed element <{}>", open.local_name)));
        }
        let root = root.ok_or_else(|| TokkyoError::Xml("document has no root element".into()))?;
        Ok(Self { root })
    }
}

fn namespace_uri(ns: &ResolveResult) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

fn open_element<R>(reader: &NsReader<R>, namespace: Option<String>, start: &BytesStart) -> Result<XmlElement> {
    let local_name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| TokkyoError::Xml(e.to_string()))?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        let value = attr
            .unescape_value()
            .map_err(|e| TokkyoError::Xml(e.to_string()))?
            .into_owned();
        attributes.push(XmlAttribute {
            namespace: namespace_uri(&ns),
            local_name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value,
        });
    }

    Ok(XmlElement {
        namespace,
        local_name,
        attributes,
        children: vec![],
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(TokkyoError::Xml("multiple root elements".into())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokkyo_common::pipeline_config::{NS_COM, NS_PAT};

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<pat:Doc xmlns:pat="http://www.wipo.int/standards/XMLSchema/ST96/Patent"
         xmlns:com="http://www.wipo.int/standards/XMLSchema/ST96/Common">
  <pat:Outer>
    <pat:Target>first</pat:Target>
  </pat:Outer>
  <pat:Target>second</pat:Target>
  <com:P com:pNumber="0001">line<com:Br/>break &amp; more</com:P>
  <Plain pNumber="7"/>
</pat:Doc>"#;

    fn name(ns: &str, local: &str) -> ExpandedName {
        ExpandedName { namespace: ns.to_string(), local: local.to_string() }
    }

    #[test]
    fn test_find_is_depth_first_document_order() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let found = doc.root().find(&name(NS_PAT, "Target")).unwrap();
        assert_eq!(found.text(), "first");
        assert_eq!(doc.root().find_all(&name(NS_PAT, "Target")).len(), 2);
    }

    #[test]
    fn test_namespaced_attribute_and_br() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let p = doc.root().find(&name(NS_COM, "P")).unwrap();
        assert_eq!(p.attribute(Some(NS_COM), "pNumber"), Some("0001"));
        assert_eq!(p.attribute(None, "pNumber"), None);
        assert_eq!(p.text(), "line\nbreak & more");
    }

    #[test]
    fn test_unqualified_attribute() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let plain = doc.root().child_elements().find(|e| e.local_name == "Plain").unwrap();
        assert_eq!(plain.namespace, None);
        assert_eq!(plain.attribute(None, "pNumber"), Some("7"));
    }

    #[test]
    fn test_wrong_namespace_does_not_match() {
        let doc = XmlDocument::parse(DOC).unwrap();
        assert!(doc.root().find(&name(NS_COM, "Target")).is_none());
    }

    #[test]
    fn test_malformed_documents_fail() {
        assert!(XmlDocument::parse("<a><b></a>").is_err());
        assert!(XmlDocument::parse("<a>").is_err());
        assert!(XmlDocument::parse("").is_err());
    }

    #[test]
    fn test_namespace_resolution() {
        let ns = Namespaces::new(
            [("pat".to_string(), NS_PAT.to_string())].into_iter().collect(),
        );
        assert_eq!(ns.resolve("pat:Claims"), Some(name(NS_PAT, "Claims")));
        assert!(ns.resolve("com:P").is_none());
        assert!(ns.resolve("Claims").is_none());
        assert!(ns.require("jppat:Inventor").is_err());
    }
}
