//! Description section resolution.
//!
//! A record's `detailed_description` comes from exactly one element. The
//! [`ResolverChain`] asks each [`SectionResolver`] in priority order and takes
//! the first non-empty answer; texts from different elements are never merged.

use tokkyo_common::pipeline_config::NS_COM;
use tokkyo_common::{DescriptionSource, ExtractionConfig, Result};
use tracing::debug;

use super::tree::{ExpandedName, Namespaces, XmlElement, XmlNode};
use super::TextTidy;

/// One candidate source for the description section.
pub trait SectionResolver: Send + Sync {
    /// Which description element this resolver reads.
    fn source(&self) -> DescriptionSource;

    /// Extracted text, or `None` when the element is absent or blank.
    fn resolve(&self, root: &XmlElement) -> Option<String>;
}

/// Flattens a description element into marker-prefixed paragraphs.
///
/// `P` elements with a numeric `pNumber` become `【NNNN】\n<text>`; other `P`
/// elements contribute their text alone; wrappers are descended into. Parts
/// are separated by a blank line.
#[derive(Debug, Clone)]
pub struct ParagraphWalker {
    tidy: TextTidy,
    number_namespace: String,
}

impl ParagraphWalker {
    pub fn new(tidy: TextTidy) -> Self {
        Self {
            tidy,
            number_namespace: NS_COM.to_string(),
        }
    }

    /// Paragraph numbers live in `com:pNumber`; use another namespace here
    /// when the configured `com` prefix points elsewhere.
    pub fn with_number_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.number_namespace = namespace.into();
        self
    }

    pub fn walk(&self, element: &XmlElement) -> String {
        let mut parts = Vec::new();
        self.collect(element, &mut parts);
        parts.join("\n\n")
    }

    fn collect(&self, element: &XmlElement, parts: &mut Vec<String>) {
        for child in &element.children {
            match child {
                XmlNode::Text(raw) => {
                    let text = self.tidy.apply(raw);
                    if !text.is_empty() {
                        parts.push(text);
                    }
                }
                XmlNode::Element(p) if p.local_name == "P" => {
                    let text = self.tidy.element_text(p);
                    if text.is_empty() {
                        continue;
                    }
                    match self.paragraph_number(p) {
                        Some(number) => parts.push(format!("【{number:0>4}】\n{text}")),
                        None => parts.push(text),
                    }
                }
                XmlNode::Element(wrapper) => self.collect(wrapper, parts),
            }
        }
    }

    /// Digits of `pNumber` with surplus leading zeros dropped, so `00123`
    /// renders as `【0123】`.
    fn paragraph_number<'a>(&self, p: &'a XmlElement) -> Option<&'a str> {
        let raw = p
            .attribute(Some(self.number_namespace.as_str()), "pNumber")
            .or_else(|| p.attribute(None, "pNumber"))?
            .trim();
        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let keep = raw.trim_start_matches('0').len().max(4).min(raw.len());
        Some(&raw[raw.len() - keep..])
    }
}

/// Resolves one description element by expanded name.
pub struct TagResolver {
    source: DescriptionSource,
    name: ExpandedName,
    walker: ParagraphWalker,
}

impl TagResolver {
    pub fn new(source: DescriptionSource, namespaces: &Namespaces, walker: ParagraphWalker) -> Result<Self> {
        Ok(Self {
            source,
            name: namespaces.require(source.qualified_name())?,
            walker,
        })
    }
}

impl SectionResolver for TagResolver {
    fn source(&self) -> DescriptionSource {
        self.source
    }

    fn resolve(&self, root: &XmlElement) -> Option<String> {
        let element = root.find(&self.name)?;
        let text = self.walker.walk(element);
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Ordered list of description resolvers.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn SectionResolver>>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<Box<dyn SectionResolver>>) -> Self {
        Self { resolvers }
    }

    /// One [`TagResolver`] per configured source, in configured order.
    pub fn from_config(config: &ExtractionConfig, namespaces: &Namespaces, walker: &ParagraphWalker) -> Result<Self> {
        let resolvers = config
            .description_sources
            .iter()
            .map(|&source| {
                TagResolver::new(source, namespaces, walker.clone())
                    .map(|r| Box::new(r) as Box<dyn SectionResolver>)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { resolvers })
    }

    pub fn sources(&self) -> Vec<DescriptionSource> {
        self.resolvers.iter().map(|r| r.source()).collect()
    }

    /// First resolver that yields text wins.
    pub fn resolve(&self, root: &XmlElement) -> Option<(DescriptionSource, String)> {
        for resolver in &self.resolvers {
            if let Some(text) = resolver.resolve(root) {
                debug!(source = %resolver.source(), chars = text.chars().count(), "Description resolved");
                return Some((resolver.source(), text));
            }
        }
        None
    }
}
