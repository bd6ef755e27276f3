//! JPO ST96 patent XML extraction.
//!
//! [`tree`] materialises one document, [`resolver`] picks the description
//! element through an ordered resolver chain, and [`extract`] maps the
//! remaining ST96 elements onto a [`PatentRecord`](crate::models::PatentRecord).

pub mod extract;
pub mod resolver;
pub mod tree;

pub use extract::St96Extractor;
pub use resolver::{ParagraphWalker, ResolverChain, SectionResolver, TagResolver};
pub use tree::{ExpandedName, Namespaces, XmlDocument, XmlElement, XmlNode};

use regex::Regex;
use tokkyo_common::{Result, TokkyoError};

/// Tidies element text: strips leftover markup, collapses horizontal
/// whitespace to one space and newline runs to one newline, then trims.
#[derive(Debug, Clone)]
pub struct TextTidy {
    markup: Regex,
    horizontal: Regex,
    newlines: Regex,
}

impl TextTidy {
    pub fn new() -> Result<Self> {
        let compile = |p: &str| Regex::new(p).map_err(|e| TokkyoError::Config(e.to_string()));
        Ok(Self {
            markup: compile(r"</?[A-Za-z_][^<>]*>")?,
            horizontal: compile(r"[^\S\n]+")?,
            newlines: compile(r"[^\S\n]*\n\s*")?,
        })
    }

    pub fn apply(&self, raw: &str) -> String {
        let text = self.markup.replace_all(raw, "");
        let text = self.horizontal.replace_all(&text, " ");
        let text = self.newlines.replace_all(&text, "\n");
        text.trim().to_string()
    }

    /// Tidied text of an element, `Br` children counted as newlines.
    pub fn element_text(&self, element: &XmlElement) -> String {
        self.apply(&element.text())
    }
}
