//! ST96 document → [`PatentRecord`].
//!
//! Field locations (first descendant match, document order):
//!   pat:PublicationNumber, com:PublicationDate, pat:FilingDate,
//!   pat:InventionTitle, pat:Abstract, pat:TechnicalField, pat:BackgroundArt,
//!   pat:Summary, pat:Claims//pat:Claim, jppat:Inventor//com:EntityName,
//!   jppat:Applicant//com:EntityName, pat:MainClassification,
//!   com:PatentCitationText
//!
//! The description goes through the [`ResolverChain`].

use std::path::Path;

use tokkyo_common::{ExtractionConfig, Result, TokkyoError};
use tracing::{debug, instrument, warn};

use super::resolver::{ParagraphWalker, ResolverChain};
use super::tree::{ExpandedName, Namespaces, XmlDocument, XmlElement};
use super::TextTidy;
use crate::models::{Claim, PatentId, PatentRecord};

const BOM: char = '\u{feff}';

/// Expanded names of every element the extractor reads.
struct FieldNames {
    publication_number: ExpandedName,
    publication_date: ExpandedName,
    filing_date: ExpandedName,
    title: ExpandedName,
    abstract_text: ExpandedName,
    technical_field: ExpandedName,
    background_art: ExpandedName,
    summary: ExpandedName,
    claims: ExpandedName,
    claim: ExpandedName,
    claim_number: ExpandedName,
    claim_text: ExpandedName,
    inventor: ExpandedName,
    applicant: ExpandedName,
    entity_name: ExpandedName,
    main_classification: ExpandedName,
    citation_text: ExpandedName,
}

impl FieldNames {
    fn resolve(ns: &Namespaces) -> Result<Self> {
        Ok(Self {
            publication_number: ns.require("pat:PublicationNumber")?,
            publication_date: ns.require("com:PublicationDate")?,
            filing_date: ns.require("pat:FilingDate")?,
            title: ns.require("pat:InventionTitle")?,
            abstract_text: ns.require("pat:Abstract")?,
            technical_field: ns.require("pat:TechnicalField")?,
            background_art: ns.require("pat:BackgroundArt")?,
            summary: ns.require("pat:Summary")?,
            claims: ns.require("pat:Claims")?,
            claim: ns.require("pat:Claim")?,
            claim_number: ns.require("pat:ClaimNumber")?,
            claim_text: ns.require("pat:ClaimText")?,
            inventor: ns.require("jppat:Inventor")?,
            applicant: ns.require("jppat:Applicant")?,
            entity_name: ns.require("com:EntityName")?,
            main_classification: ns.require("pat:MainClassification")?,
            citation_text: ns.require("com:PatentCitationText")?,
        })
    }
}

pub struct St96Extractor {
    names: FieldNames,
    tidy: TextTidy,
    chain: ResolverChain,
    max_description_length: usize,
}

impl St96Extractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let namespaces = Namespaces::new(config.namespaces.clone());
        let tidy = TextTidy::new()?;
        let mut walker = ParagraphWalker::new(tidy.clone());
        if let Some(com) = config.namespaces.get("com") {
            walker = walker.with_number_namespace(com.clone());
        }
        Ok(Self {
            names: FieldNames::resolve(&namespaces)?,
            chain: ResolverChain::from_config(config, &namespaces, &walker)?,
            tidy,
            max_description_length: config.max_description_length,
        })
    }

    /// Replace the description resolver chain.
    pub fn with_chain(mut self, chain: ResolverChain) -> Self {
        self.chain = chain;
        self
    }

    /// Read and extract one file. Only UTF-8 input is accepted.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn extract_file(&self, path: impl AsRef<Path>) -> Result<PatentRecord> {
        let path = path.as_ref();
        let raw = std::fs::read(path)?;
        let xml = std::str::from_utf8(&raw)
            .map_err(|e| TokkyoError::Xml(format!("{} is not valid UTF-8: {e}", path.display())))?;
        self.extract_document(&raw, xml, Some(path.display().to_string()))
    }

    pub fn extract_str(&self, xml: &str, source_file: Option<String>) -> Result<PatentRecord> {
        self.extract_document(xml.as_bytes(), xml, source_file)
    }

    fn extract_document(&self, raw: &[u8], xml: &str, source_file: Option<String>) -> Result<PatentRecord> {
        let xml = xml.strip_prefix(BOM).unwrap_or(xml);
        let doc = XmlDocument::parse(xml)?;
        let root = doc.root();
        let n = &self.names;

        let patent_number = self.first_text(root, &n.publication_number);
        let id = if patent_number.is_empty() {
            let id = PatentId::synthetic_from(raw);
            warn!(id = %id, "Document has no publication number, using synthetic id");
            id
        } else {
            PatentId::authoritative(patent_number.clone())
        };

        let mut record = PatentRecord::empty(id);
        record.patent_number = patent_number;
        record.publication_date = self.first_text(root, &n.publication_date);
        record.filing_date = self.first_text(root, &n.filing_date);
        record.title = self.first_text(root, &n.title);
        record.abstract_text = self.first_text(root, &n.abstract_text);
        record.technical_field = self.first_text(root, &n.technical_field);
        record.background_art = self.first_text(root, &n.background_art);
        record.summary = self.first_text(root, &n.summary);
        record.claims = self.claims(root);
        record.inventors = self.entity_names(root, &n.inventor);
        record.applicants = self.entity_names(root, &n.applicant);
        record.ipc_classification = self.all_texts(root, &n.main_classification);
        record.citations = self.all_texts(root, &n.citation_text);
        record.source_file = source_file;

        if let Some((source, text)) = self.chain.resolve(root) {
            record.detailed_description = self.cap_description(text);
            record.description_source = Some(source);
        }

        debug!(
            id = %record.id,
            claims = record.claims.len(),
            description_chars = record.detailed_description.chars().count(),
            "Document extracted"
        );
        Ok(record)
    }

    fn first_text(&self, root: &XmlElement, name: &ExpandedName) -> String {
        root.find(name)
            .map(|e| self.tidy.element_text(e))
            .unwrap_or_default()
    }

    fn all_texts(&self, root: &XmlElement, name: &ExpandedName) -> Vec<String> {
        root.find_all(name)
            .into_iter()
            .map(|e| self.tidy.element_text(e))
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn entity_names(&self, root: &XmlElement, party: &ExpandedName) -> Vec<String> {
        root.find_all(party)
            .into_iter()
            .flat_map(|p| self.all_texts(p, &self.names.entity_name))
            .collect()
    }

    fn claims(&self, root: &XmlElement) -> Vec<Claim> {
        let Some(claims) = root.find(&self.names.claims) else {
            return vec![];
        };
        claims
            .find_all(&self.names.claim)
            .into_iter()
            .filter_map(|claim| {
                let claim_text = self.first_text(claim, &self.names.claim_text);
                if claim_text.is_empty() {
                    return None;
                }
                Some(Claim {
                    claim_number: self.first_text(claim, &self.names.claim_number),
                    claim_text,
                })
            })
            .collect()
    }

    /// Safety bound: cut to `cap - 3` chars plus `...`.
    fn cap_description(&self, text: String) -> String {
        let cap = self.max_description_length;
        let chars = text.chars().count();
        if chars <= cap {
            return text;
        }
        warn!(chars, cap, "Description exceeds hard cap, truncating");
        let mut cut: String = text.chars().take(cap.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}
