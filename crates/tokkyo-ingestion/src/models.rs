//! Data models for the ingestion pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokkyo_common::DescriptionSource;
use tokkyo_ner::{ChemicalAnalysis, LegalAnalysis};

use crate::validation::ValidationReport;

/// Identifier carried by every record and every derived training pair.
///
/// Authoritative ids come from the document's publication number. When that
/// is missing the extractor derives a stable id from the raw XML bytes and
/// marks it synthetic so downstream consumers can tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatentId {
    pub value: String,
    pub synthetic: bool,
}

impl PatentId {
    pub fn authoritative(value: impl Into<String>) -> Self {
        Self { value: value.into(), synthetic: false }
    }

    /// `synthetic-` followed by the first 12 hex digits of SHA-256(`raw`).
    pub fn synthetic_from(raw: &[u8]) -> Self {
        let digest = Sha256::digest(raw);
        let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
        Self { value: format!("synthetic-{hex}"), synthetic: true }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for PatentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// One claim as declared in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Declared number; usually numeric but not guaranteed.
    pub claim_number: String,
    pub claim_text: String,
}

impl Claim {
    /// Declared number when it is plain ASCII digits (no sign).
    pub fn number(&self) -> Option<u32> {
        let raw = self.claim_number.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        raw.parse().ok()
    }

    /// A claim is dependent when it refers back to another claim
    /// (`請求項1に記載の…`).
    pub fn is_dependent(&self) -> bool {
        self.claim_text.contains("請求項") && self.claim_text.contains("記載の")
    }
}

/// Derived text and analyses attached by the normaliser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub combined_text: String,
    pub sentences: Vec<String>,
    pub sentence_count: usize,
    pub claims_text: String,
    pub claims_count: usize,
    pub chemical_analysis: ChemicalAnalysis,
    pub legal_analysis: LegalAnalysis,
}

/// One parsed patent document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatentRecord {
    pub id: PatentId,
    /// Raw publication number; empty when the document carries none.
    pub patent_number: String,
    pub publication_date: String,
    pub filing_date: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub technical_field: String,
    pub background_art: String,
    pub summary: String,
    /// Text of exactly one description element, with `【NNNN】` markers.
    pub detailed_description: String,
    pub description_source: Option<DescriptionSource>,
    /// Document order.
    pub claims: Vec<Claim>,
    pub inventors: Vec<String>,
    pub applicants: Vec<String>,
    pub ipc_classification: Vec<String>,
    pub citations: Vec<String>,
    pub source_file: Option<String>,
    #[serde(default)]
    pub enrichment: Option<Enrichment>,
    #[serde(default)]
    pub validation: Option<ValidationReport>,
}

impl PatentRecord {
    /// Record with only an id; every text field empty.
    pub fn empty(id: PatentId) -> Self {
        Self {
            id,
            patent_number: String::new(),
            publication_date: String::new(),
            filing_date: String::new(),
            title: String::new(),
            abstract_text: String::new(),
            technical_field: String::new(),
            background_art: String::new(),
            summary: String::new(),
            detailed_description: String::new(),
            description_source: None,
            claims: vec![],
            inventors: vec![],
            applicants: vec![],
            ipc_classification: vec![],
            citations: vec![],
            source_file: None,
            enrichment: None,
            validation: None,
        }
    }

    /// Claims ordered by declared number. Non-numeric numbers follow the
    /// numeric ones, keeping their document order.
    pub fn sorted_claims(&self) -> Vec<&Claim> {
        let mut claims: Vec<&Claim> = self.claims.iter().collect();
        claims.sort_by_key(|c| match c.number() {
            Some(n) => (0, n),
            None => (1, 0),
        });
        claims
    }

    /// Text sections in reading order followed by every claim text.
    pub fn text_sections(&self) -> Vec<&str> {
        let mut parts = vec![
            self.title.as_str(),
            self.abstract_text.as_str(),
            self.technical_field.as_str(),
            self.background_art.as_str(),
            self.summary.as_str(),
            self.detailed_description.as_str(),
        ];
        parts.extend(self.claims.iter().map(|c| c.claim_text.as_str()));
        parts.retain(|p| !p.trim().is_empty());
        parts
    }

    pub fn is_valid(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(n: &str, text: &str) -> Claim {
        Claim { claim_number: n.to_string(), claim_text: text.to_string() }
    }

    #[test]
    fn test_synthetic_id_is_deterministic() {
        let a = PatentId::synthetic_from(b"<doc/>");
        let b = PatentId::synthetic_from(b"<doc/>");
        let c = PatentId::synthetic_from(b"<doc></doc>");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.synthetic);
        assert!(a.value.starts_with("synthetic-"));
        assert_eq!(a.value.len(), "synthetic-".len() + 12);
    }

    #[test]
    fn test_sorted_claims_numeric_order() {
        let mut record = PatentRecord::empty(PatentId::authoritative("JP1"));
        record.claims = vec![
            claim("10", "j"),
            claim("2", "b"),
            claim("x", "unnumbered"),
            claim("1", "a"),
        ];
        let order: Vec<&str> = record.sorted_claims().iter().map(|c| c.claim_number.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "10", "x"]);
    }

    #[test]
    fn test_claim_number_digits_only() {
        assert_eq!(claim(" 3 ", "c").number(), Some(3));
        assert_eq!(claim("+1", "c").number(), None);
        assert_eq!(claim("-1", "c").number(), None);
        assert_eq!(claim("", "c").number(), None);
    }

    #[test]
    fn test_dependent_claim_detection() {
        assert!(claim("2", "請求項1に記載の装置であって、").is_dependent());
        assert!(!claim("1", "基板を備える装置。").is_dependent());
    }

    #[test]
    fn test_text_sections_skip_empty() {
        let mut record = PatentRecord::empty(PatentId::authoritative("JP1"));
        record.title = "題名".into();
        record.claims = vec![claim("1", "請求")];
        assert_eq!(record.text_sections(), vec!["題名", "請求"]);
    }
}
