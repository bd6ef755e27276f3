//! Flat `{patent_id, section, text}` entries, the input to pairing.

use serde::{Deserialize, Serialize};
use tokkyo_ingestion::PatentRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEntry {
    pub patent_id: String,
    #[serde(default)]
    pub patent_id_synthetic: bool,
    pub section: String,
    pub text: String,
}

/// Fixed text sections, one `claim_<n>` entry per claim, and a combined
/// `claims` entry of `【請求項N】text` lines in claim-number order.
pub fn build_sections(record: &PatentRecord) -> Vec<SectionEntry> {
    let entry = |section: &str, text: &str| SectionEntry {
        patent_id: record.id.value.clone(),
        patent_id_synthetic: record.id.synthetic,
        section: section.to_string(),
        text: text.to_string(),
    };

    let mut entries = vec![
        entry("title", &record.title),
        entry("abstract", &record.abstract_text),
        entry("technical_field", &record.technical_field),
        entry("background_art", &record.background_art),
        entry("detailed_description", &record.detailed_description),
    ];

    for claim in &record.claims {
        entries.push(entry(&format!("claim_{}", claim.claim_number), &claim.claim_text));
    }

    let combined: Vec<String> = record
        .sorted_claims()
        .into_iter()
        .filter(|c| !c.claim_text.is_empty())
        .map(|c| {
            if c.claim_number.is_empty() {
                c.claim_text.clone()
            } else {
                format!("【請求項{}】{}", c.claim_number, c.claim_text)
            }
        })
        .collect();
    if !combined.is_empty() {
        entries.push(entry("claims", &combined.join("\n")));
    }

    entries
}
