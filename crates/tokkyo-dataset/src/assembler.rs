//! Claims → embodiment pairing.
//!
//! Entries are grouped by patent id in first-seen order; a later entry for
//! the same section replaces the earlier one. For each group the first
//! non-empty claims section and the first non-empty description section
//! (in configured order) are whitespace-normalised, truncated at marker
//! boundaries and kept only if both sides still meet their minimum length.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokkyo_common::{DatasetConfig, Result, TokkyoError};
use tracing::{debug, info, instrument};

use crate::sections::SectionEntry;
use crate::truncate::{char_len, Truncator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPair {
    pub patent_id: String,
    #[serde(default)]
    pub patent_id_synthetic: bool,
    pub claims_section: String,
    pub description_section: String,
    pub user_message: String,
    pub assistant_message: String,
}

/// Per-reason tallies for one assembly run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStats {
    pub groups: usize,
    pub paired: usize,
    pub no_claims: usize,
    pub no_description: usize,
    pub too_short: usize,
}

struct PatentGroup<'a> {
    patent_id: &'a str,
    synthetic: bool,
    sections: HashMap<&'a str, &'a str>,
}

pub struct DatasetAssembler {
    config: DatasetConfig,
    truncator: Truncator,
    whitespace: Regex,
}

impl DatasetAssembler {
    pub fn new(config: &DatasetConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            truncator: Truncator::new()?,
            whitespace: Regex::new(r"\s+").map_err(|e| TokkyoError::Config(e.to_string()))?,
        })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub fn assemble(&self, entries: &[SectionEntry]) -> (Vec<TrainingPair>, AssemblyStats) {
        let groups = group_by_patent(entries);
        let mut stats = AssemblyStats { groups: groups.len(), ..Default::default() };
        let mut pairs = Vec::new();

        for group in &groups {
            let Some((claims_section, claims)) = pick(group, &self.config.claims_sections) else {
                debug!(patent_id = group.patent_id, "No claims section, skipping");
                stats.no_claims += 1;
                continue;
            };
            let Some((description_section, description)) = pick(group, &self.config.description_sections) else {
                debug!(patent_id = group.patent_id, "No description section, skipping");
                stats.no_description += 1;
                continue;
            };

            let user_message = self
                .truncator
                .claims(&self.normalise_whitespace(claims), self.config.max_claims_length);
            let assistant_message = self
                .truncator
                .description(&self.normalise_whitespace(description), self.config.max_description_length);

            let (claims_len, description_len) = (char_len(&user_message), char_len(&assistant_message));
            if claims_len < self.config.min_claims_length || description_len < self.config.min_description_length {
                debug!(
                    patent_id = group.patent_id,
                    claims_len, description_len, "Pair too short after truncation"
                );
                stats.too_short += 1;
                continue;
            }

            stats.paired += 1;
            pairs.push(TrainingPair {
                patent_id: group.patent_id.to_string(),
                patent_id_synthetic: group.synthetic,
                claims_section: claims_section.to_string(),
                description_section: description_section.to_string(),
                user_message,
                assistant_message,
            });
        }

        info!(
            groups = stats.groups,
            paired = stats.paired,
            no_claims = stats.no_claims,
            no_description = stats.no_description,
            too_short = stats.too_short,
            "Pairing complete"
        );
        (pairs, stats)
    }

    fn normalise_whitespace(&self, text: &str) -> String {
        self.whitespace.replace_all(text, " ").trim().to_string()
    }
}

fn group_by_patent(entries: &[SectionEntry]) -> Vec<PatentGroup<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<PatentGroup<'_>> = Vec::new();
    for entry in entries {
        let slot = *index.entry(entry.patent_id.as_str()).or_insert_with(|| {
            groups.push(PatentGroup {
                patent_id: &entry.patent_id,
                synthetic: entry.patent_id_synthetic,
                sections: HashMap::new(),
            });
            groups.len() - 1
        });
        groups[slot].sections.insert(entry.section.as_str(), entry.text.as_str());
    }
    groups
}

/// First listed section whose text is not blank.
fn pick<'a, 'n>(group: &PatentGroup<'a>, names: &'n [String]) -> Option<(&'n str, &'a str)> {
    names.iter().find_map(|name| {
        group
            .sections
            .get(name.as_str())
            .filter(|text| !text.trim().is_empty())
            .map(|text| (name.as_str(), *text))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, section: &str, text: &str) -> SectionEntry {
        SectionEntry {
            patent_id: id.into(),
            patent_id_synthetic: false,
            section: section.into(),
            text: text.into(),
        }
    }

    fn assembler() -> DatasetAssembler {
        DatasetAssembler::new(&DatasetConfig::default()).unwrap()
    }

    fn claims_text() -> String {
        format!("【請求項1】{}", "基板を備える装置".repeat(5))
    }

    fn description_text() -> String {
        format!("【0010】\n{}", "本実施形態の説明である。".repeat(12))
    }

    #[test]
    fn test_pair_created() {
        let entries = vec![
            entry("JP1", "claims", &claims_text()),
            entry("JP1", "detailed_description", &description_text()),
        ];
        let (pairs, stats) = assembler().assemble(&entries);
        assert_eq!(stats, AssemblyStats { groups: 1, paired: 1, ..Default::default() });
        assert_eq!(pairs[0].claims_section, "claims");
        assert_eq!(pairs[0].description_section, "detailed_description");
        assert!(!pairs[0].assistant_message.contains('\n'));
    }

    #[test]
    fn test_skip_reasons_counted() {
        let entries = vec![
            entry("A", "detailed_description", &description_text()),
            entry("B", "claims", &claims_text()),
            entry("C", "claims", "短い"),
            entry("C", "detailed_description", &description_text()),
            entry("D", "abstract", "要約"),
        ];
        let (pairs, stats) = assembler().assemble(&entries);
        assert!(pairs.is_empty());
        assert_eq!(stats.groups, 4);
        assert_eq!(stats.no_claims, 2);
        assert_eq!(stats.no_description, 1);
        assert_eq!(stats.too_short, 1);
    }

    #[test]
    fn test_section_priority_no_merge() {
        let entries = vec![
            entry("JP1", "claim", "請求項のみの単独セクションで使われないテキストです。"),
            entry("JP1", "claims", &claims_text()),
            entry("JP1", "embodiment", "使われない実施形態"),
            entry("JP1", "detailed_description", &description_text()),
        ];
        let (pairs, _) = assembler().assemble(&entries);
        assert_eq!(pairs[0].claims_section, "claims");
        assert!(!pairs[0].user_message.contains("単独セクション"));
        assert!(!pairs[0].assistant_message.contains("使われない"));
    }

    #[test]
    fn test_blank_section_falls_through() {
        let entries = vec![
            entry("JP1", "claims", "   "),
            entry("JP1", "claim", &claims_text()),
            entry("JP1", "detailed_description", &description_text()),
        ];
        let (pairs, _) = assembler().assemble(&entries);
        assert_eq!(pairs[0].claims_section, "claim");
    }

    #[test]
    fn test_later_duplicate_overwrites_first_seen_order_kept() {
        let entries = vec![
            entry("B", "claims", "古い"),
            entry("A", "claims", &claims_text()),
            entry("A", "detailed_description", &description_text()),
            entry("B", "detailed_description", &description_text()),
            entry("B", "claims", &claims_text()),
        ];
        let (pairs, stats) = assembler().assemble(&entries);
        assert_eq!(stats.paired, 2);
        let ids: Vec<&str> = pairs.iter().map(|p| p.patent_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let entries = vec![
            entry("JP1", "claims", &claims_text()),
            entry("JP1", "detailed_description", &description_text()),
            entry("JP2", "claims", &claims_text()),
        ];
        let a = assembler();
        assert_eq!(a.assemble(&entries), a.assemble(&entries));
    }

    #[test]
    fn test_sides_truncated_to_limits() {
        let long_claims: String = (1..=20)
            .map(|n| format!("【請求項{n}】{}", "基板を備える装置".repeat(8)))
            .collect();
        let long_description: String = (1..=20)
            .map(|n| format!("【{n:04}】{}", "本実施形態の説明である。".repeat(10)))
            .collect();
        let entries = vec![
            entry("JP1", "claims", &long_claims),
            entry("JP1", "detailed_description", &long_description),
        ];
        let (pairs, _) = assembler().assemble(&entries);
        let config = DatasetConfig::default();
        assert!(char_len(&pairs[0].user_message) <= config.max_claims_length);
        assert!(char_len(&pairs[0].assistant_message) <= config.max_description_length);
        assert!(pairs[0].user_message.starts_with("【請求項1】"));
    }
}
