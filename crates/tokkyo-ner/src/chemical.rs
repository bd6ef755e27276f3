//! Chemical notation recognition.
//!
//! Patterns are grouped by [`ChemicalCategory`] and scanned in a fixed order.
//! A raw regex hit becomes an entity only if it passes two gates:
//!
//! 1. **token gate**: the hit must not touch another ASCII letter or digit,
//!    otherwise it is a fragment of a longer token (`CHEMICAL6479MICA` yields
//!    dozens of element-symbol hits, none of them real);
//! 2. **context gate**: see [`KeywordContext`].
//!
//! Surviving hits are de-overlapped, earliest start first.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::KeywordContext;
use crate::entity_types::ChemicalCategory;
use crate::{round3, Result};

const ORGANIC_MOLECULAR: &[&str] = &[
    r"C\d{1,3}H\d{1,3}(?:O\d{1,2})?(?:N\d{1,2})?(?:S\d{1,2})?(?:P\d{1,2})?(?:Cl\d{1,2})?(?:Br\d{1,2})?(?:F\d{1,2})?(?:I\d{1,2})?",
    r"(?:CH₃|CH₂|CH|C)(?:[-–](?:CH₃|CH₂|CH|C))*",
    r"R₁|R₂|R₃|R₄|X|Y|Z",
];

const INORGANIC_COMPOUND: &[&str] = &[
    r"H₂SO₄|HCl|HNO₃|H₃PO₄|NH₃|NaOH|KOH|Ca\(OH\)₂",
    r"NaCl|KCl|CaCl₂|MgSO₄|Na₂CO₃|K₂CO₃|NaHCO₃",
    r"TiO₂|SiO₂|Al₂O₃|Fe₂O₃|CuO|ZnO|MgO|CaO",
    r"[A-Z][a-z]?(?:\d+)?(?:[+-]\d*)?",
];

const POLYMER: &[&str] = &[
    r"\[-(?:CH₂[-–]CH₂[-–]|CH₂[-–]CHR[-–]|CH₂[-–]CR₂[-–])+\]ₙ",
    // longest abbreviations first so PET is not read as PE
    r"PMMA|PTFE|PVC|PET|PE|PP|PS|PA|PC|PU",
    r"Mw\s*[=:]\s*\d+(?:[,，]\d+)*|Mn\s*[=:]\s*\d+(?:[,，]\d+)*",
    r"重合度\s*[=:]\s*\d+(?:[,，]\d+)*",
];

const REACTION: &[&str] = &[
    r"[A-Z][a-z]?\d*(?:\s*[+＋]\s*[A-Z][a-z]?\d*)*\s*[→⇒]\s*[A-Z][a-z]?\d*(?:\s*[+＋]\s*[A-Z][a-z]?\d*)*",
    r"[A-Z][a-z]?\d*\s*[⇌⇔]\s*[A-Z][a-z]?\d*",
    r"[A-Z][a-z]?\d*\s*[→⇒]\s*[A-Z][a-z]?\d*\s*/\s*[A-Z][a-z]?",
];

const PROPERTY: &[&str] = &[
    r"融点\s*[=:：]?\s*\d+(?:\.\d+)?(?:[～〜~]\d+(?:\.\d+)?)?\s*℃",
    r"沸点\s*[=:：]?\s*\d+(?:\.\d+)?(?:[～〜~]\d+(?:\.\d+)?)?\s*℃",
    r"\d+(?:\.\d+)?\s*(?:wt%|重量%|質量%|mol%|体積%|重量％|質量％|体積％)",
    r"純度\s*[=:：]?\s*\d+(?:\.\d+)?\s*%以上",
    r"pH\s*[=:：]?\s*\d+(?:\.\d+)?(?:[～〜~]\d+(?:\.\d+)?)?",
    r"pKa\s*[=:：]?\s*\d+(?:\.\d+)?",
    r"収率\s*[=:：]?\s*\d+(?:\.\d+)?\s*%",
    r"選択性\s*[=:：]?\s*\d+(?:\.\d+)?\s*%",
];

const CONDITION: &[&str] = &[
    r"\d+(?:\.\d+)?\s*℃(?:で|にて|において|に|下で)",
    r"\d+(?:\.\d+)?\s*(?:MPa|kPa|mmHg|Torr|Pa|atm)(?:で|にて|において|に|下で)",
    r"\d+(?:\.\d+)?\s*(?:時間|分|秒|hr|min|sec)(?:反応させ|加熱し|撹拌し|処理し)",
    r"(?:オートクレーブ|反応器|蒸留塔|分離塔|カラム|反応釜)(?:中で|内で|にて)",
];

fn category_patterns(category: ChemicalCategory) -> &'static [&'static str] {
    match category {
        ChemicalCategory::OrganicMolecular  => ORGANIC_MOLECULAR,
        ChemicalCategory::InorganicCompound => INORGANIC_COMPOUND,
        ChemicalCategory::Polymer           => POLYMER,
        ChemicalCategory::Reaction          => REACTION,
        ChemicalCategory::Property          => PROPERTY,
        ChemicalCategory::Condition         => CONDITION,
    }
}

/// A chemical span. `start`/`end` are byte offsets into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemicalEntity {
    pub text: String,
    pub category: ChemicalCategory,
    pub start: usize,
    pub end: usize,
}

impl ChemicalEntity {
    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Summary of the chemical content of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemicalAnalysis {
    /// `false` when chemical processing was switched off for the run.
    pub enabled: bool,
    pub total_entities: usize,
    pub unique_formulas: usize,
    pub category_counts: BTreeMap<ChemicalCategory, usize>,
    pub complexity_score: f64,
    pub entities: Vec<ChemicalEntity>,
}

impl ChemicalAnalysis {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            total_entities: 0,
            unique_formulas: 0,
            category_counts: BTreeMap::new(),
            complexity_score: 0.0,
            entities: vec![],
        }
    }
}

pub struct ChemicalRecognizer {
    patterns: Vec<(ChemicalCategory, Regex)>,
    context: KeywordContext,
}

impl ChemicalRecognizer {
    /// Build with the given context window (characters on each side).
    pub fn new(context_window: usize) -> Result<Self> {
        let mut patterns = Vec::new();
        for category in ChemicalCategory::ALL {
            for pattern in category_patterns(category) {
                patterns.push((category, Regex::new(pattern)?));
            }
        }
        debug!(patterns = patterns.len(), "Chemical recognizer ready");
        Ok(Self {
            patterns,
            context: KeywordContext::new(context_window)?,
        })
    }

    /// Every raw hit that passes both gates, before overlap removal.
    pub fn candidates(&self, text: &str) -> Vec<ChemicalEntity> {
        let mut found = Vec::new();
        for (category, re) in &self.patterns {
            for m in re.find_iter(text) {
                if m.as_str().trim().is_empty() {
                    continue;
                }
                if !is_standalone_token(text, m.start(), m.end()) {
                    continue;
                }
                if !self.context.score(text, m.start(), m.end()).is_chemical() {
                    continue;
                }
                found.push(ChemicalEntity {
                    text: m.as_str().to_string(),
                    category: *category,
                    start: m.start(),
                    end: m.end(),
                });
            }
        }
        found
    }

    /// Gated, non-overlapping entities in text order.
    pub fn extract(&self, text: &str) -> Vec<ChemicalEntity> {
        remove_overlapping(self.candidates(text))
    }

    pub fn analyze(&self, text: &str) -> ChemicalAnalysis {
        let entities = self.extract(text);

        let mut category_counts = BTreeMap::new();
        for e in &entities {
            *category_counts.entry(e.category).or_insert(0) += 1;
        }
        let mut formulas: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();
        formulas.sort_unstable();
        formulas.dedup();

        ChemicalAnalysis {
            enabled: true,
            total_entities: entities.len(),
            unique_formulas: formulas.len(),
            category_counts,
            complexity_score: complexity_score(&entities),
            entities,
        }
    }
}

/// Weighted mean of per-entity complexity, capped at 1.0.
///
/// Each entity contributes `weight(category) * (1 + min(chars / 20, 1))`.
pub fn complexity_score(entities: &[ChemicalEntity]) -> f64 {
    if entities.is_empty() {
        return 0.0;
    }
    let total: f64 = entities
        .iter()
        .map(|e| {
            let length_factor = (e.char_len() as f64 / 20.0).min(1.0);
            e.category.complexity_weight() * (1.0 + length_factor)
        })
        .sum();
    round3((total / entities.len() as f64).min(1.0))
}

fn is_standalone_token(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_alphanumeric())
        && !after.is_some_and(|c| c.is_ascii_alphanumeric())
}

/// Keep the earliest-starting entity of each overlapping group (longest on ties).
fn remove_overlapping(mut entities: Vec<ChemicalEntity>) -> Vec<ChemicalEntity> {
    entities.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| (b.end - b.start).cmp(&(a.end - a.start)))
    });

    let mut result = Vec::new();
    let mut last_end = 0;
    for entity in entities {
        if entity.start >= last_end {
            last_end = entity.end;
            result.push(entity);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognizer() -> ChemicalRecognizer {
        ChemicalRecognizer::new(20).unwrap()
    }

    #[test]
    fn test_formula_in_chemical_context() {
        let entities = recognizer().extract("化合物C6H12O6を反応させた");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "C6H12O6");
        assert_eq!(entities[0].category, ChemicalCategory::OrganicMolecular);
    }

    #[test]
    fn test_noise_token_is_not_chemical() {
        let entities = recognizer().extract("CHEMICAL6479MICA溶液を精製する");
        assert!(entities.is_empty(), "got {entities:?}");
    }

    #[test]
    fn test_formula_without_context_rejected() {
        assert!(recognizer().extract("図3の項目 NaCl を参照").is_empty());
    }

    #[test]
    fn test_property_needs_surrounding_context() {
        assert!(recognizer().extract("純度99%以上").is_empty());
        let entities = recognizer().extract("精製した化合物は純度99%以上であった");
        assert!(entities.iter().any(|e| e.text == "純度99%以上"));
    }

    #[test]
    fn test_inorganic_and_condition() {
        let text = "NaCl水溶液を80℃で加熱し、反応生成物を精製した";
        let entities = recognizer().extract(text);
        let texts: Vec<&str> = entities.iter().map(|e| e.text.as_str()).collect();
        assert!(texts.contains(&"NaCl"));
        assert!(texts.contains(&"80℃で"));
    }

    #[test]
    fn test_polymer_prefers_full_abbreviation() {
        let entities = recognizer().extract("原料としてPETを重合する");
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].text, "PET");
        assert_eq!(entities[0].category, ChemicalCategory::Polymer);
    }

    #[test]
    fn test_overlap_keeps_earliest_longest() {
        let entities = vec![
            ChemicalEntity { text: "C6".into(), category: ChemicalCategory::InorganicCompound, start: 0, end: 2 },
            ChemicalEntity { text: "H12".into(), category: ChemicalCategory::InorganicCompound, start: 2, end: 5 },
            ChemicalEntity { text: "C6H12O6".into(), category: ChemicalCategory::OrganicMolecular, start: 0, end: 7 },
        ];
        let kept = remove_overlapping(entities);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "C6H12O6");
    }

    #[test]
    fn test_complexity_score() {
        let entities = vec![
            // 7 chars: 0.3 * (1 + 0.35) = 0.405
            ChemicalEntity { text: "C6H12O6".into(), category: ChemicalCategory::OrganicMolecular, start: 0, end: 7 },
            // 4 chars: 0.2 * (1 + 0.2) = 0.24
            ChemicalEntity { text: "NaCl".into(), category: ChemicalCategory::InorganicCompound, start: 10, end: 14 },
            // 3 chars: 0.4 * (1 + 0.15) = 0.46
            ChemicalEntity { text: "PET".into(), category: ChemicalCategory::Polymer, start: 20, end: 23 },
        ];
        assert_eq!(complexity_score(&entities), 0.368);
        assert_eq!(complexity_score(&[]), 0.0);

        let long_reaction = ChemicalEntity {
            text: "A".repeat(40),
            category: ChemicalCategory::Reaction,
            start: 0,
            end: 40,
        };
        assert_eq!(complexity_score(&[long_reaction]), 1.0);
    }

    #[test]
    fn test_analysis_counts() {
        let analysis = recognizer().analyze("化合物C6H12O6とNaClの溶液を反応させた");
        assert!(analysis.enabled);
        assert_eq!(analysis.total_entities, analysis.entities.len());
        assert!(analysis.category_counts.contains_key(&ChemicalCategory::OrganicMolecular));
        assert!(analysis.complexity_score > 0.0 && analysis.complexity_score <= 1.0);
    }
}
