//! Japanese patent legal phrasing.
//!
//! Open-ended phrases (`前記…`, `において…`) extend up to the next clause
//! break, whitespace, bracket marker or markup character so a phrase never
//! swallows a paragraph marker.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity_types::{Importance, LegalCategory};
use crate::{round3, NerError, Result};

const CLAIM_PATTERNS: &[&str] = &[
    // constituent boilerplate
    r"を備える(?:こと)?",
    r"を有する(?:こと)?",
    r"を含む(?:こと)?",
    r"を含有する(?:こと)?",
    r"からなる(?:こと)?",
    r"から構成される(?:こと)?",
    // back references
    r"前記[^。、\s【】<>]*",
    r"上記[^。、\s【】<>]*",
    r"該[^。、\s【】<>]*",
    r"当該[^。、\s【】<>]*",
    // scope limiters
    r"所定の[^。、\s【】<>]*",
    r"少なくとも[^。、\s【】<>]*",
    r"一つ以上の[^。、\s【】<>]*",
    r"複数の[^。、\s【】<>]*",
    // connectives
    r"であって[^。、\s【】<>]*",
    r"において[^。、\s【】<>]*",
    r"による[^。、\s【】<>]*",
    r"に関する[^。、\s【】<>]*",
    r"に係る[^。、\s【】<>]*",
    // characterising clauses
    r"ことを特徴とする[^。、\s【】<>]*",
    r"ことを要旨とする[^。、\s【】<>]*",
    r"を特徴とする[^。、\s【】<>]*",
];

const DESCRIPTION_PATTERNS: &[&str] = &[
    r"効果を奏する",
    r"作用を生じる",
    r"機能を発揮する",
    r"性能を向上させる",
    r"実施の形態",
    r"実施例",
    r"具体例",
    r"変形例",
    r"応用例",
    r"改善される",
    r"向上する",
    r"防止される",
    r"解決される",
    r"達成される",
    r"課題を解決する",
    r"問題を克服する",
    r"欠点を補う",
    r"不具合を改善する",
];

const PROCEDURAL_PATTERNS: &[&str] = &[
    r"工程を含む",
    r"手順により",
    r"方法によって",
    r"プロセスにより",
    r"条件下で",
    r"状態において",
    r"環境で",
    r"状況で",
    r"手段により",
    r"方法を用いて",
    r"技術によって",
    r"システムを使用して",
];

const CRITICAL_TERMS: &[&str] = &[
    "ことを特徴とする", "を備える", "を有する", "からなる",
    "前記", "所定の", "であって", "において",
];

const IMPORTANT_TERMS: &[&str] = &[
    "を含む", "少なくとも", "複数の", "による",
    "に関する", "実施の形態", "効果を奏する", "課題を解決する",
];

/// A recognised phrase. `start`/`end` are byte offsets into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalExpression {
    pub text: String,
    pub category: LegalCategory,
    pub importance: Importance,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportanceDistribution {
    pub critical: usize,
    pub important: usize,
    pub normal: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalAnalysis {
    pub total_expressions: usize,
    pub category_counts: BTreeMap<LegalCategory, usize>,
    pub importance_distribution: ImportanceDistribution,
    pub legal_quality_score: f64,
    pub expressions: Vec<LegalExpression>,
    pub has_claim_expressions: bool,
    pub has_critical_expressions: bool,
}

pub struct LegalRecognizer {
    groups: Vec<(LegalCategory, Vec<Regex>)>,
}

impl LegalRecognizer {
    pub fn new() -> Result<Self> {
        let compile = |patterns: &[&str]| -> Result<Vec<Regex>> {
            patterns.iter().map(|p| Regex::new(p).map_err(NerError::from)).collect()
        };
        Ok(Self {
            groups: vec![
                (LegalCategory::Claim, compile(CLAIM_PATTERNS)?),
                (LegalCategory::Description, compile(DESCRIPTION_PATTERNS)?),
                (LegalCategory::Procedural, compile(PROCEDURAL_PATTERNS)?),
            ],
        })
    }

    /// Importance by term membership: any critical term wins, then important.
    pub fn importance(expression: &str) -> Importance {
        if CRITICAL_TERMS.iter().any(|t| expression.contains(t)) {
            Importance::Critical
        } else if IMPORTANT_TERMS.iter().any(|t| expression.contains(t)) {
            Importance::Important
        } else {
            Importance::Normal
        }
    }

    /// First pattern group with a hit inside `expression`.
    pub fn categorize(&self, expression: &str) -> LegalCategory {
        self.groups
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(expression)))
            .map(|(category, _)| *category)
            .unwrap_or(LegalCategory::General)
    }

    /// All expressions, de-overlapped in favour of higher importance.
    pub fn extract(&self, text: &str) -> Vec<LegalExpression> {
        let mut found = Vec::new();
        for (_, patterns) in &self.groups {
            for re in patterns {
                for m in re.find_iter(text) {
                    let phrase = m.as_str();
                    found.push(LegalExpression {
                        text: phrase.to_string(),
                        category: self.categorize(phrase),
                        importance: Self::importance(phrase),
                        start: m.start(),
                        end: m.end(),
                    });
                }
            }
        }
        resolve_overlaps(found)
    }

    pub fn analyze(&self, text: &str) -> LegalAnalysis {
        let expressions = self.extract(text);

        let mut category_counts = BTreeMap::new();
        let mut distribution = ImportanceDistribution::default();
        for e in &expressions {
            *category_counts.entry(e.category).or_insert(0) += 1;
            match e.importance {
                Importance::Critical  => distribution.critical += 1,
                Importance::Important => distribution.important += 1,
                Importance::Normal    => distribution.normal += 1,
            }
        }

        LegalAnalysis {
            total_expressions: expressions.len(),
            legal_quality_score: quality_score(&expressions, category_counts.len()),
            has_claim_expressions: category_counts.contains_key(&LegalCategory::Claim),
            has_critical_expressions: distribution.critical > 0,
            category_counts,
            importance_distribution: distribution,
            expressions,
        }
    }
}

/// `(Σ importance weight + min(0.1 × categories, 0.3)) / n`, capped at 1.0.
fn quality_score(expressions: &[LegalExpression], distinct_categories: usize) -> f64 {
    if expressions.is_empty() {
        return 0.0;
    }
    let weighted: f64 = expressions.iter().map(|e| e.importance.quality_weight()).sum();
    let diversity = (distinct_categories as f64 * 0.1).min(0.3);
    round3(((weighted + diversity) / expressions.len() as f64).min(1.0))
}

/// Sort by start (higher importance first on ties). A later hit overlapping
/// the last kept one replaces it only when strictly more important.
fn resolve_overlaps(mut found: Vec<LegalExpression>) -> Vec<LegalExpression> {
    found.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.importance.cmp(&a.importance))
    });

    let mut kept: Vec<LegalExpression> = Vec::new();
    for expr in found {
        let overlaps_last = kept.last().is_some_and(|last| expr.start < last.end);
        if !overlaps_last {
            kept.push(expr);
            continue;
        }
        if let Some(last) = kept.last_mut() {
            if expr.importance > last.importance {
                *last = expr;
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognizer() -> LegalRecognizer {
        LegalRecognizer::new().unwrap()
    }

    #[test]
    fn test_importance_tiers() {
        assert_eq!(LegalRecognizer::importance("前記基板"), Importance::Critical);
        assert_eq!(LegalRecognizer::importance("を含む"), Importance::Important);
        assert_eq!(LegalRecognizer::importance("変形例"), Importance::Normal);
    }

    #[test]
    fn test_categorize() {
        let r = recognizer();
        assert_eq!(r.categorize("を備える"), LegalCategory::Claim);
        assert_eq!(r.categorize("実施例"), LegalCategory::Description);
        assert_eq!(r.categorize("工程を含む"), LegalCategory::Claim);
        assert_eq!(r.categorize("条件下で"), LegalCategory::Procedural);
        assert_eq!(r.categorize("ABC"), LegalCategory::General);
    }

    #[test]
    fn test_reference_phrase_stops_at_clause_break() {
        let exprs = recognizer().extract("前記基板上に配置され、回転する");
        assert_eq!(exprs[0].text, "前記基板上に配置され");
        assert_eq!(exprs[0].importance, Importance::Critical);
    }

    #[test]
    fn test_reference_phrase_stops_at_marker() {
        let exprs = recognizer().extract("前記装置【0011】次に");
        assert_eq!(exprs[0].text, "前記装置");
    }

    #[test]
    fn test_overlap_prefers_higher_importance() {
        let e = |start, end, importance| LegalExpression {
            text: String::new(),
            category: LegalCategory::Claim,
            importance,
            start,
            end,
        };
        let kept = resolve_overlaps(vec![
            e(0, 10, Importance::Normal),
            e(5, 12, Importance::Critical),
            e(20, 25, Importance::Important),
        ]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].importance, Importance::Critical);
        assert_eq!(kept[1].start, 20);
    }

    #[test]
    fn test_analysis_of_claim_text() {
        let analysis = recognizer()
            .analyze("基板と、前記基板上の電極とを備えることを特徴とする装置。実施例を示す");
        assert!(analysis.has_claim_expressions);
        assert!(analysis.has_critical_expressions);
        assert!(analysis.legal_quality_score > 0.0 && analysis.legal_quality_score <= 1.0);
        assert_eq!(analysis.total_expressions, analysis.expressions.len());
    }

    #[test]
    fn test_quality_score_formula() {
        let e = |importance, category| LegalExpression {
            text: String::new(),
            category,
            importance,
            start: 0,
            end: 0,
        };
        // (1.0 + 0.3 + 0.2) / 2 = 0.75
        let exprs = vec![
            e(Importance::Critical, LegalCategory::Claim),
            e(Importance::Normal, LegalCategory::Description),
        ];
        assert_eq!(quality_score(&exprs, 2), 0.75);
        assert_eq!(quality_score(&[], 0), 0.0);
    }
}
