//! Structural and quality validation of one patent record.
//!
//! Every check runs regardless of earlier failures. Errors make a record
//! invalid; warnings and recommendations only lower or annotate its score.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokkyo_common::ValidationConfig;
use tracing::{debug, instrument};

use crate::models::PatentRecord;

const CLAIM_PHRASES: &[&str] = &["を備える", "を有する", "からなる", "を含む"];
const EMBODIMENT_KEYWORDS: &[&str] = &["実施の形態", "実施例", "具体例", "実施形態", "実施態様"];

/// Which rule produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    RequiredField,
    ClaimNumbering,
    IndependentClaims,
    DependentClaims,
    ClaimLength,
    ClaimPhrasing,
    Embodiment,
    DescriptionLength,
    LegalExpressions,
    LegalQuality,
    ChemicalEntities,
    ChemicalComplexity,
    SentenceCount,
    TitleLength,
    Abstract,
    References,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub check: Check,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.check, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub recommendations: Vec<Finding>,
    pub quality_score: f64,
    pub checks_performed: Vec<String>,
}

#[derive(Default)]
struct Findings {
    errors: Vec<Finding>,
    warnings: Vec<Finding>,
    recommendations: Vec<Finding>,
    checks: Vec<String>,
}

impl Findings {
    fn error(&mut self, check: Check, message: impl Into<String>) {
        self.errors.push(Finding { check, message: message.into() });
    }

    fn warn(&mut self, check: Check, message: impl Into<String>) {
        self.warnings.push(Finding { check, message: message.into() });
    }

    fn recommend(&mut self, check: Check, message: impl Into<String>) {
        self.recommendations.push(Finding { check, message: message.into() });
    }

    fn ran(&mut self, name: &str) {
        self.checks.push(name.to_string());
    }
}

pub struct PatentValidator {
    config: ValidationConfig,
    chemical_enabled: bool,
}

impl PatentValidator {
    pub fn new(config: ValidationConfig, chemical_enabled: bool) -> Self {
        Self { config, chemical_enabled }
    }

    #[instrument(skip(self, record), fields(id = %record.id))]
    pub fn validate(&self, record: &PatentRecord) -> ValidationReport {
        let mut f = Findings::default();

        self.check_required(record, &mut f);
        self.check_claims(record, &mut f);
        self.check_embodiment(record, &mut f);
        self.check_legal(record, &mut f);
        self.check_chemical(record, &mut f);
        self.check_text_quality(record, &mut f);
        self.check_references(record, &mut f);

        let quality_score = self.quality_score(record, f.errors.len(), f.warnings.len());
        debug!(
            errors = f.errors.len(),
            warnings = f.warnings.len(),
            quality_score,
            "Record validated"
        );

        ValidationReport {
            is_valid: f.errors.is_empty(),
            errors: f.errors,
            warnings: f.warnings,
            recommendations: f.recommendations,
            quality_score,
            checks_performed: f.checks,
        }
    }

    /// Score in [0, 1], rounded to three decimals.
    pub fn quality_score(&self, record: &PatentRecord, errors: usize, warnings: usize) -> f64 {
        let mut score = 1.0 - 0.2 * errors as f64 - 0.05 * warnings as f64;

        if let Some(enrichment) = &record.enrichment {
            if enrichment.sentence_count > self.config.rich_sentence_count {
                score += 0.1;
            }
            if self.chemical_enabled && enrichment.chemical_analysis.enabled {
                score += enrichment.chemical_analysis.complexity_score * 0.2;
            }
            if !enrichment.combined_text.is_empty() {
                score += enrichment.legal_analysis.legal_quality_score * 0.15;
            }
        }
        if record.claims.len() >= self.config.rich_claim_count {
            score += 0.1;
        }

        (score.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
    }

    fn check_required(&self, record: &PatentRecord, f: &mut Findings) {
        f.ran("required_fields");
        if record.patent_number.trim().is_empty() {
            f.error(Check::RequiredField, "missing required field: patent_number");
        }
        if record.title.trim().is_empty() {
            f.error(Check::RequiredField, "missing required field: title");
        }
        if record.claims.is_empty() {
            f.error(Check::RequiredField, "missing required field: claims");
        }
        if record.detailed_description.trim().is_empty() {
            f.error(Check::RequiredField, "missing required field: detailed_description");
        }
    }

    fn check_claims(&self, record: &PatentRecord, f: &mut Findings) {
        f.ran("claims");
        let claims = &record.claims;

        let mut numbers: Vec<u32> = claims.iter().filter_map(|c| c.number()).collect();
        numbers.sort_unstable();
        let dense = (1..=numbers.len() as u32).collect::<Vec<_>>();
        if numbers != dense {
            f.warn(Check::ClaimNumbering, format!("claim numbers are not contiguous from 1: {numbers:?}"));
        }

        let dependent = claims.iter().filter(|c| c.is_dependent()).count();
        if dependent == claims.len() {
            f.error(Check::IndependentClaims, "no independent claim");
        }
        if claims.len() > 1 && dependent == 0 {
            f.warn(Check::DependentClaims, "multiple claims but none is dependent");
        }

        for claim in claims {
            let chars = claim.claim_text.chars().count();
            if chars < self.config.min_claim_length {
                f.warn(
                    Check::ClaimLength,
                    format!("claim {} is short ({chars} chars)", claim.claim_number),
                );
            }
            if !CLAIM_PHRASES.iter().any(|p| claim.claim_text.contains(p)) {
                f.warn(
                    Check::ClaimPhrasing,
                    format!("claim {} lacks a claim-structure phrase", claim.claim_number),
                );
            }
        }
    }

    fn check_embodiment(&self, record: &PatentRecord, f: &mut Findings) {
        f.ran("embodiment");
        let description = &record.detailed_description;
        if description.trim().is_empty() {
            f.warn(Check::Embodiment, "detailed description is empty");
            return;
        }
        if !EMBODIMENT_KEYWORDS.iter().any(|k| description.contains(k)) {
            f.warn(Check::Embodiment, "description has no embodiment keyword");
        }
        let chars = description.chars().count();
        if chars < self.config.min_description_length {
            f.warn(Check::DescriptionLength, format!("description is short ({chars} chars)"));
        }
    }

    fn check_legal(&self, record: &PatentRecord, f: &mut Findings) {
        let Some(enrichment) = record.enrichment.as_ref().filter(|e| !e.combined_text.is_empty()) else {
            return;
        };
        f.ran("legal");
        let legal = &enrichment.legal_analysis;
        if !legal.has_critical_expressions {
            f.warn(Check::LegalExpressions, "no critical legal expression");
        }
        if !legal.has_claim_expressions {
            f.warn(Check::LegalExpressions, "no claim-type legal expression");
        }
        if legal.legal_quality_score < 0.3 {
            f.recommend(Check::LegalQuality, "increase the amount of legal phrasing");
        } else if legal.legal_quality_score < 0.6 {
            f.recommend(Check::LegalQuality, "diversify legal phrasing across categories");
        }
    }

    fn check_chemical(&self, record: &PatentRecord, f: &mut Findings) {
        if !self.chemical_enabled {
            return;
        }
        let Some(chemical) = record
            .enrichment
            .as_ref()
            .map(|e| &e.chemical_analysis)
            .filter(|c| c.enabled)
        else {
            return;
        };
        f.ran("chemical");
        if chemical.total_entities == 0 {
            f.warn(Check::ChemicalEntities, "no chemical entities found");
        }
        if chemical.complexity_score < 0.1 {
            f.recommend(Check::ChemicalComplexity, "chemical content is very simple");
        }
        if chemical.category_counts.len() == 1 {
            f.recommend(Check::ChemicalComplexity, "chemical entities come from a single category");
        }
    }

    fn check_text_quality(&self, record: &PatentRecord, f: &mut Findings) {
        f.ran("text_quality");
        let sentences = record.enrichment.as_ref().map_or(0, |e| e.sentence_count);
        if sentences < self.config.min_sentence_count {
            f.warn(Check::SentenceCount, format!("only {sentences} sentences"));
        }
        let title = record.title.chars().count();
        if title < self.config.min_title_length {
            f.warn(Check::TitleLength, format!("title is short ({title} chars)"));
        }
        let abstract_chars = record.abstract_text.trim().chars().count();
        if abstract_chars == 0 {
            f.warn(Check::Abstract, "abstract is missing");
        } else if abstract_chars < self.config.min_abstract_length {
            f.warn(Check::Abstract, format!("abstract is short ({abstract_chars} chars)"));
        }
    }

    fn check_references(&self, record: &PatentRecord, f: &mut Findings) {
        f.ran("references");
        if record.citations.is_empty() {
            f.warn(Check::References, "no citations");
        }
        if record.inventors.is_empty() {
            f.warn(Check::References, "no inventors");
        }
        if record.applicants.is_empty() {
            f.warn(Check::References, "no applicants");
        }
        if record.ipc_classification.is_empty() {
            f.warn(Check::References, "no IPC classification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Claim, PatentId};

    fn validator() -> PatentValidator {
        PatentValidator::new(ValidationConfig::default(), true)
    }

    fn claim(n: &str, text: &str) -> Claim {
        Claim { claim_number: n.to_string(), claim_text: text.to_string() }
    }

    fn complete_record() -> PatentRecord {
        let body = "基板と、前記基板の上に配置された電極と、前記電極を覆う絶縁膜とを備える半導体装置であって、前記電極は銅からなる装置。";
        let mut r = PatentRecord::empty(PatentId::authoritative("2023-000001"));
        r.title = "半導体装置及びその製造方法".into();
        r.detailed_description = "【0010】Foo.".into();
        r.claims = vec![
            claim("1", body),
            claim("2", &format!("請求項1に記載の{body}")),
            claim("3", &format!("請求項2に記載の{body}")),
        ];
        r
    }

    fn count(findings: &[Finding], check: Check) -> usize {
        findings.iter().filter(|f| f.check == check).count()
    }

    #[test]
    fn test_complete_record_has_no_errors() {
        let report = validator().validate(&complete_record());
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert_eq!(count(&report.warnings, Check::ClaimLength), 0);
        assert_eq!(count(&report.warnings, Check::ClaimPhrasing), 0);
        assert_eq!(count(&report.warnings, Check::ClaimNumbering), 0);
    }

    #[test]
    fn test_missing_claims_is_two_errors() {
        let mut record = complete_record();
        record.claims.clear();
        let report = validator().validate(&record);
        assert!(!report.is_valid);
        assert_eq!(count(&report.errors, Check::RequiredField), 1);
        assert_eq!(count(&report.errors, Check::IndependentClaims), 1);
    }

    #[test]
    fn test_gap_in_claim_numbers_warns() {
        let mut record = complete_record();
        record.claims[2].claim_number = "5".into();
        let report = validator().validate(&record);
        assert_eq!(count(&report.warnings, Check::ClaimNumbering), 1);
        assert!(report.is_valid);
    }

    #[test]
    fn test_all_dependent_claims_is_error() {
        let mut record = complete_record();
        record.claims.remove(0);
        let report = validator().validate(&record);
        assert_eq!(count(&report.errors, Check::IndependentClaims), 1);
    }

    #[test]
    fn test_no_dependent_claims_warns() {
        let mut record = complete_record();
        for c in &mut record.claims {
            c.claim_text = c.claim_text.replace("請求項", "").replace("記載の", "");
        }
        let report = validator().validate(&record);
        assert_eq!(count(&report.warnings, Check::DependentClaims), 1);
    }

    #[test]
    fn test_embodiment_keyword() {
        let mut record = complete_record();
        let before = count(&validator().validate(&record).warnings, Check::Embodiment);
        record.detailed_description = "【0010】本実施形態では。".into();
        let after = count(&validator().validate(&record).warnings, Check::Embodiment);
        assert_eq!(before, 1);
        assert_eq!(after, 0);
    }

    #[test]
    fn test_empty_record_scores_zero() {
        let record = PatentRecord::empty(PatentId::authoritative(""));
        let report = validator().validate(&record);
        assert_eq!(report.quality_score, 0.0);
        assert_eq!(count(&report.errors, Check::RequiredField), 4);
    }

    #[test]
    fn test_score_bounds_and_bonus() {
        let record = complete_record();
        let v = validator();
        let score = v.quality_score(&record, 0, 0);
        assert!((0.0..=1.0).contains(&score));
        // three claims earn the bonus, clamped at 1.0
        assert_eq!(score, 1.0);
        assert_eq!(v.quality_score(&record, 2, 2), 0.6);
    }

    #[test]
    fn test_no_chemistry_warns_and_recommends() {
        let mut record = complete_record();
        crate::normalise::Normaliser::new(&tokkyo_common::NormaliseConfig::default())
            .unwrap()
            .enrich(&mut record);
        let enrichment = record.enrichment.as_mut().unwrap();
        enrichment.chemical_analysis = tokkyo_ner::ChemicalAnalysis {
            enabled: true,
            ..tokkyo_ner::ChemicalAnalysis::disabled()
        };

        let report = validator().validate(&record);
        assert!(report.checks_performed.iter().any(|c| c == "chemical"));
        assert_eq!(count(&report.warnings, Check::ChemicalEntities), 1);
        assert_eq!(count(&report.recommendations, Check::ChemicalComplexity), 1);
    }

    #[test]
    fn test_reference_warnings() {
        let report = validator().validate(&complete_record());
        assert_eq!(count(&report.warnings, Check::References), 4);
    }
}
