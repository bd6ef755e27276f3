//! Field-wise text normalisation.
//!
//! Every field goes through the same pass: protected spans (paragraph and
//! claim markers, important legal phrases, gated chemical notation) are
//! recorded by index, the [`TextCleaner`] runs over the gaps, and the spans
//! are copied back verbatim.

pub mod clean;
pub mod noise;

pub use clean::TextCleaner;
pub use noise::NoisePolicy;

use regex::Regex;
use tokkyo_common::{NormaliseConfig, Result, TokkyoError};
use tokkyo_ner::{ChemicalAnalysis, NerError, Protector};
use tracing::{debug, instrument};

use crate::models::{Enrichment, PatentRecord};

fn ner_error(e: NerError) -> TokkyoError {
    TokkyoError::Other(anyhow::Error::new(e))
}

pub struct Normaliser {
    protector: Protector,
    cleaner: TextCleaner,
    sentence_end: Regex,
}

impl Normaliser {
    pub fn new(config: &NormaliseConfig) -> Result<Self> {
        let window = config.enable_chemical_processing.then_some(config.context_window);
        let noise = NoisePolicy::from_config(&config.noise)?;
        Ok(Self {
            protector: Protector::new(window).map_err(ner_error)?,
            cleaner: TextCleaner::new(noise)?,
            sentence_end: Regex::new("[。！？]").map_err(|e| TokkyoError::Config(e.to_string()))?,
        })
    }

    pub fn chemical_enabled(&self) -> bool {
        self.protector.chemical().is_some()
    }

    /// Clean one text, leaving protected spans byte-for-byte intact.
    pub fn clean(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let protected = self.protector.protect(text);
        protected
            .transform(|gap| self.cleaner.clean_gap(gap))
            .trim()
            .to_string()
    }

    /// Split on `。！？`, dropping the delimiters and blank pieces.
    pub fn sentences(&self, text: &str) -> Vec<String> {
        self.sentence_end
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Clean every text field in place and attach the derived [`Enrichment`].
    #[instrument(skip(self, record), fields(id = %record.id))]
    pub fn enrich(&self, record: &mut PatentRecord) {
        for field in [
            &mut record.title,
            &mut record.abstract_text,
            &mut record.technical_field,
            &mut record.background_art,
            &mut record.summary,
            &mut record.detailed_description,
        ] {
            *field = self.clean(field);
        }
        for claim in &mut record.claims {
            claim.claim_text = self.clean(&claim.claim_text);
        }
        record.claims.retain(|c| !c.claim_text.is_empty());

        let combined_text = self.clean(&record.text_sections().join("\n\n"));
        let sentences = self.sentences(&combined_text);
        let claims_text = record
            .claims
            .iter()
            .map(|c| c.claim_text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let chemical_analysis = match self.protector.chemical() {
            Some(chemical) => chemical.analyze(&combined_text),
            None => ChemicalAnalysis::disabled(),
        };
        let legal_analysis = self.protector.legal().analyze(&combined_text);

        debug!(
            sentences = sentences.len(),
            chemical_entities = chemical_analysis.total_entities,
            legal_expressions = legal_analysis.total_expressions,
            "Record enriched"
        );

        record.enrichment = Some(Enrichment {
            sentence_count: sentences.len(),
            claims_count: record.claims.len(),
            combined_text,
            sentences,
            claims_text,
            chemical_analysis,
            legal_analysis,
        });
    }
}
