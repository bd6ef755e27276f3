//! Rule-based recognition of chemical notation and Japanese patent legal
//! phrasing, plus span protection for destructive text cleaning.
//!
//! Everything here is pattern driven (regex + Aho-Corasick); there is no
//! model inference and no I/O.

pub mod chemical;
pub mod context;
pub mod entity_types;
pub mod legal;
pub mod protect;

pub use chemical::{ChemicalAnalysis, ChemicalEntity, ChemicalRecognizer};
pub use context::KeywordContext;
pub use entity_types::{ChemicalCategory, Importance, LegalCategory};
pub use legal::{ImportanceDistribution, LegalAnalysis, LegalExpression, LegalRecognizer};
pub use protect::{ProtectedSpan, ProtectedText, Protector, SpanKind};

pub type Result<T> = std::result::Result<T, NerError>;

#[derive(Debug, thiserror::Error)]
pub enum NerError {
    #[error("Pattern compilation failed: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Keyword automaton build failed: {0}")]
    Automaton(#[from] aho_corasick::BuildError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Round to three decimals, the precision every score in this crate reports.
pub(crate) fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
