//! tokkyo-ingestion — JPO ST96 patent XML ingestion.
//! - ST96 section extraction with a configurable description fallback chain
//! - Field-wise text normalisation with span protection
//! - Structural and quality validation
//! - Batch orchestration with per-stage counts

pub mod dedup;
pub mod models;
pub mod normalise;
pub mod pipeline;
pub mod st96;
pub mod validation;

pub use models::{Claim, Enrichment, PatentId, PatentRecord};
pub use normalise::Normaliser;
pub use pipeline::{discover_xml_files, select_files, BatchResult, PatentPipeline};
pub use st96::St96Extractor;
pub use validation::{Check, Finding, PatentValidator, ValidationReport};
