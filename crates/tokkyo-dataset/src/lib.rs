//! tokkyo-dataset — turns validated patent records into training data.
//! - Flat per-section entries
//! - Claims → embodiment pairing with boundary-aware truncation
//! - ChatML, Alpaca, chat-template and paragraph-level output formats
//! - Record cleaning for previously exported JSON

pub mod assembler;
pub mod cleaning;
pub mod export;
pub mod formats;
pub mod paragraphs;
pub mod sections;
pub mod truncate;

pub use assembler::{AssemblyStats, DatasetAssembler, TrainingPair};
pub use cleaning::{CleaningStats, RecordCleaner};
pub use export::{export_datasets, read_json, write_json, ExportSummary};
pub use paragraphs::{Paragraph, ParagraphSplitter, SplitParagraphs};
pub use sections::{build_sections, SectionEntry};
pub use truncate::Truncator;
