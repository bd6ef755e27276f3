//! Batch ingestion pipeline.
//!
//! Orchestrates one run over a set of ST96 files:
//!   1. Extract each file into a `PatentRecord`
//!   2. Normalise every text field and attach enrichment
//!   3. Validate and attach the report
//!   4. Drop duplicate patent ids (first record wins)
//!
//! A file that fails to read or parse is logged, counted as skipped and the
//! run continues. With the `parallel` feature, files are mapped on the rayon
//! pool; results keep input order.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tokkyo_common::{PipelineConfig, Result, RunMode, TokkyoError};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::dedup::{BatchDeduplicator, DedupResult};
use crate::models::PatentRecord;
use crate::normalise::Normaliser;
use crate::st96::St96Extractor;
use crate::validation::PatentValidator;

/// Summary of one batch run plus the surviving records.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub run_id: Uuid,
    pub files_found: usize,
    pub files_parsed: usize,
    pub files_skipped: usize,
    pub duplicates: usize,
    pub records_valid: usize,
    pub records_invalid: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
    #[serde(skip)]
    pub records: Vec<PatentRecord>,
}

impl BatchResult {
    pub fn valid_records(&self) -> impl Iterator<Item = &PatentRecord> {
        self.records.iter().filter(|r| r.is_valid())
    }
}

pub struct PatentPipeline {
    extractor: St96Extractor,
    normaliser: Normaliser,
    validator: PatentValidator,
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    parallel: bool,
}

impl PatentPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let normaliser = Normaliser::new(&config.normalise)?;
        let validator = PatentValidator::new(config.validation.clone(), normaliser.chemical_enabled());
        Ok(Self {
            extractor: St96Extractor::new(&config.extraction)?,
            normaliser,
            validator,
            parallel: config.execution.parallel,
        })
    }

    /// Extract, normalise and validate one file.
    pub fn process_file(&self, path: &Path) -> Result<PatentRecord> {
        let record = self.extractor.extract_file(path)?;
        Ok(self.finish(record))
    }

    /// Same as [`process_file`](Self::process_file) for in-memory XML.
    pub fn process_str(&self, xml: &str, source_file: Option<String>) -> Result<PatentRecord> {
        let record = self.extractor.extract_str(xml, source_file)?;
        Ok(self.finish(record))
    }

    fn finish(&self, mut record: PatentRecord) -> PatentRecord {
        self.normaliser.enrich(&mut record);
        record.validation = Some(self.validator.validate(&record));
        record
    }

    #[instrument(skip(self, files), fields(files = files.len()))]
    pub fn run_batch(&self, files: &[PathBuf]) -> BatchResult {
        let run_id = Uuid::new_v4();
        let t0 = Instant::now();
        info!(run_id = %run_id, files = files.len(), "Starting batch");

        let outcomes = self.map_files(files);

        let mut result = BatchResult {
            run_id,
            files_found: files.len(),
            files_parsed: 0,
            files_skipped: 0,
            duplicates: 0,
            records_valid: 0,
            records_invalid: 0,
            errors: Vec::new(),
            duration_ms: 0,
            records: Vec::new(),
        };
        let mut dedup = BatchDeduplicator::new();

        for (path, outcome) in files.iter().zip(outcomes) {
            let record = match outcome {
                Ok(record) => record,
                Err(e) => {
                    let msg = format!("{}: {e}", path.display());
                    warn!("Skipping file: {}", &msg);
                    result.files_skipped += 1;
                    result.errors.push(msg);
                    continue;
                }
            };
            result.files_parsed += 1;

            if let DedupResult::DuplicateId(id) = dedup.check(&record) {
                debug!(id = %id, path = %path.display(), "Duplicate patent id, keeping first");
                continue;
            }
            if record.is_valid() {
                result.records_valid += 1;
            } else {
                result.records_invalid += 1;
            }
            result.records.push(record);
        }

        result.duplicates = dedup.duplicates();
        result.duration_ms = t0.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            parsed = result.files_parsed,
            skipped = result.files_skipped,
            duplicates = result.duplicates,
            valid = result.records_valid,
            invalid = result.records_invalid,
            duration_ms = result.duration_ms,
            "Batch complete"
        );
        result
    }

    fn map_files(&self, files: &[PathBuf]) -> Vec<Result<PatentRecord>> {
        #[cfg(feature = "parallel")]
        {
            if self.parallel && files.len() > 1 {
                use rayon::prelude::*;
                return files.par_iter().map(|p| self.process_file(p)).collect();
            }
        }
        files.iter().map(|p| self.process_file(p)).collect()
    }
}

/// Every `.xml` file under `dir`, recursively, sorted by path.
pub fn discover_xml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(TokkyoError::Pipeline(format!("data directory not found: {}", dir.display())));
    }
    let mut files = Vec::new();
    collect_xml_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_xml_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_xml_recursive(&path, files)?;
        } else if is_xml(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

/// Files to process for a run mode: one, the first `quick_limit`, or all.
pub fn select_files(files: Vec<PathBuf>, mode: RunMode, quick_limit: usize) -> Vec<PathBuf> {
    let keep = match mode {
        RunMode::Single => 1,
        RunMode::Quick => quick_limit,
        RunMode::Bulk => files.len(),
    };
    files.into_iter().take(keep).collect()
}
