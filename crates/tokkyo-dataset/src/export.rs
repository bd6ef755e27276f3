//! Dataset export: every output file of one run, written to one directory.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokkyo_common::{DatasetConfig, Result};
use tokkyo_ingestion::PatentRecord;
use tracing::{debug, info, instrument};

use crate::assembler::{AssemblyStats, DatasetAssembler};
use crate::formats::{conversation_record, paragraph_records, to_alpaca, to_chat_template, to_chatml};
use crate::paragraphs::ParagraphSplitter;
use crate::sections::{build_sections, SectionEntry};

pub const COMPLETE_DATASET: &str = "complete_dataset.json";
pub const TRAINING_DATASET: &str = "training_dataset.json";
pub const SECTIONS_DATASET: &str = "sections_dataset.json";
pub const CHATML_DATASET: &str = "chatml_training.json";
pub const ALPACA_DATASET: &str = "alpaca_dataset.json";
pub const CHAT_TEMPLATE_DATASET: &str = "chat_template_dataset.json";
pub const PARAGRAPH_DATASET: &str = "paragraph_unit_dataset.json";
pub const CONVERSATION_DATASET: &str = "conversation_dataset.json";
pub const STATS_FILE: &str = "dataset_stats.json";

/// Compact per-record training entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub patent_id: String,
    pub patent_id_synthetic: bool,
    pub title: String,
    pub text: String,
    pub claims: Vec<String>,
}

impl TrainingRecord {
    fn from_record(record: &PatentRecord) -> Self {
        Self {
            patent_id: record.id.value.clone(),
            patent_id_synthetic: record.id.synthetic,
            title: record.title.clone(),
            text: record
                .enrichment
                .as_ref()
                .map(|e| e.combined_text.clone())
                .unwrap_or_default(),
            claims: record.claims.iter().map(|c| c.claim_text.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub created_at: String,
    pub total_patents: usize,
    pub valid_patents: usize,
    pub total_sentences: usize,
    pub total_claims: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct DatasetStats {
    dataset_info: DatasetInfo,
    assembly: AssemblyStats,
    files: BTreeMap<&'static str, &'static str>,
}

/// Counts and paths of one export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportSummary {
    pub records: usize,
    pub valid_records: usize,
    pub sections: usize,
    pub pairs: usize,
    pub paragraph_records: usize,
    pub conversations: usize,
    pub assembly: AssemblyStats,
    pub files: Vec<PathBuf>,
}

/// Write every dataset file for `records` into `dir`, creating it if needed.
///
/// Only valid records feed the training outputs; invalid ones appear in
/// `complete_dataset.json` alone.
#[instrument(skip(records, dir, config), fields(dir = %dir.display(), records = records.len()))]
pub fn export_datasets(
    records: &[PatentRecord],
    dir: &Path,
    config: &DatasetConfig,
    created_at: DateTime<Utc>,
) -> Result<ExportSummary> {
    std::fs::create_dir_all(dir)?;
    let valid: Vec<&PatentRecord> = records.iter().filter(|r| r.is_valid()).collect();

    let sections: Vec<SectionEntry> = valid.iter().flat_map(|r| build_sections(r)).collect();
    let assembler = DatasetAssembler::new(config)?;
    let (pairs, assembly) = assembler.assemble(&sections);

    let splitter = ParagraphSplitter::new()?;
    let paragraphs: Vec<_> = valid
        .iter()
        .flat_map(|r| paragraph_records(r, &splitter, created_at))
        .collect();
    let conversations: Vec<_> = valid
        .iter()
        .filter_map(|r| conversation_record(r, &splitter, created_at))
        .collect();

    let training: Vec<TrainingRecord> = valid.iter().map(|r| TrainingRecord::from_record(r)).collect();
    let chatml: Vec<_> = pairs.iter().map(|p| to_chatml(p, &config.system_prompt, created_at)).collect();
    let alpaca: Vec<_> = pairs.iter().map(to_alpaca).collect();
    let chat_template: Vec<_> = pairs.iter().map(|p| to_chat_template(p, &config.system_prompt)).collect();

    let stats = DatasetStats {
        dataset_info: DatasetInfo {
            created_at: created_at.to_rfc3339(),
            total_patents: records.len(),
            valid_patents: valid.len(),
            total_sentences: valid
                .iter()
                .filter_map(|r| r.enrichment.as_ref())
                .map(|e| e.sentence_count)
                .sum(),
            total_claims: valid.iter().map(|r| r.claims.len()).sum(),
        },
        assembly,
        files: file_descriptions(),
    };

    let mut files = Vec::new();
    write_file(dir, COMPLETE_DATASET, records, &mut files)?;
    write_file(dir, TRAINING_DATASET, &training, &mut files)?;
    write_file(dir, SECTIONS_DATASET, &sections, &mut files)?;
    write_file(dir, CHATML_DATASET, &chatml, &mut files)?;
    write_file(dir, ALPACA_DATASET, &alpaca, &mut files)?;
    write_file(dir, CHAT_TEMPLATE_DATASET, &chat_template, &mut files)?;
    write_file(dir, PARAGRAPH_DATASET, &paragraphs, &mut files)?;
    write_file(dir, CONVERSATION_DATASET, &conversations, &mut files)?;
    write_file(dir, STATS_FILE, &stats, &mut files)?;

    let summary = ExportSummary {
        records: records.len(),
        valid_records: valid.len(),
        sections: sections.len(),
        pairs: pairs.len(),
        paragraph_records: paragraphs.len(),
        conversations: conversations.len(),
        assembly,
        files,
    };
    info!(
        valid = summary.valid_records,
        sections = summary.sections,
        pairs = summary.pairs,
        paragraphs = summary.paragraph_records,
        conversations = summary.conversations,
        "Datasets exported"
    );
    Ok(summary)
}

fn file_descriptions() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        (COMPLETE_DATASET, "all records with metadata and validation results"),
        (TRAINING_DATASET, "valid records: patent_id, title, text, claims"),
        (SECTIONS_DATASET, "one entry per patent section"),
        (CHATML_DATASET, "claims to embodiment pairs as ChatML messages"),
        (ALPACA_DATASET, "claims to embodiment pairs as instruction/input/output"),
        (CHAT_TEMPLATE_DATASET, "claims to embodiment pairs as rendered chat template text"),
        (PARAGRAPH_DATASET, "one ChatML record per description paragraph"),
        (CONVERSATION_DATASET, "multi-turn paragraph-by-paragraph conversations"),
    ])
}

fn write_file<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T, files: &mut Vec<PathBuf>) -> Result<()> {
    let path = dir.join(name);
    write_json(&path, value)?;
    debug!(path = %path.display(), "Wrote dataset file");
    files.push(path);
    Ok(())
}

/// Pretty JSON, non-ASCII kept as-is.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
