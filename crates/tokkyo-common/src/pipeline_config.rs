//! Run configuration for the patent extraction pipeline.
//!
//! A single `PipelineConfig` is loaded (TOML, YAML or JSON), validated once
//! and then passed by shared reference to every stage. Stages never mutate it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TokkyoError};

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub normalise: NormaliseConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,
}

// ── Extraction ────────────────────────────────────────────────────────────────

/// ST96 elements that may carry the detailed description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptionSource {
    EmbodimentDescription,
    DetailedDescription,
    BestMode,
    InventionMode,
}

impl DescriptionSource {
    /// Fixed fallback order used when nothing else is configured.
    pub const PRIORITY: [DescriptionSource; 4] = [
        DescriptionSource::EmbodimentDescription,
        DescriptionSource::DetailedDescription,
        DescriptionSource::BestMode,
        DescriptionSource::InventionMode,
    ];

    /// Prefixed element name, e.g. `pat:EmbodimentDescription`.
    pub fn qualified_name(&self) -> &'static str {
        match self {
            DescriptionSource::EmbodimentDescription => "pat:EmbodimentDescription",
            DescriptionSource::DetailedDescription   => "pat:DetailedDescription",
            DescriptionSource::BestMode              => "pat:BestMode",
            DescriptionSource::InventionMode         => "jppat:InventionMode",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptionSource::EmbodimentDescription => "EmbodimentDescription",
            DescriptionSource::DetailedDescription   => "DetailedDescription",
            DescriptionSource::BestMode              => "BestMode",
            DescriptionSource::InventionMode         => "InventionMode",
        }
    }
}

impl fmt::Display for DescriptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Description elements tried in order; the first non-empty one wins.
    #[serde(default = "default_description_sources")]
    pub description_sources: Vec<DescriptionSource>,

    /// Safety cap on the extracted description, in characters.
    #[serde(default = "default_max_description_chars")]
    pub max_description_length: usize,

    /// Prefix → namespace URI map used to resolve element queries.
    #[serde(default = "default_namespaces")]
    pub namespaces: BTreeMap<String, String>,
}

fn default_description_sources() -> Vec<DescriptionSource> { DescriptionSource::PRIORITY.to_vec() }
fn default_max_description_chars() -> usize { 50_000 }

pub const NS_JPPAT: &str = "http://www.jpo.go.jp/standards/XMLSchema/ST96/JPPatent";
pub const NS_JPCOM: &str = "http://www.jpo.go.jp/standards/XMLSchema/ST96/JPCommon";
pub const NS_COM: &str = "http://www.wipo.int/standards/XMLSchema/ST96/Common";
pub const NS_PAT: &str = "http://www.wipo.int/standards/XMLSchema/ST96/Patent";

fn default_namespaces() -> BTreeMap<String, String> {
    [("jppat", NS_JPPAT), ("jpcom", NS_JPCOM), ("com", NS_COM), ("pat", NS_PAT)]
        .into_iter()
        .map(|(p, uri)| (p.to_string(), uri.to_string()))
        .collect()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            description_sources: default_description_sources(),
            max_description_length: default_max_description_chars(),
            namespaces: default_namespaces(),
        }
    }
}

// ── Normalisation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormaliseConfig {
    /// Recognise and protect chemical notation during cleaning.
    #[serde(default = "default_true")]
    pub enable_chemical_processing: bool,

    /// Characters inspected on each side of a chemical candidate.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    #[serde(default)]
    pub noise: NoiseConfig,
}

fn default_true() -> bool { true }
fn default_context_window() -> usize { 20 }

impl Default for NormaliseConfig {
    fn default() -> Self {
        Self {
            enable_chemical_processing: true,
            context_window: default_context_window(),
            noise: NoiseConfig::default(),
        }
    }
}

/// Deny-list heuristics for OCR and markup debris. Lossy by nature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Regex rules applied in order; every match is deleted.
    #[serde(default = "default_noise_rules")]
    pub rules: Vec<String>,

    /// Exact tokens that survive even when a rule matches them.
    #[serde(default)]
    pub allowlist: Vec<String>,

    /// Longest run of one repeated character kept as-is.
    #[serde(default = "default_max_repeat")]
    pub max_repeat: usize,
}

fn default_noise_rules() -> Vec<String> {
    [
        r"CHEMICAL\d+",
        r"LEGAL\d+",
        r"MIC[A-Z]*",
        r"CH{2,}",
        r"AL\d+",
        r"LE[A-Z]*",
        r"ECH[A-Z]*",
        r"[A-Z]{6,}",
        r"\d{5,}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_max_repeat() -> usize { 2 }

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            rules: default_noise_rules(),
            allowlist: vec![],
            max_repeat: default_max_repeat(),
        }
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_claim_chars")]
    pub min_claim_length: usize,

    #[serde(default = "default_min_description_chars")]
    pub min_description_length: usize,

    #[serde(default = "default_min_sentences")]
    pub min_sentence_count: usize,

    #[serde(default = "default_min_title_chars")]
    pub min_title_length: usize,

    #[serde(default = "default_min_abstract_chars")]
    pub min_abstract_length: usize,

    /// Sentence count above which the record earns a richness bonus.
    #[serde(default = "default_rich_sentences")]
    pub rich_sentence_count: usize,

    /// Claim count at or above which the record earns a richness bonus.
    #[serde(default = "default_rich_claims")]
    pub rich_claim_count: usize,
}

fn default_min_claim_chars() -> usize { 50 }
fn default_min_description_chars() -> usize { 500 }
fn default_min_sentences() -> usize { 50 }
fn default_min_title_chars() -> usize { 10 }
fn default_min_abstract_chars() -> usize { 100 }
fn default_rich_sentences() -> usize { 100 }
fn default_rich_claims() -> usize { 3 }

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_claim_length: default_min_claim_chars(),
            min_description_length: default_min_description_chars(),
            min_sentence_count: default_min_sentences(),
            min_title_length: default_min_title_chars(),
            min_abstract_length: default_min_abstract_chars(),
            rich_sentence_count: default_rich_sentences(),
            rich_claim_count: default_rich_claims(),
        }
    }
}

// ── Dataset assembly ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Section names holding claims, strict priority order.
    #[serde(default = "default_claims_sections")]
    pub claims_sections: Vec<String>,

    /// Section names holding the description, strict priority order.
    #[serde(default = "default_description_sections")]
    pub description_sections: Vec<String>,

    #[serde(default = "default_max_claims_chars")]
    pub max_claims_length: usize,

    #[serde(default = "default_max_pair_description_chars")]
    pub max_description_length: usize,

    #[serde(default = "default_min_pair_claims_chars")]
    pub min_claims_length: usize,

    #[serde(default = "default_min_pair_description_chars")]
    pub min_description_length: usize,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Per-record `text` limit applied by the record cleaning stage.
    #[serde(default = "default_record_text_limit")]
    pub record_text_limit: usize,

    /// Records whose cleaned `text` is shorter than this are dropped.
    #[serde(default = "default_record_min_text")]
    pub record_min_text_length: usize,

    #[serde(default = "default_field_limit")]
    pub field_limit: usize,

    #[serde(default = "default_list_item_limit")]
    pub list_item_limit: usize,
}

fn default_claims_sections() -> Vec<String> { vec!["claims".to_string(), "claim".to_string()] }
fn default_description_sections() -> Vec<String> {
    vec!["detailed_description".to_string(), "embodiment".to_string()]
}
fn default_max_claims_chars() -> usize { 500 }
fn default_max_pair_description_chars() -> usize { 800 }
fn default_min_pair_claims_chars() -> usize { 30 }
fn default_min_pair_description_chars() -> usize { 100 }
fn default_system_prompt() -> String {
    "あなたは特許の専門家です。請求項から具体的な実施形態を説明してください。".to_string()
}
fn default_record_text_limit() -> usize { 800 }
fn default_record_min_text() -> usize { 50 }
fn default_field_limit() -> usize { 500 }
fn default_list_item_limit() -> usize { 300 }

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            claims_sections: default_claims_sections(),
            description_sections: default_description_sections(),
            max_claims_length: default_max_claims_chars(),
            max_description_length: default_max_pair_description_chars(),
            min_claims_length: default_min_pair_claims_chars(),
            min_description_length: default_min_pair_description_chars(),
            system_prompt: default_system_prompt(),
            record_text_limit: default_record_text_limit(),
            record_min_text_length: default_record_min_text(),
            field_limit: default_field_limit(),
            list_item_limit: default_list_item_limit(),
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving every generated dataset file.
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

fn default_output_dir() -> String { "output".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir() }
    }
}

// ── Execution ─────────────────────────────────────────────────────────────────

/// How many input files a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// First XML file only.
    Single,
    /// Every XML file under the data directory.
    Bulk,
    /// The first `quick_file_limit` files.
    Quick,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Single => "single",
            RunMode::Bulk   => "bulk",
            RunMode::Quick  => "quick",
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(RunMode::Single),
            "bulk"   => Ok(RunMode::Bulk),
            "quick"  => Ok(RunMode::Quick),
            other => Err(format!("unknown mode '{other}' (expected single, bulk or quick)")),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_mode")]
    pub mode: RunMode,

    /// Directory scanned for `*.xml` inputs.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_quick_limit")]
    pub quick_file_limit: usize,

    /// Map documents across threads when built with the `parallel` feature.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn default_mode() -> RunMode { RunMode::Bulk }
fn default_data_dir() -> String { "data".to_string() }
fn default_quick_limit() -> usize { 10 }

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            data_dir: default_data_dir(),
            quick_file_limit: default_quick_limit(),
            parallel: true,
        }
    }
}

// ── Legacy import ─────────────────────────────────────────────────────────────

/// Flat limit keys used by older dataset-conversion settings files.
///
/// These are only accepted through [`PipelineConfig::with_legacy_limits`];
/// the regular config schema has exactly one name per setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyDatasetLimits {
    #[serde(rename = "MAX_CLAIMS_LENGTH")]
    pub max_claims_length: Option<usize>,
    #[serde(rename = "MAX_EMBODIMENT_LENGTH")]
    pub max_embodiment_length: Option<usize>,
    #[serde(rename = "MIN_CLAIMS_LENGTH")]
    pub min_claims_length: Option<usize>,
    #[serde(rename = "MIN_EMBODIMENT_LENGTH")]
    pub min_embodiment_length: Option<usize>,
}

impl LegacyDatasetLimits {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

// ── Loading & validation ──────────────────────────────────────────────────────

impl PipelineConfig {
    /// Load from a file, picking the format from its extension, and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let config = match ext.as_str() {
            "toml" => Self::from_toml(&content)?,
            "yaml" | "yml" => Self::from_yaml(&content)?,
            "json" => Self::from_json(&content)?,
            other => {
                return Err(TokkyoError::Config(format!(
                    "unsupported config format '{other}' for {}",
                    path.display()
                )))
            }
        };
        debug!(path = %path.display(), "Loaded pipeline config");
        Ok(config)
    }

    /// Parse TOML and validate.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML and validate.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON and validate.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay legacy flat limits and re-validate.
    pub fn with_legacy_limits(mut self, legacy: &LegacyDatasetLimits) -> Result<Self> {
        if let Some(v) = legacy.max_claims_length {
            self.dataset.max_claims_length = v;
        }
        if let Some(v) = legacy.max_embodiment_length {
            self.dataset.max_description_length = v;
        }
        if let Some(v) = legacy.min_claims_length {
            self.dataset.min_claims_length = v;
        }
        if let Some(v) = legacy.min_embodiment_length {
            self.dataset.min_description_length = v;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check cross-field constraints. Called once at load time.
    pub fn validate(&self) -> Result<()> {
        let ex = &self.extraction;
        if ex.description_sources.is_empty() {
            return Err(config_err("extraction.description_sources must not be empty"));
        }
        for (i, source) in ex.description_sources.iter().enumerate() {
            if ex.description_sources[..i].contains(source) {
                return Err(config_err(format!(
                    "extraction.description_sources lists {source} twice"
                )));
            }
        }
        if ex.max_description_length <= 3 {
            return Err(config_err("extraction.max_description_length must exceed 3"));
        }
        for prefix in ["pat", "com", "jppat"] {
            if !ex.namespaces.contains_key(prefix) {
                return Err(config_err(format!("extraction.namespaces is missing '{prefix}'")));
            }
        }

        for rule in &self.normalise.noise.rules {
            Regex::new(rule)
                .map_err(|e| config_err(format!("normalise.noise rule '{rule}' is invalid: {e}")))?;
        }
        if self.normalise.noise.max_repeat == 0 {
            return Err(config_err("normalise.noise.max_repeat must be at least 1"));
        }

        let ds = &self.dataset;
        if ds.claims_sections.is_empty() || ds.description_sections.is_empty() {
            return Err(config_err("dataset section priority lists must not be empty"));
        }
        if ds.min_claims_length > ds.max_claims_length {
            return Err(config_err(format!(
                "dataset.min_claims_length ({}) exceeds max_claims_length ({})",
                ds.min_claims_length, ds.max_claims_length
            )));
        }
        if ds.min_description_length > ds.max_description_length {
            return Err(config_err(format!(
                "dataset.min_description_length ({}) exceeds max_description_length ({})",
                ds.min_description_length, ds.max_description_length
            )));
        }
        if ds.record_min_text_length > ds.record_text_limit {
            return Err(config_err("dataset.record_min_text_length exceeds record_text_limit"));
        }

        if self.execution.quick_file_limit == 0 {
            return Err(config_err("execution.quick_file_limit must be at least 1"));
        }
        Ok(())
    }
}

fn config_err(msg: impl Into<String>) -> TokkyoError {
    TokkyoError::Config(msg.into())
}
