//! tokkyo — JPO ST96 patent XML to instruction-tuning datasets.
//! Entry point for the command-line binary.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tokkyo_common::{PipelineConfig, RunMode};
use tokkyo_dataset::formats::{to_alpaca, to_chat_template, to_chatml};
use tokkyo_dataset::{export_datasets, read_json, write_json, DatasetAssembler, RecordCleaner, SectionEntry};
use tokkyo_ingestion::{discover_xml_files, select_files, Normaliser, PatentPipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tokkyo", version, about = "Japanese patent XML to training datasets")]
struct Cli {
    /// Config file (TOML, YAML or JSON)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Flat legacy limits JSON (MAX_CLAIMS_LENGTH, ...) applied over the config
    #[arg(long, global = true, value_name = "PATH")]
    legacy_limits: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract, normalise and validate XML files, then export every dataset
    Process(ProcessArgs),
    /// Clean a JSON array of flat training records
    Clean(CleanArgs),
    /// Pair claims with descriptions from a sections dataset
    Pair(PairArgs),
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// single, bulk or quick
    #[arg(long)]
    mode: Option<RunMode>,

    /// Directory scanned recursively for *.xml
    #[arg(long, value_name = "DIR")]
    data: Option<PathBuf>,

    /// Directory receiving the dataset files
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CleanArgs {
    #[arg(long, value_name = "PATH")]
    input: PathBuf,

    #[arg(long, value_name = "PATH")]
    output: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PairFormat {
    Chatml,
    Alpaca,
    ChatTemplate,
}

#[derive(Args, Debug)]
struct PairArgs {
    #[arg(long, value_name = "PATH")]
    input: PathBuf,

    #[arg(long, value_name = "PATH")]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = PairFormat::Chatml)]
    format: PairFormat,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.quiet { "warn" } else { "tokkyo=debug,info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::load(cli.config.as_deref(), cli.legacy_limits.as_deref())?;

    match cli.command {
        Commands::Process(args) => process(config, args),
        Commands::Clean(args) => clean(&config, &args),
        Commands::Pair(args) => pair(&config, &args),
    }
}

fn process(mut config: PipelineConfig, args: ProcessArgs) -> anyhow::Result<()> {
    if let Some(mode) = args.mode {
        config.execution.mode = mode;
    }
    let data_dir = args.data.unwrap_or_else(|| PathBuf::from(&config.execution.data_dir));
    let output_dir = args.output.unwrap_or_else(|| PathBuf::from(&config.output.dir));

    info!(version = env!("CARGO_PKG_VERSION"), mode = %config.execution.mode, "tokkyo starting");

    if !data_dir.is_dir() {
        bail!("Data directory not found: {}", data_dir.display());
    }
    let found = discover_xml_files(&data_dir)?;
    let files = select_files(found, config.execution.mode, config.execution.quick_file_limit);
    if files.is_empty() {
        bail!("No XML files found under {}", data_dir.display());
    }

    let pipeline = PatentPipeline::new(&config)?;
    let batch = pipeline.run_batch(&files);

    println!("run id:          {}", batch.run_id);
    println!("files found:     {}", batch.files_found);
    println!("files parsed:    {}", batch.files_parsed);
    println!("files skipped:   {}", batch.files_skipped);
    println!("duplicates:      {}", batch.duplicates);
    println!("records valid:   {}", batch.records_valid);
    println!("records invalid: {}", batch.records_invalid);

    if batch.files_parsed == 0 {
        bail!("None of the {} XML files could be parsed", batch.files_found);
    }

    let summary = export_datasets(&batch.records, &output_dir, &config.dataset, Utc::now())
        .with_context(|| format!("Failed to export datasets to {}", output_dir.display()))?;

    println!("sections:        {}", summary.sections);
    println!("pairs:           {}", summary.pairs);
    println!("  no claims:       {}", summary.assembly.no_claims);
    println!("  no description:  {}", summary.assembly.no_description);
    println!("  too short:       {}", summary.assembly.too_short);
    println!("paragraph records: {}", summary.paragraph_records);
    println!("conversations:   {}", summary.conversations);
    println!("output:          {}", output_dir.display());

    if summary.pairs == 0 {
        bail!("No training pairs were produced");
    }
    Ok(())
}

fn clean(config: &PipelineConfig, args: &CleanArgs) -> anyhow::Result<()> {
    let records = read_records(&args.input)?;
    let normaliser = Normaliser::new(&config.normalise)?;
    let (cleaned, stats) = RecordCleaner::new(&normaliser, &config.dataset).clean_all(&records);
    write_json(&args.output, &cleaned)?;

    println!("original records: {}", stats.original_count);
    println!("cleaned records:  {}", stats.cleaned_count);
    println!("retention:        {:.1}%", stats.retention_rate);
    println!("avg length:       {:.1} -> {:.1}", stats.original_avg_length, stats.cleaned_avg_length);
    println!("length range:     {}..={}", stats.min_length, stats.max_length);
    Ok(())
}

fn read_records(path: &Path) -> anyhow::Result<Vec<Value>> {
    let value: Value = read_json(path).with_context(|| format!("Failed to read {}", path.display()))?;
    match value {
        Value::Array(records) => Ok(records),
        _ => bail!("{} must contain a JSON array", path.display()),
    }
}

fn pair(config: &PipelineConfig, args: &PairArgs) -> anyhow::Result<()> {
    let entries: Vec<SectionEntry> =
        read_json(&args.input).with_context(|| format!("Failed to read {}", args.input.display()))?;
    let assembler = DatasetAssembler::new(&config.dataset)?;
    let (pairs, stats) = assembler.assemble(&entries);

    let prompt = &config.dataset.system_prompt;
    match args.format {
        PairFormat::Chatml => {
            let now = Utc::now();
            let records: Vec<_> = pairs.iter().map(|p| to_chatml(p, prompt, now)).collect();
            write_json(&args.output, &records)?;
        }
        PairFormat::Alpaca => {
            let records: Vec<_> = pairs.iter().map(to_alpaca).collect();
            write_json(&args.output, &records)?;
        }
        PairFormat::ChatTemplate => {
            let records: Vec<_> = pairs.iter().map(|p| to_chat_template(p, prompt)).collect();
            write_json(&args.output, &records)?;
        }
    }

    println!("patents:         {}", stats.groups);
    println!("pairs:           {}", stats.paired);
    println!("  no claims:       {}", stats.no_claims);
    println!("  no description:  {}", stats.no_description);
    println!("  too short:       {}", stats.too_short);

    if pairs.is_empty() {
        bail!("No training pairs were produced");
    }
    Ok(())
}
