//! Ingestion → export → cleaning over an in-memory ST96 document.

use chrono::Utc;
use serde_json::Value;
use tokkyo_common::{DatasetConfig, PipelineConfig};
use tokkyo_dataset::export::{CHATML_DATASET, CONVERSATION_DATASET, PARAGRAPH_DATASET, TRAINING_DATASET};
use tokkyo_dataset::{export_datasets, read_json, DatasetAssembler, RecordCleaner, SectionEntry};
use tokkyo_ingestion::{Normaliser, PatentPipeline, PatentRecord};

const CLAIM_BODY: &str =
    "基板と、前記基板の上に配置された電極と、前記電極を覆う絶縁膜とを備える半導体装置であって、前記電極は銅からなる装置。";

const PARAGRAPH: &str =
    "本実施形態の半導体装置は、シリコン基板と、その上に形成された銅電極と、電極を覆う酸化膜とを有する。";

fn valid_record(pipeline: &PatentPipeline) -> PatentRecord {
    let claims: String = (1..=3)
        .map(|n| {
            let text = if n == 1 {
                CLAIM_BODY.to_string()
            } else {
                format!("請求項{}に記載の{CLAIM_BODY}", n - 1)
            };
            format!("<pat:Claim><pat:ClaimNumber>{n}</pat:ClaimNumber><pat:ClaimText>{text}</pat:ClaimText></pat:Claim>")
        })
        .collect();
    let paragraphs: String = (10..=12)
        .map(|n| format!(r#"<com:P com:pNumber="{n:04}">{PARAGRAPH}</com:P>"#))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<jppat:PatentPublication
    xmlns:jppat="http://www.jpo.go.jp/standards/XMLSchema/ST96/JPPatent"
    xmlns:com="http://www.wipo.int/standards/XMLSchema/ST96/Common"
    xmlns:pat="http://www.wipo.int/standards/XMLSchema/ST96/Patent">
  <pat:PublicationNumber>2023-100001</pat:PublicationNumber>
  <pat:InventionTitle>半導体装置及びその製造方法</pat:InventionTitle>
  <pat:EmbodimentDescription>{paragraphs}</pat:EmbodimentDescription>
  <pat:Claims>{claims}</pat:Claims>
</jppat:PatentPublication>"#
    );
    let record = pipeline.process_str(&xml, None).unwrap();
    assert!(record.is_valid(), "fixture must validate: {:?}", record.validation);
    record
}

#[test]
fn test_export_produces_pairs_and_paragraph_formats() {
    let config = PipelineConfig::default();
    let pipeline = PatentPipeline::new(&config).unwrap();
    let record = valid_record(&pipeline);
    let dir = tempfile::tempdir().unwrap();

    let summary = export_datasets(&[record.clone()], dir.path(), &config.dataset, Utc::now()).unwrap();
    assert_eq!(summary.valid_records, 1);
    assert_eq!(summary.pairs, 1);
    assert_eq!(summary.paragraph_records, 3);
    assert_eq!(summary.conversations, 1);

    let chatml: Vec<Value> = read_json(&dir.path().join(CHATML_DATASET)).unwrap();
    assert_eq!(chatml[0]["metadata"]["patent_id"], record.id.value.as_str());
    assert_eq!(chatml[0]["metadata"]["claims_section"], "claims");
    let assistant = chatml[0]["messages"][2]["content"].as_str().unwrap();
    assert!(assistant.starts_with("【0010】"));

    let paragraphs: Vec<Value> = read_json(&dir.path().join(PARAGRAPH_DATASET)).unwrap();
    assert_eq!(paragraphs[2]["metadata"]["paragraph_number"], "【0012】");

    let conversations: Vec<Value> = read_json(&dir.path().join(CONVERSATION_DATASET)).unwrap();
    assert_eq!(conversations[0]["metadata"]["conversation_turns"], 7);
}

#[test]
fn test_cleaning_exported_training_records() {
    let config = PipelineConfig::default();
    let pipeline = PatentPipeline::new(&config).unwrap();
    let record = valid_record(&pipeline);
    let dir = tempfile::tempdir().unwrap();
    export_datasets(&[record], dir.path(), &config.dataset, Utc::now()).unwrap();

    let training: Vec<Value> = read_json(&dir.path().join(TRAINING_DATASET)).unwrap();
    let normaliser = Normaliser::new(&config.normalise).unwrap();
    let (cleaned, stats) = RecordCleaner::new(&normaliser, &config.dataset).clean_all(&training);

    assert_eq!(stats.cleaned_count, 1);
    let text = cleaned[0]["text"].as_str().unwrap();
    assert!(text.chars().count() <= config.dataset.record_text_limit);
    assert!(text.contains("【0010】"));
}

#[test]
fn test_claims_scenario_truncates_to_whole_units() {
    let unit = |marker: &str, total: usize| {
        let body = total - marker.chars().count();
        format!("{marker}{}", "あい".repeat(body / 2) + &"あ".repeat(body % 2))
    };
    let claims = format!(
        "{}{}{}",
        unit("【請求項1】", 200),
        unit("【請求項2】", 200),
        unit("【請求項3】", 500)
    );
    let entries = vec![
        SectionEntry {
            patent_id: "JP1".into(),
            patent_id_synthetic: false,
            section: "claims".into(),
            text: claims,
        },
        SectionEntry {
            patent_id: "JP1".into(),
            patent_id_synthetic: false,
            section: "detailed_description".into(),
            text: format!("【0010】{}", PARAGRAPH.repeat(3)),
        },
    ];

    let assembler = DatasetAssembler::new(&DatasetConfig::default()).unwrap();
    let (pairs, stats) = assembler.assemble(&entries);
    assert_eq!(stats.paired, 1);
    assert_eq!(pairs[0].user_message.chars().count(), 400);
    assert!(!pairs[0].user_message.contains("【請求項3】"));
}
