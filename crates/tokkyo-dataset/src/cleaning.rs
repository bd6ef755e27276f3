//! Record cleaning stage for flat JSON training records.
//!
//! Works on `serde_json::Value` so any flat export (not only ours) can be
//! cleaned. Every string runs through the same [`Normaliser`] as extraction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokkyo_common::DatasetConfig;
use tokkyo_ingestion::Normaliser;
use tracing::{info, instrument};

use crate::truncate::{char_len, hard_cut, limit_sentences};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub original_count: usize,
    pub cleaned_count: usize,
    /// Percentage of records kept.
    pub retention_rate: f64,
    pub original_avg_length: f64,
    pub cleaned_avg_length: f64,
    pub max_length: usize,
    pub min_length: usize,
}

pub struct RecordCleaner<'a> {
    normaliser: &'a Normaliser,
    text_limit: usize,
    min_text_length: usize,
    field_limit: usize,
    list_item_limit: usize,
}

impl<'a> RecordCleaner<'a> {
    pub fn new(normaliser: &'a Normaliser, config: &DatasetConfig) -> Self {
        Self {
            normaliser,
            text_limit: config.record_text_limit,
            min_text_length: config.record_min_text_length,
            field_limit: config.field_limit,
            list_item_limit: config.list_item_limit,
        }
    }

    /// `None` when the record is not an object or its cleaned `text` is too short.
    pub fn clean_record(&self, record: &Value) -> Option<Value> {
        let object = record.as_object()?;
        let mut cleaned = Map::with_capacity(object.len());

        for (key, value) in object {
            let value = match value {
                Value::String(s) if key == "text" => {
                    Value::String(limit_sentences(&self.normaliser.clean(s), self.text_limit))
                }
                Value::String(s) if is_identifier(key) => Value::String(hard_cut(s, self.field_limit)),
                Value::String(s) => Value::String(hard_cut(&self.normaliser.clean(s), self.field_limit)),
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => {
                                Value::String(hard_cut(&self.normaliser.clean(s), self.list_item_limit))
                            }
                            other => other.clone(),
                        })
                        .collect(),
                ),
                other => other.clone(),
            };
            cleaned.insert(key.clone(), value);
        }

        let text_len = cleaned.get("text").and_then(Value::as_str).map_or(0, char_len);
        (text_len >= self.min_text_length).then_some(Value::Object(cleaned))
    }

    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn clean_all(&self, records: &[Value]) -> (Vec<Value>, CleaningStats) {
        let cleaned: Vec<Value> = records.iter().filter_map(|r| self.clean_record(r)).collect();

        let original_lengths: Vec<usize> = records.iter().map(text_length).collect();
        let cleaned_lengths: Vec<usize> = cleaned.iter().map(text_length).collect();

        let stats = CleaningStats {
            original_count: records.len(),
            cleaned_count: cleaned.len(),
            retention_rate: percentage(cleaned.len(), records.len()),
            original_avg_length: average(&original_lengths),
            cleaned_avg_length: average(&cleaned_lengths),
            max_length: cleaned_lengths.iter().copied().max().unwrap_or(0),
            min_length: cleaned_lengths.iter().copied().min().unwrap_or(0),
        };

        info!(
            original = stats.original_count,
            cleaned = stats.cleaned_count,
            retention = format!("{:.1}%", stats.retention_rate),
            "Record cleaning complete"
        );
        (cleaned, stats)
    }
}

/// Ids are copied as-is; the noise rules would eat long digit runs.
fn is_identifier(key: &str) -> bool {
    key == "id" || key.ends_with("_id")
}

fn text_length(record: &Value) -> usize {
    record.get("text").and_then(Value::as_str).map_or(0, char_len)
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn average(values: &[usize]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<usize>() as f64 / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokkyo_common::NormaliseConfig;

    fn normaliser() -> Normaliser {
        Normaliser::new(&NormaliseConfig::default()).unwrap()
    }

    #[test]
    fn test_text_limited_at_sentence_boundary() {
        let n = normaliser();
        let mut config = DatasetConfig::default();
        config.record_text_limit = 60;
        config.record_min_text_length = 10;
        let cleaner = RecordCleaner::new(&n, &config);

        let sentence = "本発明は基板と電極とを備える半導体装置に関するものである。";
        let record = json!({ "patent_id": "2023-100001", "text": sentence.repeat(3) });
        let cleaned = cleaner.clean_record(&record).unwrap();

        let text = cleaned["text"].as_str().unwrap();
        assert!(text.ends_with('。'));
        assert!(char_len(text) <= 60);
        assert_eq!(cleaned["patent_id"], "2023-100001");
    }

    #[test]
    fn test_short_and_non_object_records_dropped() {
        let n = normaliser();
        let cleaner = RecordCleaner::new(&n, &DatasetConfig::default());
        let long = "本実施形態では、基板の上に電極を形成し、その上に絶縁膜を堆積する工程を説明する。\
                    この工程により信頼性の高い装置が得られる。";
        let records = vec![
            json!({ "text": "短い" }),
            json!("not an object"),
            json!({ "title": "題名のみ" }),
            json!({ "text": long, "claims": ["請求項の本文"], "count": 3 }),
        ];

        let (cleaned, stats) = cleaner.clean_all(&records);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0]["count"], 3);
        assert_eq!(cleaned[0]["claims"][0], "請求項の本文");
        assert_eq!(stats.original_count, 4);
        assert_eq!(stats.cleaned_count, 1);
        assert!((stats.retention_rate - 25.0).abs() < 1e-9);
        assert_eq!(stats.max_length, stats.min_length);
    }

    #[test]
    fn test_fields_and_list_items_hard_limited() {
        let n = normaliser();
        let mut config = DatasetConfig::default();
        config.field_limit = 10;
        config.list_item_limit = 5;
        config.record_min_text_length = 0;
        let cleaner = RecordCleaner::new(&n, &config);

        let record = json!({
            "text": "本文。",
            "title": "本発明は基板と電極とを備える半導体装置に関する",
            "claims": ["前記電極は銅からなる請求項1に記載の装置"],
        });
        let cleaned = cleaner.clean_record(&record).unwrap();
        assert_eq!(char_len(cleaned["title"].as_str().unwrap()), 10);
        assert_eq!(char_len(cleaned["claims"][0].as_str().unwrap()), 5);
    }

    #[test]
    fn test_empty_input_stats() {
        let n = normaliser();
        let cleaner = RecordCleaner::new(&n, &DatasetConfig::default());
        let (cleaned, stats) = cleaner.clean_all(&[]);
        assert!(cleaned.is_empty());
        assert_eq!(stats, CleaningStats::default());
    }
}
