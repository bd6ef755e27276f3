//! OCR / conversion noise removal.
//!
//! This is a lossy heuristic: the default rules delete uppercase runs and
//! long digit runs that real text may also contain. Tune `rules` and
//! `allowlist` in `normalise.noise` for corpora where that matters.

use std::collections::HashSet;

use regex::{Captures, Regex};
use tokkyo_common::{NoiseConfig, Result, TokkyoError};

#[derive(Debug, Clone)]
pub struct NoisePolicy {
    rules: Vec<Regex>,
    allowlist: HashSet<String>,
    max_repeat: usize,
}

impl NoisePolicy {
    pub fn from_config(config: &NoiseConfig) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(|r| Regex::new(r).map_err(|e| TokkyoError::Config(format!("noise rule '{r}': {e}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            rules,
            allowlist: config.allowlist.iter().cloned().collect(),
            max_repeat: config.max_repeat.max(1),
        })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Delete every rule match, in rule order, unless the match is allowlisted.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for rule in &self.rules {
            out = rule
                .replace_all(&out, |caps: &Captures| {
                    let hit = &caps[0];
                    if self.allowlist.contains(hit) {
                        hit.to_string()
                    } else {
                        String::new()
                    }
                })
                .into_owned();
        }
        out
    }

    /// Shorten every run of one repeated character to `max_repeat`.
    pub fn collapse_repeats(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut prev: Option<char> = None;
        let mut run = 0usize;
        for c in text.chars() {
            if prev == Some(c) {
                run += 1;
            } else {
                prev = Some(c);
                run = 1;
            }
            if run <= self.max_repeat {
                out.push(c);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> NoisePolicy {
        NoisePolicy::from_config(&NoiseConfig::default()).unwrap()
    }

    #[test]
    fn test_default_rules_remove_ocr_tokens() {
        assert_eq!(policy().apply("CHEMICAL6479MICA溶液を精製する"), "溶液を精製する");
        assert_eq!(policy().apply("番号123456です"), "番号です");
        assert_eq!(policy().apply("ABCDEFG社"), "社");
    }

    #[test]
    fn test_allowlist_keeps_match() {
        let config = NoiseConfig {
            allowlist: vec!["ABCDEFG".to_string()],
            ..Default::default()
        };
        let policy = NoisePolicy::from_config(&config).unwrap();
        assert_eq!(policy.apply("ABCDEFG社"), "ABCDEFG社");
    }

    #[test]
    fn test_short_tokens_untouched() {
        assert_eq!(policy().apply("NaCl水溶液 1234"), "NaCl水溶液 1234");
    }

    #[test]
    fn test_collapse_repeats() {
        assert_eq!(policy().collapse_repeats("あああああ!!!ab"), "ああ!!ab");
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let config = NoiseConfig {
            rules: vec!["(".to_string()],
            ..Default::default()
        };
        assert!(NoisePolicy::from_config(&config).is_err());
    }
}
