//! Boundary-aware truncation.
//!
//! Text longer than the limit is cut at marker boundaries: an optional
//! unmarked intro, then one unit per marker running to the next marker.
//! Whole units are kept while they fit. All lengths are in characters and
//! the output never exceeds the limit.

use regex::Regex;
use tokkyo_common::{Result, TokkyoError};

const ELLIPSIS: &str = "...";

pub struct Truncator {
    claim_marker: Regex,
    paragraph_marker: Regex,
    any_marker: Regex,
    embodiment_heading: Regex,
}

impl Truncator {
    pub fn new() -> Result<Self> {
        let compile = |p: &str| Regex::new(p).map_err(|e| TokkyoError::Config(e.to_string()));
        Ok(Self {
            claim_marker: compile(r"【請求項\d+】")?,
            paragraph_marker: compile(r"【\d{4}】")?,
            any_marker: compile(r"【[^】]*】")?,
            embodiment_heading: compile(r"【発明を実施するための形態】|【発明を実施する形態】")?,
        })
    }

    pub fn claims(&self, text: &str, limit: usize) -> String {
        self.truncate_at_boundaries(text, limit, &self.claim_marker)
    }

    /// Like [`claims`](Self::claims) with paragraph markers, but anything
    /// before an embodiment heading is dropped first when the text is too long.
    pub fn description(&self, text: &str, limit: usize) -> String {
        if char_len(text) <= limit {
            return text.to_string();
        }
        let text = match self.embodiment_heading.find(text) {
            Some(m) => &text[m.start()..],
            None => text,
        };
        self.truncate_at_boundaries(text, limit, &self.paragraph_marker)
    }

    /// Unchanged when within `limit`; otherwise whole units split by
    /// `delimiter`, then by any bracket marker, then a hard cut.
    pub fn truncate_at_boundaries(&self, text: &str, limit: usize, delimiter: &Regex) -> String {
        if char_len(text) <= limit {
            return text.to_string();
        }
        accumulate_units(text, limit, delimiter)
            .or_else(|| accumulate_units(text, limit, &self.any_marker))
            .unwrap_or_else(|| hard_cut(text, limit))
    }
}

/// `None` when `delimiter` never matches.
fn accumulate_units(text: &str, limit: usize, delimiter: &Regex) -> Option<String> {
    let starts: Vec<usize> = delimiter.find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return None;
    }

    let mut bounds = Vec::with_capacity(starts.len() + 2);
    if starts[0] > 0 {
        bounds.push(0);
    }
    bounds.extend(&starts);
    bounds.push(text.len());

    let mut out = String::new();
    let mut used = 0;
    for pair in bounds.windows(2) {
        let unit = &text[pair[0]..pair[1]];
        if unit.trim().is_empty() {
            continue;
        }
        let n = char_len(unit);
        if used + n <= limit {
            out.push_str(unit);
            used += n;
        } else {
            if out.is_empty() {
                return Some(hard_cut(unit, limit));
            }
            break;
        }
    }
    Some(out.trim_end().to_string())
}

/// First `limit - 3` characters plus `...`; below 3, just the first `limit`.
pub fn hard_cut(text: &str, limit: usize) -> String {
    if char_len(text) <= limit {
        return text.to_string();
    }
    if limit < ELLIPSIS.len() {
        return text.chars().take(limit).collect();
    }
    let mut out: String = text.chars().take(limit - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Whole `。`-terminated sentences while they fit; hard cut when none does.
pub fn limit_sentences(text: &str, limit: usize) -> String {
    if char_len(text) <= limit {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for sentence in text.split_inclusive('。') {
        let n = char_len(sentence);
        if used + n > limit {
            break;
        }
        out.push_str(sentence);
        used += n;
    }
    if out.is_empty() {
        hard_cut(text, limit)
    } else {
        out
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
