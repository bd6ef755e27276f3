//! Keyword-window scoring for chemical candidates.
//!
//! A candidate counts as chemical only when the text around it mentions more
//! distinct chemistry keywords than distinct non-chemistry keywords. The
//! candidate itself is never scored. Both
//! keyword lists live in one Aho-Corasick automaton so a window is scanned
//! once.

use aho_corasick::AhoCorasick;
use ahash::AHashSet;

use crate::{NerError, Result};

const CHEMICAL_KEYWORDS: &[&str] = &[
    "化合物", "分子", "溶液", "反応", "合成", "製造", "調製", "精製",
    "結晶", "溶媒", "触媒", "重合", "酸化", "還元", "加水分解", "濃度",
    "純度", "収率", "選択性", "モル", "当量", "組成", "原料", "試薬",
    "生成物", "副生成物", "中間体", "最終産物",
];

const NON_CHEMICAL_KEYWORDS: &[&str] = &[
    "年度", "削減", "問題", "項目", "番号", "章", "条", "節", "図", "表",
    "例", "データ", "システム", "プログラム", "コード", "ファイル",
    "バージョン", "モデル",
];

/// Score of one context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextScore {
    pub chemical: usize,
    pub non_chemical: usize,
}

impl ContextScore {
    pub fn is_chemical(&self) -> bool {
        self.chemical > self.non_chemical
    }
}

pub struct KeywordContext {
    automaton: AhoCorasick,
    /// Patterns with index below this are chemistry keywords.
    chemical_count: usize,
    /// Characters inspected on each side of a span.
    window: usize,
}

impl KeywordContext {
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(NerError::InvalidInput("context window must be at least 1".into()));
        }
        let patterns: Vec<&str> = CHEMICAL_KEYWORDS
            .iter()
            .chain(NON_CHEMICAL_KEYWORDS)
            .copied()
            .collect();
        // Standard match kind: overlapping search needs it.
        let automaton = AhoCorasick::new(&patterns)?;
        Ok(Self {
            automaton,
            chemical_count: CHEMICAL_KEYWORDS.len(),
            window,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Score the text on either side of the byte span `start..end` of `text`.
    pub fn score(&self, text: &str, start: usize, end: usize) -> ContextScore {
        let (before, after) = char_context(text, start, end, self.window);
        let mut seen = AHashSet::new();
        for side in [before, after] {
            for mat in self.automaton.find_overlapping_iter(side) {
                seen.insert(mat.pattern().as_usize());
            }
        }
        let chemical = seen.iter().filter(|&&id| id < self.chemical_count).count();
        ContextScore {
            chemical,
            non_chemical: seen.len() - chemical,
        }
    }
}

/// Up to `n` characters before `start` and after `end`, excluding the span.
pub fn char_context(text: &str, start: usize, end: usize, n: usize) -> (&str, &str) {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    (&text[from..start], &text[end..to])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_context_counts_characters_not_bytes() {
        let text = "あいうえおXかきくけこ";
        let start = text.find('X').unwrap();
        assert_eq!(char_context(text, start, start + 1, 2), ("えお", "かき"));
        assert_eq!(char_context(text, start, start + 1, 50), ("あいうえお", "かきくけこ"));
    }

    #[test]
    fn test_span_keywords_not_counted() {
        let ctx = KeywordContext::new(20).unwrap();
        let text = "純度99%以上";
        let score = ctx.score(text, 0, text.len());
        assert_eq!(score, ContextScore::default());
        assert!(!score.is_chemical());
    }

    #[test]
    fn test_chemical_context_wins() {
        let ctx = KeywordContext::new(20).unwrap();
        let text = "化合物C6H12O6を反応させた";
        let start = text.find("C6").unwrap();
        let score = ctx.score(text, start, start + "C6H12O6".len());
        assert_eq!(score.chemical, 2);
        assert_eq!(score.non_chemical, 0);
        assert!(score.is_chemical());
    }

    #[test]
    fn test_non_chemical_context_blocks() {
        let ctx = KeywordContext::new(20).unwrap();
        let text = "図5のデータ項目Aを参照";
        let start = text.find('A').unwrap();
        let score = ctx.score(text, start, start + 1);
        assert!(!score.is_chemical());
    }

    #[test]
    fn test_repeated_keyword_counts_once() {
        let ctx = KeywordContext::new(20).unwrap();
        let text = "溶液溶液溶液 X 図";
        let start = text.find('X').unwrap();
        let score = ctx.score(text, start, start + 1);
        assert_eq!(score, ContextScore { chemical: 1, non_chemical: 1 });
        assert!(!score.is_chemical());
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(KeywordContext::new(0).is_err());
    }
}
