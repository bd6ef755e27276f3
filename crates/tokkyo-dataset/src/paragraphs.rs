//! Splitting a description into its numbered paragraphs.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokkyo_common::{Result, TokkyoError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Marker as written, e.g. `【0012】`.
    pub number: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitParagraphs {
    /// Text before the first marker. It belongs to no paragraph.
    pub intro: Option<String>,
    pub paragraphs: Vec<Paragraph>,
}

pub struct ParagraphSplitter {
    marker: Regex,
}

impl ParagraphSplitter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            marker: Regex::new(r"【\d{4}】").map_err(|e| TokkyoError::Config(e.to_string()))?,
        })
    }

    /// Content runs from a marker to the next one. Paragraphs with blank
    /// content are dropped.
    pub fn split(&self, text: &str) -> SplitParagraphs {
        let markers: Vec<_> = self.marker.find_iter(text).collect();

        let intro_end = markers.first().map_or(text.len(), |m| m.start());
        let intro = text[..intro_end].trim();

        let paragraphs = markers
            .iter()
            .enumerate()
            .filter_map(|(i, m)| {
                let end = markers.get(i + 1).map_or(text.len(), |next| next.start());
                let content = text[m.end()..end].trim();
                (!content.is_empty()).then(|| Paragraph {
                    number: m.as_str().to_string(),
                    content: content.to_string(),
                })
            })
            .collect();

        SplitParagraphs {
            intro: (!intro.is_empty()).then(|| intro.to_string()),
            paragraphs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_with_intro() {
        let s = ParagraphSplitter::new().unwrap();
        let split = s.split("はじめに\n【0001】\n第一。\n【0002】\n第二。");
        assert_eq!(split.intro.as_deref(), Some("はじめに"));
        assert_eq!(
            split.paragraphs,
            vec![
                Paragraph { number: "【0001】".into(), content: "第一。".into() },
                Paragraph { number: "【0002】".into(), content: "第二。".into() },
            ]
        );
    }

    #[test]
    fn test_empty_paragraph_dropped() {
        let s = ParagraphSplitter::new().unwrap();
        let split = s.split("【0001】  【0002】内容");
        assert_eq!(split.intro, None);
        assert_eq!(split.paragraphs.len(), 1);
        assert_eq!(split.paragraphs[0].number, "【0002】");
    }

    #[test]
    fn test_no_markers() {
        let s = ParagraphSplitter::new().unwrap();
        let split = s.split("本文のみ");
        assert_eq!(split.intro.as_deref(), Some("本文のみ"));
        assert!(split.paragraphs.is_empty());
    }
}
