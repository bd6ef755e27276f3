//! Span protection around destructive cleaning.
//!
//! [`Protector::protect`] records, as byte ranges over the untouched input,
//! every span that cleaning must not alter: paragraph/claim markers,
//! important legal phrases and gated chemical notation. [`ProtectedText::transform`]
//! then runs a cleaning function over the gaps only and copies each protected
//! span back verbatim. No placeholder strings are ever written into the text,
//! so input that happens to look like a placeholder is just ordinary text.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::chemical::ChemicalRecognizer;
use crate::entity_types::Importance;
use crate::legal::LegalRecognizer;
use crate::Result;

/// Why a span is protected. Earlier variants win overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Marker,
    Legal,
    Chemical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedSpan {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

impl ProtectedSpan {
    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// An input string plus its sorted, non-overlapping protected spans.
#[derive(Debug, Clone)]
pub struct ProtectedText<'a> {
    source: &'a str,
    spans: Vec<ProtectedSpan>,
}

impl<'a> ProtectedText<'a> {
    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn spans(&self) -> &[ProtectedSpan] {
        &self.spans
    }

    /// Protected substrings in text order.
    pub fn protected_strs(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.spans.iter().map(|s| &self.source[s.start..s.end])
    }

    /// Apply `clean` to every unprotected gap; protected spans pass through.
    pub fn transform<F>(&self, mut clean: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for span in &self.spans {
            if span.start > cursor {
                out.push_str(&clean(&self.source[cursor..span.start]));
            }
            out.push_str(&self.source[span.start..span.end]);
            cursor = span.end;
        }
        if cursor < self.source.len() {
            out.push_str(&clean(&self.source[cursor..]));
        }
        out
    }

    /// Reassemble without cleaning. Always equals the original input.
    pub fn restore(&self) -> String {
        self.transform(str::to_string)
    }
}

pub struct Protector {
    markers: Regex,
    markup: Regex,
    legal: LegalRecognizer,
    chemical: Option<ChemicalRecognizer>,
}

impl Protector {
    /// `chemical_window` of `None` disables chemical protection.
    pub fn new(chemical_window: Option<usize>) -> Result<Self> {
        Ok(Self {
            markers: Regex::new(r"【(?:\d{4,}|請求項\d+)】")?,
            markup: Regex::new(r"</?[A-Za-z_][^<>]*>")?,
            legal: LegalRecognizer::new()?,
            chemical: chemical_window.map(ChemicalRecognizer::new).transpose()?,
        })
    }

    pub fn legal(&self) -> &LegalRecognizer {
        &self.legal
    }

    pub fn chemical(&self) -> Option<&ChemicalRecognizer> {
        self.chemical.as_ref()
    }

    pub fn protect<'a>(&self, text: &'a str) -> ProtectedText<'a> {
        let markup: Vec<(usize, usize)> = self
            .markup
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();
        let in_markup = |start: usize, end: usize| markup.iter().any(|&(s, e)| s < end && start < e);

        // Markers go in first and are never excluded by markup.
        let mut spans: Vec<ProtectedSpan> = self
            .markers
            .find_iter(text)
            .map(|m| ProtectedSpan { start: m.start(), end: m.end(), kind: SpanKind::Marker })
            .collect();
        let admit = |spans: &mut Vec<ProtectedSpan>, start: usize, end: usize, kind: SpanKind| {
            if start < end && !in_markup(start, end) && !spans.iter().any(|s| s.overlaps(start, end)) {
                spans.push(ProtectedSpan { start, end, kind });
            }
        };

        for expr in self.legal.extract(text) {
            if expr.importance >= Importance::Important {
                admit(&mut spans, expr.start, expr.end, SpanKind::Legal);
            }
        }
        if let Some(chemical) = &self.chemical {
            for entity in chemical.extract(text) {
                admit(&mut spans, entity.start, entity.end, SpanKind::Chemical);
            }
        }

        spans.sort_by_key(|s| s.start);
        trace!(spans = spans.len(), "Protected spans recorded");
        ProtectedText { source: text, spans }
    }
}
