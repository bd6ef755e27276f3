//! Destructive cleaning of unprotected text.

use regex::Regex;
use tokkyo_common::{Result, TokkyoError};

use super::noise::NoisePolicy;

#[derive(Debug, Clone)]
pub struct TextCleaner {
    line_break: Regex,
    tag: Regex,
    separator: Regex,
    control: Regex,
    horizontal: Regex,
    newlines: Regex,
    noise: NoisePolicy,
}

impl TextCleaner {
    pub fn new(noise: NoisePolicy) -> Result<Self> {
        let compile = |p: &str| Regex::new(p).map_err(|e| TokkyoError::Config(e.to_string()));
        Ok(Self {
            line_break: compile(r"(?i)<\s*(?:[a-z_][\w.-]*:)?br\s*/?\s*>")?,
            tag: compile(r"</?[A-Za-z_][^<>]*>")?,
            separator: compile(r"[\x{2028}\x{2029}]")?,
            control: compile(r"[[\p{Cc}\p{Cf}]&&[^\n\t]]")?,
            horizontal: compile(r"[^\S\n]+")?,
            newlines: compile(r"[^\S\n]*\n\s*")?,
            noise,
        })
    }

    pub fn noise(&self) -> &NoisePolicy {
        &self.noise
    }

    /// Clean one gap between protected spans. Gaps are not trimmed, so
    /// spacing next to a protected span survives as a single space.
    pub fn clean_gap(&self, gap: &str) -> String {
        let text = self.line_break.replace_all(gap, "\n");
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        let text = self.tag.replace_all(&text, "");
        let text = self.separator.replace_all(&text, "\n");
        let text = self.control.replace_all(&text, "");
        let text = self.collapse_whitespace(&text);
        let text = self.noise.apply(&text);
        let text = self.noise.collapse_repeats(&text);
        self.collapse_whitespace(&text)
    }

    fn collapse_whitespace(&self, text: &str) -> String {
        let text = self.horizontal.replace_all(text, " ");
        self.newlines.replace_all(&text, "\n").into_owned()
    }
}
