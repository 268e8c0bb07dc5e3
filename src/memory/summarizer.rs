//! Summary-round response parsing
//!
//! The memory app answers the summary sentinel with text split into sections
//! by bracket markers:
//!
//! ```text
//! 【【总结】】short summary
//! 【【永久记忆】】type: preference
//! content: likes green tea
//! ```
//!
//! Either section may be missing. Unknown markers end the preceding section.

use regex::Regex;
use std::sync::LazyLock;

/// Query that asks the memory app to start a summary round
pub const SUMMARY_SENTINEL: &str = "【【开始总结】】";

/// Marker preceding the conversation summary
pub const SUMMARY_MARKER: &str = "【【总结】】";

/// Marker preceding the permanent-memory facts
pub const PERMANENT_MEMORY_MARKER: &str = "【【永久记忆】】";

/// Marker starting each permanent-memory entry
pub const ENTRY_TYPE_MARKER: &str = "type:";

static SECTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"【【[^】]+】】").expect("valid section marker regex"));

static ESCAPED_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\(.)").expect("valid escape regex"));

/// Parsed summary-round response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryReport {
    /// Conversation summary, relayed to the primary chat
    pub summary: Option<String>,
    /// Raw permanent-memory section
    pub permanent_memory: Option<String>,
}

impl SummaryReport {
    /// Parse a memory app answer
    pub fn parse(response: &str) -> Self {
        let mut report = SummaryReport::default();
        let markers: Vec<_> = SECTION_MARKER.find_iter(response).collect();

        for (i, marker) in markers.iter().enumerate() {
            let end = markers
                .get(i + 1)
                .map(|next| next.start())
                .unwrap_or(response.len());
            let content = response[marker.end()..end].trim();
            if content.is_empty() {
                continue;
            }

            let slot = match marker.as_str() {
                SUMMARY_MARKER => &mut report.summary,
                PERMANENT_MEMORY_MARKER => &mut report.permanent_memory,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(content.to_string());
            }
        }

        report
    }

    /// Whether neither section was found
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.permanent_memory.is_none()
    }

    /// Text relayed to the primary chat, if there is a summary
    pub fn relay_text(&self) -> Option<String> {
        self.summary
            .as_deref()
            .map(|summary| format!("{}{}", SUMMARY_MARKER, summary))
    }

    /// Knowledge-base segments for the permanent memory, if any
    pub fn memory_segments(&self) -> Vec<String> {
        self.permanent_memory
            .as_deref()
            .and_then(clean_permanent_memory)
            .map(|cleaned| split_segments(&cleaned))
            .unwrap_or_default()
    }
}

/// Remove one level of backslash escaping, leaving `\n` sequences intact
pub fn unescape(text: &str) -> String {
    ESCAPED_CHAR
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let escaped = &caps[1];
            if escaped == "n" {
                "\\n".to_string()
            } else {
                escaped.to_string()
            }
        })
        .into_owned()
}

/// Unescape and cut the text down to the entries between the first
/// `type:` and the end of the line holding the last one.
///
/// Returns `None` when nothing usable is left.
pub fn clean_permanent_memory(raw: &str) -> Option<String> {
    let text = unescape(raw);
    let start = text.find(ENTRY_TYPE_MARKER)?;
    let last = text.rfind(ENTRY_TYPE_MARKER)?;
    let end = text[last..]
        .find(['\n', '\r'])
        .map(|offset| last + offset)
        .unwrap_or(text.len());

    let cleaned = text[start..end].trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// One segment per non-blank line. Literal `\n` sequences count as breaks.
pub fn split_segments(text: &str) -> Vec<String> {
    text.replace("\\n", "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_sections() {
        let report = SummaryReport::parse("【【总结】】S\n【【永久记忆】】type: note\nhello\n");

        assert_eq!(report.summary.as_deref(), Some("S"));
        assert_eq!(report.relay_text().as_deref(), Some("【【总结】】S"));
        assert_eq!(report.permanent_memory.as_deref(), Some("type: note\nhello"));
        assert_eq!(
            clean_permanent_memory(report.permanent_memory.as_deref().unwrap()).as_deref(),
            Some("type: note")
        );
        assert_eq!(report.memory_segments(), vec!["type: note".to_string()]);
    }

    #[test]
    fn test_parse_missing_sections() {
        let report = SummaryReport::parse("nothing tagged here");
        assert!(report.is_empty());
        assert!(report.relay_text().is_none());
        assert!(report.memory_segments().is_empty());

        let only_memory = SummaryReport::parse("【【永久记忆】】type: a\n");
        assert!(only_memory.summary.is_none());
        assert_eq!(only_memory.memory_segments(), vec!["type: a".to_string()]);
    }

    #[test]
    fn test_empty_section_is_none() {
        let report = SummaryReport::parse("【【总结】】  \n【【永久记忆】】type: x");
        assert!(report.summary.is_none());
        assert_eq!(report.permanent_memory.as_deref(), Some("type: x"));
    }

    #[test]
    fn test_unknown_marker_ends_section() {
        let report = SummaryReport::parse("【【总结】】S【【其他】】ignored");
        assert_eq!(report.summary.as_deref(), Some("S"));
        assert!(report.permanent_memory.is_none());
    }

    #[test]
    fn test_unescape_keeps_newline_escapes() {
        assert_eq!(unescape(r#"say \"hi\"\nnext"#), r#"say "hi"\nnext"#);
        assert_eq!(unescape(r"a\\b"), r"a\b");
    }

    #[test]
    fn test_clean_spans_first_to_last_entry() {
        let raw = "intro\ntype: pref\ncontent: tea\ntype: fact\ncontent: lives in Shanghai\n";
        assert_eq!(
            clean_permanent_memory(raw).as_deref(),
            Some("type: pref\ncontent: tea\ntype: fact")
        );
        assert!(clean_permanent_memory("no entries").is_none());
    }

    #[test]
    fn test_split_segments_on_real_and_escaped_newlines() {
        let segments = split_segments("type: a\\ncontent: b\n\n  type: c  ");
        assert_eq!(segments, vec!["type: a", "content: b", "type: c"]);
    }
}
