//! Splitting reply text into text and sticker segments

use std::cmp::Reverse;

use super::mapping::EmotionMapping;

/// One piece of an outgoing paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSegment<'a> {
    /// Plain text, never empty
    Text(&'a str),
    /// Sticker image for a matched keyword
    Image {
        /// Matched keyword
        keyword: &'a str,
        /// Base64 image payload
        data: &'a str,
    },
}

impl<'a> MessageSegment<'a> {
    /// Text content, if this is a text segment
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            MessageSegment::Text(text) => Some(text),
            MessageSegment::Image { .. } => None,
        }
    }
}

struct KeywordMatch<'a> {
    start: usize,
    end: usize,
    rank: usize,
    keyword: &'a str,
    data: &'a str,
}

impl EmotionMapping {
    /// Split `text` at every keyword occurrence.
    ///
    /// Matches of all keywords are merged by position. Where matches overlap
    /// the earliest wins, then the longest, then the one listed first in the
    /// mapping. Empty input yields no segments.
    pub fn segment<'a>(&'a self, text: &'a str) -> Vec<MessageSegment<'a>> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<KeywordMatch<'a>> = self
            .iter()
            .enumerate()
            .filter(|(_, (keyword, _))| !keyword.is_empty())
            .flat_map(|(rank, (keyword, data))| {
                text.match_indices(keyword).map(move |(start, _)| KeywordMatch {
                    start,
                    end: start + keyword.len(),
                    rank,
                    keyword,
                    data,
                })
            })
            .collect();

        if matches.is_empty() {
            return vec![MessageSegment::Text(text)];
        }

        matches.sort_by_key(|m| (m.start, Reverse(m.end), m.rank));

        let mut segments = Vec::with_capacity(matches.len() * 2 + 1);
        let mut cursor = 0;
        for m in matches {
            if m.start < cursor {
                continue;
            }
            if m.start > cursor {
                segments.push(MessageSegment::Text(&text[cursor..m.start]));
            }
            segments.push(MessageSegment::Image {
                keyword: m.keyword,
                data: m.data,
            });
            cursor = m.end;
        }

        if cursor < text.len() {
            segments.push(MessageSegment::Text(&text[cursor..]));
        }

        segments
    }
}
