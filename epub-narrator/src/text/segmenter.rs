//! Splitting chapter text into synthesis-sized segments.
//!
//! Lengths are counted in characters, not bytes, so multi-byte text gets the
//! same window sizes as ASCII.

use super::Segment;
use std::ops::Range;

/// Default maximum segment length in characters.
pub const DEFAULT_MAX_CHARS: usize = 4000;

/// Character treated as the end of a sentence when looking for a split point.
pub const SENTENCE_TERMINATOR: char = '.';

/// Compute the untrimmed windows of `text` as byte ranges.
///
/// Each window holds at most `max_len` characters. When more text follows,
/// the window is shortened to end just after the last sentence terminator
/// inside it; with no terminator it is cut at exactly `max_len` characters.
/// Windows are contiguous and together cover the whole of `text`.
pub fn segment_windows(text: &str, max_len: usize) -> Vec<Range<usize>> {
    let max_len = max_len.max(1);

    // offsets[k] is the byte offset of character k; the last entry is text.len()
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    let mut windows = Vec::new();
    let mut cursor = 0;

    while cursor < total {
        let mut end = cursor + max_len;

        if end < total {
            if let Some(pos) = chars[cursor..end]
                .iter()
                .rposition(|&c| c == SENTENCE_TERMINATOR)
            {
                end = cursor + pos + 1;
            }
        } else {
            end = total;
        }

        windows.push(offsets[cursor]..offsets[end]);
        cursor = end;
    }

    windows
}

/// Split text into ordered segments of at most `max_len` characters,
/// preferring to break after a sentence terminator.
///
/// Each segment is its window with surrounding whitespace trimmed. Segments
/// are not filtered: a window made only of whitespace yields an empty string.
pub fn segment(text: &str, max_len: usize) -> Vec<String> {
    segment_windows(text, max_len)
        .into_iter()
        .map(|window| text[window].trim().to_string())
        .collect()
}

/// Split a chapter's text into numbered segments.
///
/// Ordinals start at 1.
pub fn split_chapter(chapter: usize, text: &str, max_len: usize) -> Vec<Segment> {
    segment(text, max_len)
        .into_iter()
        .enumerate()
        .map(|(i, text)| Segment::new(chapter, i + 1, text))
        .collect()
}
