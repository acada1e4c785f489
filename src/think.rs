//! Filtering of `<think>...</think>` reasoning blocks from model output.
//!
//! Models served behind OpenAI-compatible endpoints often interleave a
//! reasoning section, delimited by think tags, with the user-facing
//! answer. This module removes those sections from accumulated stream
//! text. The filter is a pure projection: callers re-run it over the
//! full accumulated text after every delta, so it must be cheap (a
//! single linear scan, no regex) and idempotent.

use std::borrow::Cow;

const OPEN_TAG: &str = "<think>";
const CLOSE_TAG: &str = "</think>";

/// Removes every complete `<think>...</think>` region from `text`.
///
/// Matching is case-insensitive and regions may span multiple lines.
/// Whitespace immediately following a closing tag is removed along with
/// the region. An opening tag with no closing tag yet, as happens while
/// the reasoning section is still streaming, is left in place together
/// with everything after it; once the closing tag arrives a later call
/// removes the whole region, including tags split across deltas.
///
/// Returns the input unchanged (borrowed, no allocation) when there is
/// nothing to remove.
pub fn strip_think(text: &str) -> Cow<'_, str> {
    let Some(first_open) = find_ignore_case(text, OPEN_TAG, 0) else {
        return Cow::Borrowed(text);
    };
    if find_ignore_case(text, CLOSE_TAG, first_open + OPEN_TAG.len()).is_none() {
        // Only an unmatched opening tag: nothing is removed.
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(open) = find_ignore_case(text, OPEN_TAG, pos) {
        let Some(close) = find_ignore_case(text, CLOSE_TAG, open + OPEN_TAG.len()) else {
            break;
        };
        out.push_str(&text[pos..open]);
        let after_close = close + CLOSE_TAG.len();
        let trailing = text[after_close..].len() - text[after_close..].trim_start().len();
        pos = after_close + trailing;
    }
    out.push_str(&text[pos..]);
    Cow::Owned(out)
}

/// Length of the prefix of filtered text that is stable under further
/// streaming: everything before the first remaining opening tag.
///
/// `strip_think` leaves an unmatched opening tag and its tail in place,
/// and removes the whole region once the closing tag arrives, which
/// means that tail can later disappear. Renderers that cannot retract
/// already-printed output use this to hold back the volatile suffix.
pub fn visible_prefix_len(filtered: &str) -> usize {
    find_ignore_case(filtered, OPEN_TAG, 0).unwrap_or(filtered.len())
}

/// ASCII case-insensitive substring search starting at `from`.
fn find_ignore_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if from > hay.len() || needle.is_empty() || hay.len() - from < needle.len() {
        return None;
    }
    hay[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|offset| offset + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_unchanged() {
        assert_eq!(strip_think(""), "");
        assert!(matches!(strip_think(""), Cow::Borrowed(_)));
    }

    #[test]
    fn text_without_tags_borrowed() {
        let input = "no reasoning here";
        assert!(matches!(strip_think(input), Cow::Borrowed(_)));
        assert_eq!(strip_think(input), input);
    }

    #[test]
    fn removes_single_region() {
        assert_eq!(strip_think("a<think>hidden</think>b"), "ab");
    }

    #[test]
    fn removes_trailing_whitespace_after_close() {
        assert_eq!(strip_think("<think>x</think>\n\n  answer"), "answer");
    }

    #[test]
    fn removes_multiline_region() {
        assert_eq!(
            strip_think("pre<think>line one\nline two\n</think>post"),
            "prepost"
        );
    }

    #[test]
    fn case_insensitive_tags() {
        assert_eq!(strip_think("a<THINK>hidden</Think>b"), "ab");
    }

    #[test]
    fn removes_multiple_regions() {
        assert_eq!(
            strip_think("a<think>1</think>b<think>2</think>c"),
            "abc"
        );
    }

    #[test]
    fn unmatched_open_left_in_place() {
        let input = "answer so far<think>still reason";
        assert_eq!(strip_think(input), input);
        assert!(matches!(strip_think(input), Cow::Borrowed(_)));
    }

    #[test]
    fn split_across_fragments_removed_once_complete() {
        let first = "a<think>hid";
        assert_eq!(strip_think(first), first);

        let accumulated = format!("{first}den</think>b");
        assert_eq!(strip_think(&accumulated), "ab");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "",
            "plain",
            "a<think>hidden</think>b",
            "a<think>open only",
            "</think>stray close",
            "a<think>1</think>b<think>2</think>c",
            "<THINK>x</THINK>   y",
        ];
        for input in inputs {
            let once = strip_think(input).into_owned();
            let twice = strip_think(&once).into_owned();
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn stray_close_tag_kept() {
        assert_eq!(strip_think("a</think>b"), "a</think>b");
    }

    #[test]
    fn visible_prefix_stops_at_unmatched_open() {
        assert_eq!(visible_prefix_len("hello"), 5);
        assert_eq!(visible_prefix_len("ab<think>pending"), 2);
        assert_eq!(visible_prefix_len("<THINK>"), 0);
    }
}
