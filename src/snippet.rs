//! Snippet assembly from highlighted match text.
//!
//! The search engine fetches the full document text with match regions
//! wrapped in highlight markers, then condenses it here: marker runs that
//! sit close together collapse into one fragment, each fragment keeps a
//! window of surrounding context, and at most [`MAX_FRAGMENTS`] fragments
//! are joined with [`FRAGMENT_DELIMITER`]. Only the page being returned is
//! ever processed.

pub(crate) const HIGHLIGHT_START: &str = "<b>";
pub(crate) const HIGHLIGHT_END: &str = "</b>";
pub(crate) const FRAGMENT_DELIMITER: &str = " [...] ";
pub(crate) const MAX_FRAGMENTS: usize = 5;

/// Context kept on each side of a match run, in bytes before snapping to a
/// word boundary.
const CONTEXT_BYTES: usize = 48;

/// Two match runs closer than this merge into a single fragment.
const MERGE_GAP_BYTES: usize = 64;

/// Builds a snippet from text containing highlight markers. Returns an
/// empty string when the text holds no markers.
pub(crate) fn extract_fragments(highlighted: &str, max_fragments: usize) -> String {
    let runs = marker_runs(highlighted);
    if runs.is_empty() {
        return String::new();
    }

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in runs {
        match merged.last_mut() {
            Some(last) if start - last.1 <= MERGE_GAP_BYTES => last.1 = end,
            _ => merged.push((start, end)),
        }
    }
    merged.truncate(max_fragments);

    let fragments: Vec<&str> = merged
        .iter()
        .map(|&(start, end)| {
            &highlighted[context_start(highlighted, start)..context_end(highlighted, end)]
        })
        .collect();
    fragments.join(FRAGMENT_DELIMITER)
}

/// Byte ranges of `<b>...</b>` runs, including the markers themselves.
fn marker_runs(text: &str) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find(HIGHLIGHT_START) {
        let start = cursor + offset;
        let after_start = start + HIGHLIGHT_START.len();
        let Some(end_offset) = text[after_start..].find(HIGHLIGHT_END) else {
            break;
        };
        let end = after_start + end_offset + HIGHLIGHT_END.len();
        runs.push((start, end));
        cursor = end;
    }
    runs
}

/// Walks back from `pos` by the context window and snaps forward to the next
/// word start so fragments never open mid-word.
fn context_start(text: &str, pos: usize) -> usize {
    let mut target = pos.saturating_sub(CONTEXT_BYTES);
    if target == 0 {
        return 0;
    }
    while !text.is_char_boundary(target) {
        target -= 1;
    }
    text[target..pos]
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| target + i + c.len_utf8())
        .unwrap_or(target)
}

/// Walks forward from `pos` by the context window and snaps back to the last
/// word end.
fn context_end(text: &str, pos: usize) -> usize {
    let mut target = pos + CONTEXT_BYTES;
    if target >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(target) {
        target += 1;
    }
    text[pos..target]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, _)| pos + i)
        .unwrap_or(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_match_keeps_context_words() {
        let text = "the quick brown <b>fox</b> jumps over the lazy dog";
        let snippet = extract_fragments(text, MAX_FRAGMENTS);
        assert!(snippet.contains("<b>fox</b>"));
        assert!(snippet.contains("quick brown"));
        assert!(!snippet.contains(FRAGMENT_DELIMITER));
    }

    #[test]
    fn test_nearby_matches_share_a_fragment() {
        let text = "a <b>fox</b> and a <b>dog</b> met near the river bank";
        let snippet = extract_fragments(text, MAX_FRAGMENTS);
        assert!(snippet.contains("<b>fox</b>"));
        assert!(snippet.contains("<b>dog</b>"));
        assert!(!snippet.contains(FRAGMENT_DELIMITER));
    }

    #[test]
    fn test_distant_matches_become_separate_fragments() {
        let filler = "lorem ipsum dolor sit amet ".repeat(10);
        let text = format!("<b>alpha</b> {filler} <b>omega</b>");
        let snippet = extract_fragments(&text, MAX_FRAGMENTS);
        assert!(snippet.contains(FRAGMENT_DELIMITER));
        assert!(snippet.contains("<b>alpha</b>"));
        assert!(snippet.contains("<b>omega</b>"));
    }

    #[test]
    fn test_fragment_count_is_capped() {
        let filler = "x".repeat(200);
        let parts: Vec<String> = (0..8).map(|i| format!("<b>hit{i}</b> {filler}")).collect();
        let text = parts.join(" ");
        let snippet = extract_fragments(&text, MAX_FRAGMENTS);
        assert_eq!(snippet.matches(FRAGMENT_DELIMITER).count(), MAX_FRAGMENTS - 1);
    }

    #[test]
    fn test_no_markers_yields_empty_snippet() {
        assert_eq!(extract_fragments("plain text without matches", MAX_FRAGMENTS), "");
    }

    #[test]
    fn test_multibyte_text_stays_on_char_boundaries() {
        let text = "приветствие мира <b>поиск</b> документов в корпусе";
        let snippet = extract_fragments(text, MAX_FRAGMENTS);
        assert!(snippet.contains("<b>поиск</b>"));
    }
}
