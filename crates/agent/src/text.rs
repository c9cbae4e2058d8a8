//! Whole-word keyword matching shared by the extraction tables and EQ detection.

/// Case-insensitive match of `keyword` bounded by non-word characters or the text edges.
pub(crate) fn contains_word(text: &str, keyword: &str) -> bool {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return false;
    }
    let text = text.to_lowercase();

    text.match_indices(keyword.as_str()).any(|(start, found)| {
        let before = text[..start].chars().next_back();
        let after = text[start + found.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::contains_word;

    #[test]
    fn matches_whole_words_ignoring_case() {
        assert!(contains_word("I'm WORRIED about it", "worried"));
        assert!(contains_word("whole home, please", "whole home"));
        assert!(contains_word("worried!", "worried"));
        assert!(!contains_word("the unworried homeowner", "worried"));
        assert!(!contains_word("tvs", "tv"));
        assert!(!contains_word("anything", "  "));
    }
}
