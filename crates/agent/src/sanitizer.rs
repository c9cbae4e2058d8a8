//! Cleanup for generated assistant text before it reaches the user.

use once_cell::sync::Lazy;
use regex::Regex;

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("sanitizer patterns are valid regexes")
}

static LEADING_ROLE: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)(^|[\n\r])\s*(?:assistant|user)\s*[:\-–—]\s*"));
static INLINE_ROLE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\bassistant\s*:\s*"));
static DASHES: Lazy<Regex> = Lazy::new(|| pattern(r"[–—]"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| pattern(r"\s{2,}"));

static INLINE_OPTIONS: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)\s*\((?:options?|choices?)\s*:[^)]*\)"));
static PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    pattern(
        r"(?i)^\s*(?:[-*•]\s*)?(?:available options|options|choices|choose from|select from|pick from)\s*:\s*",
    )
});
static BULLET: Lazy<Regex> = Lazy::new(|| pattern(r"^\s*(?:[-*•]|\d+[.)])\s*"));
static DELIMITER: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^(?:\s*(?:\||,|/|;|\bor\b|\band\b)\s*)+"));
static TERMINATOR: Lazy<Regex> = Lazy::new(|| pattern(r"^\s*[.?!:;]"));
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| pattern(r"[.?!]"));
static ONLY_JOINERS: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)^(?:[\s|,/;.:!?\-]|\bor\b|\band\b)*$"));

/// Strips role prefixes, turns en/em dashes into spaces and collapses whitespace runs.
pub fn sanitize_assistant(text: &str) -> String {
    let text = LEADING_ROLE.replace_all(text, "${1}");
    let text = INLINE_ROLE.replace_all(&text, "");
    let text = DASHES.replace_all(&text, " ");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_owned()
}

/// Removes option listings the client renders on its own. Prose that merely mentions
/// an option is kept.
pub fn strip_option_phrases(text: &str, options: &[String]) -> String {
    let mut options: Vec<&str> =
        options.iter().map(|option| option.trim()).filter(|option| !option.is_empty()).collect();
    options.sort_by_key(|option| std::cmp::Reverse(option.len()));

    let without_inline = INLINE_OPTIONS.replace_all(text, "");
    let mut kept: Vec<String> = Vec::new();
    for line in without_inline.lines() {
        if let Some(label) = PREAMBLE.find(line) {
            let remainder = after_enumeration(&line[label.end()..], &options);
            if !remainder.is_empty() {
                kept.push(remainder);
            }
            continue;
        }
        if reproduces_one_option(line, &options) || enumerates_all_options(line, &options) {
            continue;
        }
        kept.push(line.to_owned());
    }

    let mut joined = kept.join("\n");
    for option in &options {
        let fragment = pattern(&format!(r"(?i)\s*\|\s*{}", regex::escape(option)));
        joined = fragment.replace_all(&joined, "").into_owned();
    }
    collapse_blank_lines(&joined)
}

/// Text left after an option enumeration and its terminator.
fn after_enumeration(rest: &str, options: &[&str]) -> String {
    if options.is_empty() {
        return match SENTENCE_END.find(rest) {
            Some(end) => rest[end.end()..].trim().to_owned(),
            None => String::new(),
        };
    }

    let mut cursor = rest;
    loop {
        let candidate = match DELIMITER.find(cursor) {
            Some(delimiter) => &cursor[delimiter.end()..],
            None => cursor,
        };
        match leading_option(candidate, options) {
            Some(length) => cursor = &candidate[length..],
            None => break,
        }
    }
    if let Some(terminator) = TERMINATOR.find(cursor) {
        cursor = &cursor[terminator.end()..];
    }
    cursor.trim().to_owned()
}

/// Byte length of the longest option that opens `text` and ends on a word boundary.
fn leading_option(text: &str, options: &[&str]) -> Option<usize> {
    options.iter().find_map(|option| {
        let head = text.get(..option.len())?;
        let boundary = !text[option.len()..].chars().next().is_some_and(char::is_alphanumeric);
        (head.eq_ignore_ascii_case(option) && boundary).then_some(option.len())
    })
}

fn bare_line(line: &str) -> String {
    BULLET
        .replace(line, "")
        .trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .to_lowercase()
}

fn reproduces_one_option(line: &str, options: &[&str]) -> bool {
    let bare = bare_line(line);
    !bare.is_empty()
        && options.iter().any(|option| {
            option.trim_matches(|c: char| c.is_ascii_punctuation()).to_lowercase() == bare
        })
}

fn enumerates_all_options(line: &str, options: &[&str]) -> bool {
    if options.len() < 2 {
        return false;
    }
    let mut remainder = BULLET.replace(line, "").to_lowercase();
    for option in options {
        let needle = option.to_lowercase();
        match remainder.find(&needle) {
            Some(start) => remainder.replace_range(start..start + needle.len(), " "),
            None => return false,
        }
    }
    ONLY_JOINERS.is_match(&remainder)
}

fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() && lines.last().is_some_and(|last| last.trim().is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::{sanitize_assistant, strip_option_phrases};

    fn options(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn role_prefixes_and_dashes_are_removed() {
        assert_eq!(
            sanitize_assistant("Assistant: Lovely choice — what is your budget?"),
            "Lovely choice what is your budget?"
        );
        assert_eq!(sanitize_assistant("user - hi\nassistant: hello"), "hi\nhello");
        assert_eq!(sanitize_assistant("  Great   pick.  "), "Great pick.");
    }

    #[test]
    fn inline_option_annotations_are_removed() {
        let text = "Which finish do you like? (Options: Matte | Satin | Gloss)";
        assert_eq!(
            strip_option_phrases(text, &options(&["Matte", "Satin", "Gloss"])),
            "Which finish do you like?"
        );
        assert_eq!(strip_option_phrases("Pick one (choices: a, b)", &[]), "Pick one");
    }

    #[test]
    fn preamble_enumeration_is_dropped_and_question_kept() {
        let text = "Options: A | B | C. Do you prefer A?";
        assert_eq!(strip_option_phrases(text, &options(&["A", "B", "C"])), "Do you prefer A?");
    }

    #[test]
    fn preamble_line_without_remainder_is_dropped() {
        let text = "What type of home is it?\nChoose from: Home, Apartment, or Villa/Farmhouse";
        assert_eq!(
            strip_option_phrases(text, &options(&["Home", "Apartment", "Villa/Farmhouse"])),
            "What type of home is it?"
        );
    }

    #[test]
    fn bulleted_option_lines_are_dropped() {
        let text = "Which roof do you have?\n\n- RCC flat roof\n- Sloped tile roof\n\n\nThanks!";
        assert_eq!(
            strip_option_phrases(text, &options(&["RCC flat roof", "Sloped tile roof"])),
            "Which roof do you have?\n\nThanks!"
        );
    }

    #[test]
    fn full_enumeration_line_is_dropped() {
        let text = "Lovely!\nOn-grid, Hybrid or Off-grid\nWhich suits you?";
        assert_eq!(
            strip_option_phrases(text, &options(&["On-grid", "Hybrid", "Off-grid"])),
            "Lovely!\nWhich suits you?"
        );
    }

    #[test]
    fn prose_mentioning_one_option_is_preserved() {
        let text = "A Hybrid system keeps lights on during outages. Which type suits you?";
        assert_eq!(
            strip_option_phrases(text, &options(&["On-grid", "Hybrid", "Off-grid"])),
            text
        );
    }

    #[test]
    fn trailing_pipe_fragments_are_scrubbed() {
        let text = "Do you prefer Matte | Satin | Gloss?";
        assert_eq!(
            strip_option_phrases(text, &options(&["Matte", "Satin", "Gloss"])),
            "Do you prefer Matte?"
        );
    }
}
