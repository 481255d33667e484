//! Conversation title derivation (§4.9): strip code fences, markdown
//! markup, and URLs; collapse whitespace; cut to ≤150 chars, preferring
//! the first sentence of ≥8 chars.

use regex::Regex;
use std::sync::OnceLock;

const MAX_TITLE_LEN: usize = 150;
const MIN_SENTENCE_LEN: usize = 8;

fn code_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```.*?```").unwrap())
}

fn url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").unwrap())
}

fn markdown_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap())
}

fn markdown_markup() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[#*_`>~]").unwrap())
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Derive a conversation title from the user's prompt.
#[must_use]
pub fn derive_title(prompt: &str) -> String {
    let stripped = code_fence().replace_all(prompt, " ");
    let stripped = url().replace_all(&stripped, " ");
    let stripped = markdown_link().replace_all(&stripped, "$1");
    let stripped = markdown_markup().replace_all(&stripped, "");
    let collapsed = whitespace().replace_all(stripped.trim(), " ");
    let collapsed = collapsed.trim();

    let candidate = first_sentence(collapsed).unwrap_or(collapsed);
    truncate_at_char_boundary(candidate, MAX_TITLE_LEN)
}

fn first_sentence(text: &str) -> Option<&str> {
    let end = text.find(['.', '!', '?'])?;
    let sentence = text[..=end].trim();
    (sentence.len() >= MIN_SENTENCE_LEN).then_some(sentence)
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_code_fences() {
        let title = derive_title("explain this: ```fn main() {}``` please");
        assert!(!title.contains("fn main"));
    }

    #[test]
    fn strips_urls() {
        let title = derive_title("check out https://example.com/page for details");
        assert!(!title.contains("https://"));
    }

    #[test]
    fn strips_markdown_markup_and_resolves_links() {
        let title = derive_title("# Heading\nsee [the docs](https://example.com) for **bold** info");
        assert!(!title.contains('#'));
        assert!(!title.contains('*'));
        assert!(title.contains("the docs"));
    }

    #[test]
    fn collapses_whitespace() {
        let title = derive_title("hello    \n\n   world");
        assert_eq!(title, "hello world");
    }

    #[test]
    fn prefers_first_sentence_when_long_enough() {
        let title = derive_title("Summarize this document. It has many details that follow.");
        assert_eq!(title, "Summarize this document.");
    }

    #[test]
    fn falls_back_to_full_text_when_first_sentence_too_short() {
        let title = derive_title("Hi. What is the capital of France?");
        assert_eq!(title, "Hi. What is the capital of France?");
    }

    #[test]
    fn truncates_to_150_chars() {
        let long = "a".repeat(400);
        let title = derive_title(&long);
        assert_eq!(title.len(), MAX_TITLE_LEN);
    }
}
