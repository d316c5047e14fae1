//! Text handling around translation: chunking, language detection, word
//! counting and display formatting.

pub mod chunk;
pub mod detect;

pub use chunk::{Chunk, chunks, split};
pub use detect::{LanguageDetector, StopwordDetector};

use regex::Regex;
use std::sync::LazyLock;

// Sentence terminator, optional whitespace, then an upper-case letter
#[allow(clippy::expect_used)]
static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.?!])\s*(\p{Lu})").expect("sentence break pattern is valid"));

/// Whitespace-delimited token count, used for quota estimates
pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Insert a paragraph break after each sentence that is followed by a new
/// capitalised sentence.
pub fn format_paragraphs(text: &str) -> String {
    SENTENCE_BREAK.replace_all(text, "$1\n\n$2").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("  one two\nthree\t four "), 4);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_format_paragraphs() {
        assert_eq!(
            format_paragraphs("Bonjour le monde. Ceci est un test."),
            "Bonjour le monde.\n\nCeci est un test."
        );
        assert_eq!(format_paragraphs("Vraiment?Oui! Écoutez."), "Vraiment?\n\nOui!\n\nÉcoutez.");
    }

    #[test]
    fn test_format_paragraphs_leaves_lowercase_continuations() {
        assert_eq!(format_paragraphs("Version 2.5 est sortie. ok"), "Version 2.5 est sortie. ok");
    }
}
