//! Source-language guessing for providers that need an explicit source.
//!
//! The built-in detector is a stopword/diacritic heuristic. It is expected to
//! misclassify short or mixed-language samples.

use crate::config::Lang;

/// Number of leading characters inspected
pub const SAMPLE_CHARS: usize = 1000;

pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Lang;
}

struct Profile {
    code: &'static str,
    stopwords: &'static [&'static str],
    diacritics: fn(char) -> bool,
}

const fn no_diacritics(_: char) -> bool {
    false
}

fn is_cyrillic(c: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&c)
}

// Declaration order is the tie-break order.
const PROFILES: &[Profile] = &[
    Profile {
        code: "EN",
        stopwords: &[
            "the", "and", "is", "of", "to", "in", "that", "it", "with", "for", "this", "are",
            "was", "on", "be", "as", "by", "not", "have", "you",
        ],
        diacritics: no_diacritics,
    },
    Profile {
        code: "FR",
        stopwords: &[
            "le", "la", "les", "et", "est", "des", "une", "un", "du", "que", "qui", "dans",
            "pour", "pas", "sur", "avec", "ce", "il", "au", "sont",
        ],
        diacritics: |c| "éèêëàâçùûôîïœ".contains(c),
    },
    Profile {
        code: "ES",
        stopwords: &[
            "el", "los", "las", "y", "es", "que", "en", "una", "por", "con", "para", "del",
            "se", "no", "al", "lo", "como", "pero", "muy", "está",
        ],
        diacritics: |c| "ñáíóú¿¡".contains(c),
    },
    Profile {
        code: "DE",
        stopwords: &[
            "der", "die", "das", "und", "ist", "nicht", "ein", "eine", "zu", "den", "mit",
            "von", "sich", "auf", "für", "dem", "auch", "es", "im", "sind",
        ],
        diacritics: |c| "äöüß".contains(c),
    },
    Profile {
        code: "IT",
        stopwords: &[
            "il", "di", "che", "per", "non", "sono", "del", "della", "gli", "nel", "anche",
            "come", "ma", "si", "questo", "ho", "è", "alla", "degli", "lei",
        ],
        diacritics: |c| "àèìòù".contains(c),
    },
    Profile {
        code: "PT-PT",
        stopwords: &[
            "o", "os", "em", "um", "uma", "para", "com", "não", "mais", "do", "da", "no",
            "na", "ao", "dos", "das", "também", "foi", "são", "muito",
        ],
        diacritics: |c| "ãõâêôç".contains(c),
    },
    Profile {
        code: "RU",
        stopwords: &[
            "и", "в", "не", "на", "что", "он", "с", "как", "это", "по", "но", "к", "у", "из",
            "за", "то", "же", "от", "все", "так",
        ],
        diacritics: is_cyrillic,
    },
    Profile {
        code: "TR",
        stopwords: &[
            "ve", "bir", "bu", "için", "ile", "çok", "ne", "gibi", "daha", "olarak", "ama",
            "var", "ben", "mi", "değil", "kadar", "sonra", "şey", "her", "olan",
        ],
        diacritics: |c| "ğışçöü".contains(c),
    },
];

/// Stopword (+2 per hit) and diacritic (+1 per character) scoring
#[derive(Debug, Default, Clone, Copy)]
pub struct StopwordDetector;

impl StopwordDetector {
    /// Score of every known language for `text`, in declaration order
    pub fn scores(text: &str) -> Vec<(&'static str, usize)> {
        let sample: String = text.chars().take(SAMPLE_CHARS).collect::<String>().to_lowercase();
        let tokens: Vec<&str> = sample
            .split(|c: char| !c.is_alphabetic())
            .filter(|t| !t.is_empty())
            .collect();

        PROFILES
            .iter()
            .map(|profile| {
                let stopword_hits = tokens
                    .iter()
                    .filter(|t| profile.stopwords.contains(t))
                    .count();
                let diacritic_hits = sample.chars().filter(|&c| (profile.diacritics)(c)).count();
                (profile.code, stopword_hits * 2 + diacritic_hits)
            })
            .collect()
    }
}

impl LanguageDetector for StopwordDetector {
    fn detect(&self, text: &str) -> Lang {
        let mut best = ("EN", 0);
        for (code, score) in Self::scores(text) {
            // Strictly greater keeps the first-declared language on ties
            if score > best.1 {
                best = (code, score);
            }
        }
        Lang::new(best.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> String {
        StopwordDetector.detect(text).0
    }

    #[test]
    fn test_detects_common_languages() {
        assert_eq!(detect("The cat is on the table and it is sleeping."), "EN");
        assert_eq!(detect("Le chat est sur la table et il dort dans le salon."), "FR");
        assert_eq!(detect("El perro está en la casa y no quiere salir con los niños."), "ES");
        assert_eq!(detect("Der Hund ist nicht im Garten, und die Katze schläft auf dem Sofa."), "DE");
        assert_eq!(detect("Это не так, но он все же пришел на работу."), "RU");
    }

    #[test]
    fn test_empty_sample_uses_first_declared() {
        assert_eq!(detect(""), "EN");
        assert_eq!(detect("12345 !!!"), "EN");
    }

    #[test]
    fn test_only_prefix_is_sampled() {
        let text = format!("{}{}", "x ".repeat(SAMPLE_CHARS), "le la les et est des une");
        assert_eq!(detect(&text), "EN");
    }

    #[test]
    fn test_detection_is_deterministic() {
        let text = "la de que";
        assert_eq!(detect(text), detect(text));
    }
}
