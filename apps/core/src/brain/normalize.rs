//! Query text normalization.
//!
//! Lower-cases, strips diacritics and punctuation, and collapses whitespace so
//! token rules can be written once in plain ASCII for Portuguese and English.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalizes free text for token matching.
///
/// `"Quais moradores estão INSATISFEITOS?"` becomes
/// `"quais moradores estao insatisfeitos"`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a name for substring checks against generated text.
pub fn fold_name(name: &str) -> String {
    normalize(name)
}
