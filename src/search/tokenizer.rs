//! Search tokenizer shared by indexing and querying
//!
//! Maximal runs of ASCII letters, digits and apostrophes, lowercased, with a
//! minimal English stopword set removed. No stemming.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"[A-Za-z0-9']+").unwrap();
    static ref STOPWORDS: HashSet<&'static str> = [
        "a", "an", "the", "and", "or", "but", "if", "then", "else", "of", "in", "on", "for",
        "to", "with", "by", "from", "at", "as", "is", "are", "was", "were", "be", "been",
        "being",
    ]
    .into_iter()
    .collect();
}

/// Tokenize text into search terms
///
/// # Examples
/// ```
/// use vitalis::search::tokenize;
/// assert_eq!(tokenize("The leash's STRAP"), vec!["leash's", "strap"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|token| !STOPWORDS.contains(token.as_str()))
        .collect()
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("The quick brown fox, with a THE leash's!");

        assert!(!tokens.contains(&"the".to_string()));
        assert!(tokens.contains(&"leash's".to_string()));
        assert_eq!(tokens, vec!["quick", "brown", "fox", "leash's"]);
    }

    #[test]
    fn test_tokenize_is_idempotent() {
        let text = "Vitamin-E supplements (400 IU) REDUCE hot flashes; doctor's advice?";
        let first = tokenize(text);
        let second = tokenize(&first.join(" "));

        assert_eq!(first, second);
        assert_eq!(first, tokenize(text));
    }

    #[test]
    fn test_tokenize_empty_and_symbols() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ?!  -- ... ").is_empty());
        assert!(tokenize("the and of").is_empty());
    }

    #[test]
    fn test_non_ascii_splits_tokens() {
        assert_eq!(tokenize("café au lait"), vec!["caf", "au", "lait"]);
    }

    #[test]
    fn test_stopwords() {
        assert!(is_stopword("with"));
        assert!(!is_stopword("how"));
    }
}
