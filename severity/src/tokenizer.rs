//! Unigram and bigram tokenization of body text.

/// Separator joining the two words of a bigram.
pub const BIGRAM_SEPARATOR: char = '_';

#[inline(always)]
const fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits lower-cased text into words on runs of non-word characters.
pub fn unigrams(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c| !is_word_char(c))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokenizes body text.
///
/// The stream holds every unigram in text order followed by every bigram of
/// adjacent unigrams. An empty body yields an empty stream.
///
/// # Examples
///
/// ```
/// let tokens = severity::tokenize("The cat sat");
/// assert_eq!(vec!["the", "cat", "sat", "the_cat", "cat_sat"], tokens);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = unigrams(text);
    if tokens.is_empty() {
        log::warn!("Empty document");
        return tokens;
    }
    let n = tokens.len();
    tokens.reserve(n - 1);
    for i in 1..n {
        let bigram = format!("{}{}{}", tokens[i - 1], BIGRAM_SEPARATOR, tokens[i]);
        tokens.push(bigram);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_bigrams_follow_unigrams() {
        assert_eq!(
            vec!["the", "cat", "sat", "the_cat", "cat_sat"],
            tokenize("the cat sat"),
        );
    }

    #[test]
    fn test_tokenize_lowercase_and_punctuation() {
        assert_eq!(
            vec!["bp", "120", "80", "bp_120", "120_80"],
            tokenize("  BP: 120/80.\n"),
        );
    }

    #[test]
    fn test_tokenize_single_word() {
        assert_eq!(vec!["pain"], tokenize("Pain!"));
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" -- \n ").is_empty());
    }

    #[test]
    fn test_unigrams_non_ascii_is_separator() {
        assert_eq!(vec!["caf", "ol"], unigrams("café olé"));
    }

    #[test]
    fn test_unigrams_keep_underscore() {
        assert_eq!(vec!["snake_case", "x"], unigrams("snake_case+x"));
    }
}
