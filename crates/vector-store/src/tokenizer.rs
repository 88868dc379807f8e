use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]+").expect("non-word pattern is valid"));

/// Lowercased words of `text`, split on anything outside `[a-z0-9_]`.
#[must_use]
pub fn words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    NON_WORD
        .replace_all(&lower, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Token stream used for vocabulary and term frequency: every word followed by the
/// adjacent-word bigrams (`a_b`) in order.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let words = words(text);
    let mut tokens = Vec::with_capacity(words.len() * 2);
    tokens.extend(words.iter().cloned());
    tokens.extend(words.windows(2).map(|pair| format!("{}_{}", pair[0], pair[1])));
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn splits_code_into_words_and_bigrams() {
        assert_eq!(
            tokenize("function login(user, pass)"),
            vec![
                "function",
                "login",
                "user",
                "pass",
                "function_login",
                "login_user",
                "user_pass",
            ]
        );
    }

    #[test]
    fn keeps_underscores_and_digits() {
        assert_eq!(words("MAX_RETRIES = v2.retry_count"), vec!["max_retries", "v2", "retry_count"]);
    }

    #[test]
    fn empty_and_punctuation_only_inputs_have_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("{}();=>").is_empty());
        assert_eq!(tokenize("single"), vec!["single"]);
    }

    proptest! {
        #[test]
        fn token_count_is_words_plus_bigrams(text in "[a-zA-Z0-9 _(){}.,;]{0,80}") {
            let word_count = words(&text).len();
            let tokens = tokenize(&text);
            prop_assert_eq!(tokens.len(), word_count + word_count.saturating_sub(1));
            for token in tokens {
                prop_assert!(token
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
            }
        }
    }
}
