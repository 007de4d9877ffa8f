//! Text tokenizer for search operations
//!
//! Pipeline: UAX#29 word boundaries → remove non-alphanumeric → lowercase.
//!
//! Deliberately no stopword filtering and no stemming: the index stores
//! exact token positions and phrase matching compares them one by one, so
//! every token of the input must survive with its position intact. The
//! pipeline is idempotent on its own output.

use unicode_segmentation::UnicodeSegmentation;

/// Tokenize text into searchable terms.
///
/// # Example
///
/// ```
/// use maildex_engine::search::tokenizer::tokenize;
///
/// let tokens = tokenize("Re: the U.S.A. launch!");
/// assert_eq!(tokens, vec!["re", "the", "usa", "launch"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .map(|w| w.to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// True when the query is completely wrapped in double quotes, which
/// switches a multi-term search into strict-phrase mode.
pub fn is_quoted_query(query: &str) -> bool {
    let q = query.trim();
    q.len() >= 2 && q.starts_with('"') && q.ends_with('"')
}
