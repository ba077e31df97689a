use strsim::normalized_levenshtein;
use unicode_segmentation::UnicodeSegmentation;

/// Word-order-tolerant similarity between two names, scored 0–100.
///
/// Both inputs are lower-cased and segmented into unicode words (which drops
/// punctuation and keeps numbers), the tokens are sorted and rejoined, and
/// the two sorted forms are compared by normalized Levenshtein distance.
///
/// Symmetric in its arguments; identical strings score 100; strings sharing
/// no tokens score near zero.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let a_sorted = sorted_tokens(a);
    let b_sorted = sorted_tokens(b);
    (normalized_levenshtein(&a_sorted, &b_sorted) * 100.0).round() as u8
}

fn sorted_tokens(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut tokens: Vec<&str> = lowered.unicode_words().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}
