//! Keyword normalization and keyword-set similarity
//!
//! Cleaning is deterministic and idempotent, so cleaned lists can be stored
//! as-is and compared later without re-normalizing.

use std::collections::HashSet;

/// Default similarity threshold for treating two keyword sets as one topic
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

const MIN_KEYWORD_CHARS: usize = 2;
const MAX_KEYWORD_CHARS: usize = 29;

/// Instruction fragments a summarization model sometimes echoes back
const BOILERPLATE_PHRASES: &[&str] = &[
    "the most important keywords",
    "most important keywords",
    "separated by commas",
    "comma-separated",
    "comma separated",
    "here are the keywords",
    "here are some keywords",
    "list of keywords",
    "return only",
    "no other text",
    "keywords extracted",
    "mots-clés",
];

const PATH_SEPARATORS: &[char] = &[':', '/', '\\'];

fn is_boilerplate(lowered: &str) -> bool {
    BOILERPLATE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

fn is_acceptable(lowered: &str) -> bool {
    let len = lowered.chars().count();
    (MIN_KEYWORD_CHARS..=MAX_KEYWORD_CHARS).contains(&len)
        && !lowered.contains(PATH_SEPARATORS)
        && !is_boilerplate(lowered)
}

/// Normalize a keyword list: trim, lowercase, drop noise, dedupe in order.
pub fn clean_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut cleaned = Vec::new();

    for keyword in keywords {
        let lowered = keyword.as_ref().trim().to_lowercase();
        if is_acceptable(&lowered) && seen.insert(lowered.clone()) {
            cleaned.push(lowered);
        }
    }

    cleaned
}

/// Same as [`clean_keywords`] for a comma-joined string
pub fn clean_keyword_string(joined: &str) -> Vec<String> {
    clean_keywords(joined.split(','))
}

/// Cleaning without the length bound: paths and boilerplate never match,
/// single characters do
fn normalized_set<S: AsRef<str>>(keywords: &[S]) -> HashSet<String> {
    keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty() && !k.contains(PATH_SEPARATORS) && !is_boilerplate(k))
        .collect()
}

/// `|a ∩ b| / max(|a|, |b|)` over case-folded sets; 0 when both are empty.
///
/// Entries with path separators or echoed instructions are dropped first.
pub fn similarity<A, B>(existing: &[A], candidate: &[B]) -> f64
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let existing = normalized_set(existing);
    let candidate = normalized_set(candidate);

    let denominator = existing.len().max(candidate.len());
    if denominator == 0 {
        return 0.0;
    }

    let common = existing.intersection(&candidate).count();
    common as f64 / denominator as f64
}

pub fn is_similar_with_threshold<A, B>(existing: &[A], candidate: &[B], threshold: f64) -> bool
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let score = similarity(existing, candidate);
    score > 0.0 && score >= threshold
}

pub fn is_similar<A, B>(existing: &[A], candidate: &[B]) -> bool
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    is_similar_with_threshold(existing, candidate, SIMILARITY_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_lowercases_and_dedupes_in_order() {
        let cleaned = clean_keywords(["Rust", "tokio", "rust", " Async "]);
        assert_eq!(cleaned, vec!["rust", "tokio", "async"]);
    }

    #[test]
    fn test_clean_drops_boilerplate_and_paths() {
        let cleaned = clean_keywords([
            "Here are the most important keywords",
            "separated by commas",
            "src/main.rs",
            "C:\\Users",
            "note: this",
            "memory",
        ]);
        assert_eq!(cleaned, vec!["memory"]);
    }

    #[test]
    fn test_clean_length_bounds() {
        let long = "x".repeat(30);
        let just_fits = "y".repeat(29);
        let cleaned = clean_keywords(["a", "ab", long.as_str(), just_fits.as_str()]);
        assert_eq!(cleaned, vec!["ab".to_string(), just_fits]);
    }

    #[test]
    fn test_clean_keyword_string_splits_on_commas() {
        let cleaned = clean_keyword_string("Dogs, cats,, , Birds");
        assert_eq!(cleaned, vec!["dogs", "cats", "birds"]);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let inputs: Vec<Vec<&str>> = vec![
            vec!["Rust", "RUST", "borrow checker", "a", "x/y"],
            vec!["  Spaces  ", "Ünïcödé", "ÉCOLE", "école"],
            vec!["separated by commas", "Keywords", "keywords"],
            vec![],
        ];

        for input in inputs {
            let once = clean_keywords(&input);
            let twice = clean_keywords(&once);
            assert_eq!(once, twice, "input {:?}", input);
        }
    }

    #[test]
    fn test_similarity_threshold_boundary() {
        assert!(is_similar(&["a", "b", "c"], &["a", "x", "y"]));
        assert!(!is_similar(&["a", "b", "c"], &["x", "y", "z", "w"]));
        assert!(!is_similar(&["a", "b", "c", "d"], &["a", "x", "y", "z"]));
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let pairs: Vec<(Vec<&str>, Vec<&str>)> = vec![
            (vec!["dog", "blue"], vec!["dog", "chien"]),
            (vec!["dog", "blue", "sky", "sea"], vec!["dog"]),
            (vec!["Rust"], vec!["rust", "go", "zig", "c++"]),
            (vec![], vec!["alone"]),
        ];

        for (a, b) in pairs {
            assert_eq!(is_similar(&a, &b), is_similar(&b, &a));
            assert_eq!(similarity(&a, &b), similarity(&b, &a));
        }
    }

    #[test]
    fn test_empty_sets_are_not_similar() {
        let empty: [&str; 0] = [];
        assert_eq!(similarity(&empty, &empty), 0.0);
        assert!(!is_similar_with_threshold(&empty, &empty, 0.0));
    }

    #[test]
    fn test_paths_and_boilerplate_never_match() {
        let noise = ["src/main.rs", "separated by commas"];
        assert_eq!(similarity(&noise, &noise), 0.0);
        assert!(!is_similar(&noise, &noise));

        assert_eq!(similarity(&["src/main.rs", "rust"], &["rust", "C:\\temp"]), 1.0);
    }

    #[test]
    fn test_similarity_ignores_case() {
        assert_eq!(similarity(&["Dog", "Blue"], &["dog ", "chien"]), 0.5);
        assert_eq!(similarity(&["dog", "dog", "blue"], &["DOG"]), 0.5);
    }
}
