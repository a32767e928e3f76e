use crate::types::{CandidateArticle, HistoryStore};
use std::collections::HashSet;

/// Function words in Vietnamese and English, dropped before comparing
/// titles. Matching the remaining content words is what makes two headlines
/// about the same event look alike even when phrased differently.
const STOP_WORDS: &[&str] = &[
    "và", "của", "cho", "với", "trong", "là", "có", "được", "các", "một",
    "này", "đã", "sẽ", "về", "tại", "từ", "theo", "đến", "trên", "khi",
    "sau", "hay", "hoặc", "vào", "ra", "đi", "lên", "xuống", "bị", "do",
    "the", "a", "an", "in", "of", "to", "is", "are", "at", "by", "for",
];

/// Lowercase, strip punctuation, split on whitespace, drop stop words.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Jaccard similarity of two token sets, 0 when either set is empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Remove candidates already delivered: exact URL match against the history,
/// or a title whose token set is at least `threshold`-similar to any
/// historical title. Any-hit matching is deliberately conservative; sending
/// a duplicate is worse than dropping a fresh phrasing of an old story.
///
/// Pure function of its inputs, O(candidates × history).
pub fn filter_new(
    candidates: Vec<CandidateArticle>,
    history: &HistoryStore,
    threshold: f64,
) -> (Vec<CandidateArticle>, usize) {
    let sent_urls: HashSet<&str> = history
        .entries
        .iter()
        .filter(|e| !e.url.is_empty())
        .map(|e| e.url.as_str())
        .collect();

    let sent_tokens: Vec<HashSet<String>> = history
        .entries
        .iter()
        .filter(|e| !e.title.is_empty())
        .map(|e| tokenize(&e.title))
        .collect();

    let mut kept = Vec::new();
    let mut removed = 0usize;

    for candidate in candidates {
        if !candidate.url.is_empty() && sent_urls.contains(candidate.url.as_str()) {
            removed += 1;
            continue;
        }

        let tokens = tokenize(&candidate.title);
        let is_dup = sent_tokens
            .iter()
            .any(|sent| jaccard(&tokens, sent) >= threshold);
        if is_dup {
            removed += 1;
            continue;
        }

        kept.push(candidate);
    }

    (kept, removed)
}
