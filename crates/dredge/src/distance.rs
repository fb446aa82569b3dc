//! Edit distance for "did you mean" suggestions.

/// Levenshtein distance between two strings, counted over characters.
///
/// Standard dynamic-programming formulation (insert, delete, substitute, unit
/// cost) with a two-row table. Suggestions shown to users hinge on this being
/// exact, so no cheaper approximation is acceptable here.
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// The candidate from `choices` closest to `target`, with its distance.
pub fn closest<'a>(target: &str, choices: &[&'a str]) -> Option<(&'a str, usize)> {
    choices
        .iter()
        .map(|c| (*c, levenshtein(target, c)))
        .min_by_key(|(_, d)| *d)
}
