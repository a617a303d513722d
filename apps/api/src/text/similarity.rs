//! Token-set similarity used to decide when two role headers or two bullets
//! describe the same thing.

use std::collections::HashSet;

use super::normalize::normalize_key;

/// Below this many distinct tokens a bullet is too short for fuzzy comparison.
const MIN_BULLET_TOKENS: usize = 5;

pub fn token_set(s: &str) -> HashSet<String> {
    normalize_key(s)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// |A ∩ B| / |A ∪ B|; zero when either side is empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    inter as f64 / (a.len() + b.len() - inter) as f64
}

pub fn text_jaccard(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}

/// Two bullets are near-duplicates when they normalize to the same text, or when
/// both have at least five tokens and their token Jaccard reaches `threshold`.
pub fn bullets_near_duplicate(a: &str, b: &str, threshold: f64) -> bool {
    let na = normalize_key(a);
    let nb = normalize_key(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na == nb {
        return true;
    }
    let ta = token_set(&na);
    let tb = token_set(&nb);
    if ta.len() < MIN_BULLET_TOKENS || tb.len() < MIN_BULLET_TOKENS {
        return false;
    }
    jaccard(&ta, &tb) >= threshold
}
