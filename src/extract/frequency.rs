//! Mode heuristic: the most frequent value in a collection.
//!
//! Ties resolve to the value encountered first, so results are reproducible
//! for identical input order.

use std::hash::Hash;

use indexmap::IndexMap;

/// Most frequent value, or `None` for an empty input.
pub fn most_common<T, I>(values: I) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    most_common_by(values, |v| v.clone())
}

/// Most frequent value where equality is decided by `key`.
///
/// Useful for types without `Eq`/`Hash`, such as `f32` (keyed by
/// `to_bits`). The returned value is the first one seen for the winning key.
pub fn most_common_by<T, K, I, F>(values: I, key: F) -> Option<T>
where
    K: Eq + Hash,
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> K,
{
    let mut counts: IndexMap<K, (T, usize)> = IndexMap::new();
    for value in values {
        counts
            .entry(key(&value))
            .and_modify(|(_, count)| *count += 1)
            .or_insert((value, 1));
    }

    let mut best: Option<(T, usize)> = None;
    for (_, (value, count)) in counts {
        match &best {
            Some((_, best_count)) if count <= *best_count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value)
}

/// Most frequent `f32`, compared bit-for-bit.
pub fn most_common_f32<I>(values: I) -> Option<f32>
where
    I: IntoIterator<Item = f32>,
{
    most_common_by(values, |v| v.to_bits())
}
