//! Standard competition ranking ("1-2-2-4")
//!
//! Entries are sorted descending by their rank key and ascending by a
//! tiebreak. The tiebreak only fixes the order in which equal-key entries are
//! listed; it never splits a rank. An entry shares the previous entry's rank
//! iff the two keys are exactly equal, otherwise its rank is its 1-based
//! position in the sorted sequence.

use std::collections::HashMap;
use std::hash::Hash;

/// An entity with its assigned rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry<I> {
    pub id: I,
    /// Competition rank, shared by equal keys
    pub rank: u32,
    /// 1-based ordinal in sorted order, unique per entry
    pub position: u32,
}

/// Rank `(id, key, tiebreak)` triples
pub fn competition_rank<I, K, T>(mut entries: Vec<(I, K, T)>) -> Vec<RankedEntry<I>>
where
    K: Ord,
    T: Ord,
{
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)));

    let mut ranks: Vec<u32> = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let position = index as u32 + 1;
        let rank = match index.checked_sub(1) {
            Some(prev) if entries[prev].1 == entry.1 => ranks[prev],
            _ => position,
        };
        ranks.push(rank);
    }

    entries
        .into_iter()
        .zip(ranks)
        .enumerate()
        .map(|(index, ((id, _, _), rank))| RankedEntry { id, rank, position: index as u32 + 1 })
        .collect()
}

/// Collapse ranked entries into an `id -> rank` lookup
pub fn rank_map<I>(ranked: &[RankedEntry<I>]) -> HashMap<I, u32>
where
    I: Eq + Hash + Clone,
{
    ranked.iter().map(|entry| (entry.id.clone(), entry.rank)).collect()
}
