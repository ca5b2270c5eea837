//! Small reducers used by the statistics pass: a frequency counter with a stable
//! most-common ranking.

use ahash::AHashMap;
use std::hash::Hash;

/// Frequency counter. Ties in `most_common` keep first-seen order.
#[derive(Debug, Clone)]
pub struct TopCounter<K: Eq + Hash> {
    counts: AHashMap<K, (u64, usize)>, // key -> (count, first-seen rank)
    next_rank: usize,
}

impl<K: Eq + Hash> Default for TopCounter<K> {
    fn default() -> Self {
        Self { counts: AHashMap::new(), next_rank: 0 }
    }
}

impl<K: Eq + Hash + Clone> TopCounter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K) {
        self.add_n(key, 1);
    }

    pub fn add_n(&mut self, key: K, n: u64) {
        let rank = self.next_rank;
        let entry = self.counts.entry(key).or_insert_with(|| (0, rank));
        if entry.1 == rank {
            self.next_rank += 1;
        }
        entry.0 += n;
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().map(|(c, _)| *c).sum()
    }

    /// All keys in first-seen order with their counts.
    pub fn in_insertion_order(&self) -> Vec<(K, u64)> {
        let mut v: Vec<_> = self.counts.iter().map(|(k, (c, r))| (k.clone(), *c, *r)).collect();
        v.sort_by_key(|(_, _, r)| *r);
        v.into_iter().map(|(k, c, _)| (k, c)).collect()
    }

    /// The `n` most frequent keys, highest count first.
    pub fn most_common(&self, n: usize) -> Vec<(K, u64)> {
        let mut v: Vec<_> = self.counts.iter().map(|(k, (c, r))| (k.clone(), *c, *r)).collect();
        v.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        v.truncate(n);
        v.into_iter().map(|(k, c, _)| (k, c)).collect()
    }
}
