//! Storage for match nodes, the pair memo and the cycle guard.
//!
//! Nodes are append-only. The memo maps a pair key (see
//! [`pair_key`](crate::fingerprint::pair_key)) to the node approved for it;
//! approving a key that already has an entry appends the new node to that
//! entry's tie chain instead of replacing it. Identity matches are cached per
//! sort rather than per key, since distinct sorts may share a display string.
//! Cycle sentinels are cached per key as well, so breaking the same cycle
//! again reuses its node.
//!
//! Node storage is never reclaimed piecemeal: [`MatchTable::purge`] only
//! forgets memo, identity and sentinel entries, leaving the nodes of a
//! rolled-back session unreachable but allocated. The table shrinks only on
//! [`MatchTable::clear`], which `Registry::cleanup` calls.

use super::{Match, MatchId};
use crate::arena::SortId;
use crate::config::RegistryConfig;
use crate::fingerprint::HashValue;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Cache and cycle counters of one registry.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchMetrics {
    /// Pairs served from the memo.
    pub memo_hits: u64,
    /// Pairs that had to be computed.
    pub memo_misses: u64,
    /// Nodes approved into the memo.
    pub computed: u64,
    /// Sentinels handed out for pairs already in progress.
    pub cycles_broken: u64,
    /// Nodes appended to a tie chain.
    pub alternatives_recorded: u64,
    /// Memo entries dropped by rollback.
    pub purged: u64,
}

impl MatchMetrics {
    pub fn record_hit(&mut self) {
        self.memo_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.memo_misses += 1;
    }

    pub fn record_computed(&mut self) {
        self.computed += 1;
    }

    pub fn record_cycle_broken(&mut self) {
        self.cycles_broken += 1;
    }

    pub fn record_alternative(&mut self) {
        self.alternatives_recorded += 1;
    }

    /// Hit ratio in `[0, 1]`; zero before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.memo_hits + self.memo_misses;
        if total == 0 {
            0.0
        } else {
            self.memo_hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct MatchTable {
    nodes: Vec<Match>,
    memo: HashMap<HashValue, MatchId>,
    identities: HashMap<SortId, MatchId>,
    in_progress: HashSet<HashValue>,
    sentinels: HashMap<HashValue, MatchId>,
    sentinel_nodes: HashSet<MatchId>,
    metrics: MatchMetrics,
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: MatchId) -> Option<&Match> {
        self.nodes.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.nodes.get_mut(id.index())
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of memoized pairs.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    pub fn metrics(&self) -> &MatchMetrics {
        &self.metrics
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut MatchMetrics {
        &mut self.metrics
    }

    pub(crate) fn push(&mut self, node: Match) -> MatchId {
        let id = MatchId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Memo lookup, counted as a hit or a miss.
    pub(crate) fn lookup(&mut self, key: &HashValue) -> Option<MatchId> {
        match self.memo.get(key) {
            Some(&id) => {
                self.metrics.record_hit();
                trace!(key = %key, id = %id, "memo hit");
                Some(id)
            }
            None => {
                self.metrics.record_miss();
                None
            }
        }
    }

    pub(crate) fn identity(&self, sort: SortId) -> Option<MatchId> {
        self.identities.get(&sort).copied()
    }

    pub(crate) fn set_identity(&mut self, sort: SortId, id: MatchId) {
        self.identities.insert(sort, id);
    }

    /// Sentinel already handed out for the in-progress pair `key`.
    pub(crate) fn sentinel(&self, key: &HashValue) -> Option<MatchId> {
        self.sentinels.get(key).copied()
    }

    pub(crate) fn set_sentinel(&mut self, key: HashValue, id: MatchId) {
        self.sentinels.insert(key, id);
        self.sentinel_nodes.insert(id);
    }

    /// Whether `id` stands for a pair whose computation was in progress.
    pub fn is_sentinel(&self, id: MatchId) -> bool {
        self.sentinel_nodes.contains(&id)
    }

    pub fn is_in_progress(&self, key: &HashValue) -> bool {
        self.in_progress.contains(key)
    }

    /// Marks `key` as being computed. Returns `false` if it already was.
    pub(crate) fn begin(&mut self, key: HashValue) -> bool {
        self.in_progress.insert(key)
    }

    pub(crate) fn finish(&mut self, key: &HashValue) {
        self.in_progress.remove(key);
    }

    /// Stores `id` as the result for `key`, or appends it to the tie chain
    /// of the existing entry. Returns the entry now answering `key`.
    pub(crate) fn approve(&mut self, key: HashValue, id: MatchId, config: &RegistryConfig) -> MatchId {
        let Some(&existing) = self.memo.get(&key) else {
            self.memo.insert(key, id);
            self.metrics.record_computed();
            return id;
        };
        if existing != id && config.keep_alternatives {
            self.append_alternative(existing, id, config.max_alternatives);
        }
        existing
    }

    /// Links `alternative` at the end of `head`'s tie chain, unless the chain
    /// is full or already holds it.
    pub(crate) fn append_alternative(&mut self, head: MatchId, alternative: MatchId, limit: usize) -> bool {
        let mut cursor = head;
        let mut length = 0;
        loop {
            if cursor == alternative {
                return false;
            }
            match self.get(cursor).and_then(|node| node.tied_with) {
                Some(next) if length < limit => {
                    cursor = next;
                    length += 1;
                }
                Some(_) => return false,
                None => break,
            }
        }
        if length >= limit {
            return false;
        }
        match self.get_mut(cursor) {
            Some(tail) => {
                tail.tied_with = Some(alternative);
                self.metrics.record_alternative();
                trace!(head = %head, alternative = %alternative, "tie recorded");
                true
            }
            None => false,
        }
    }

    /// Alternatives chained behind `head`, head excluded.
    pub fn alternatives(&self, head: MatchId) -> Vec<MatchId> {
        let mut out = Vec::new();
        let mut cursor = self.get(head).and_then(|node| node.tied_with);
        while let Some(id) = cursor {
            if id == head || out.contains(&id) {
                break;
            }
            out.push(id);
            cursor = self.get(id).and_then(|node| node.tied_with);
        }
        out
    }

    /// Drops memo, identity and sentinel entries mentioning any of `removed`.
    ///
    /// Returns the number of memo entries dropped.
    pub(crate) fn purge(&mut self, removed: &HashSet<SortId>) -> usize {
        let nodes = &self.nodes;
        let mentions = |id: &MatchId| {
            nodes
                .get(id.index())
                .map_or(true, |node| removed.contains(&node.lhs) || removed.contains(&node.rhs))
        };
        let before = self.memo.len();
        self.memo.retain(|_, id| !mentions(id));
        self.identities.retain(|sort, _| !removed.contains(sort));
        self.sentinels.retain(|_, id| !mentions(id));
        let purged = before - self.memo.len();
        self.metrics.purged += purged as u64;
        purged
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.memo.clear();
        self.identities.clear();
        self.in_progress.clear();
        self.sentinels.clear();
        self.sentinel_nodes.clear();
    }
}
