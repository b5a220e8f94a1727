//! Symmetric peering blacklist.
//!
//! A [`PeerPair`] always stores its two names in sorted order, so `(a, b)` and
//! `(b, a)` are the same entry and one insert or remove covers both directions.

use crate::error::StoreError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

/// Unordered pair of distinct node names that must not peer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "(String, String)", into = "(String, String)")]
pub struct PeerPair {
    low: String,
    high: String,
}

impl PeerPair {
    /// Create a pair; the order of `a` and `b` does not matter.
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Result<Self, StoreError> {
        let (a, b) = (a.into(), b.into());
        if a == b {
            return Err(StoreError::Invalid(format!(
                "node '{}' cannot be blacklisted against itself",
                a
            )));
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { low, high })
    }

    /// Both names, smaller first
    pub fn names(&self) -> (&str, &str) {
        (&self.low, &self.high)
    }

    /// Check whether `name` is one side of the pair
    pub fn mentions(&self, name: &str) -> bool {
        self.low == name || self.high == name
    }

    /// The partner of `name`, if `name` is one side of the pair
    pub fn other(&self, name: &str) -> Option<&str> {
        if self.low == name {
            Some(&self.high)
        } else if self.high == name {
            Some(&self.low)
        } else {
            None
        }
    }
}

impl TryFrom<(String, String)> for PeerPair {
    type Error = StoreError;

    fn try_from((a, b): (String, String)) -> Result<Self, Self::Error> {
        Self::new(a, b)
    }
}

impl From<PeerPair> for (String, String) {
    fn from(pair: PeerPair) -> Self {
        (pair.low, pair.high)
    }
}

impl fmt::Display for PeerPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.low, self.high)
    }
}

/// Set of blacklisted peerings, iterated in sorted order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PeerBlacklist {
    pairs: BTreeSet<PeerPair>,
}

/// Entries pairing a node with itself are dropped with a warning instead of
/// failing the whole document.
impl<'de> Deserialize<'de> for PeerBlacklist {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<(String, String)>::deserialize(deserializer)?;
        let mut pairs = BTreeSet::new();
        for (a, b) in raw {
            match PeerPair::new(a, b) {
                Ok(pair) => {
                    pairs.insert(pair);
                }
                Err(e) => warn!("Dropping blacklist entry: {}", e),
            }
        }
        Ok(Self { pairs })
    }
}

impl PeerBlacklist {
    /// Create an empty blacklist
    pub fn new() -> Self {
        Self::default()
    }

    /// Forbid peering between `a` and `b`.
    ///
    /// Returns `false` if the pair was already present.
    pub fn add(&mut self, a: &str, b: &str) -> Result<bool, StoreError> {
        Ok(self.pairs.insert(PeerPair::new(a, b)?))
    }

    /// Lift the restriction between `a` and `b`.
    ///
    /// Returns `false` when there was nothing to remove.
    pub fn remove(&mut self, a: &str, b: &str) -> bool {
        match PeerPair::new(a, b) {
            Ok(pair) => self.pairs.remove(&pair),
            Err(_) => false,
        }
    }

    /// Check whether `a` and `b` are forbidden from peering
    pub fn contains(&self, a: &str, b: &str) -> bool {
        PeerPair::new(a, b).map_or(false, |pair| self.pairs.contains(&pair))
    }

    /// Sorted names of the nodes `name` must not peer with
    pub fn peers_of(&self, name: &str) -> Vec<&str> {
        let mut peers: Vec<&str> = self.pairs.iter().filter_map(|p| p.other(name)).collect();
        peers.sort_unstable();
        peers
    }

    /// Drop every pair mentioning `name`, returning how many were removed
    pub fn remove_node(&mut self, name: &str) -> usize {
        let before = self.pairs.len();
        self.pairs.retain(|pair| !pair.mentions(name));
        before - self.pairs.len()
    }

    /// Keep only pairs whose both names satisfy `known`
    pub fn retain_known<F>(&mut self, mut known: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.pairs.len();
        self.pairs.retain(|pair| known(&pair.low) && known(&pair.high));
        before - self.pairs.len()
    }

    /// Iterate pairs in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &PeerPair> {
        self.pairs.iter()
    }

    /// Number of blacklisted pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check whether the blacklist is empty
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_unordered() {
        let ab = PeerPair::new("alice", "bob").unwrap();
        let ba = PeerPair::new("bob", "alice").unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.names(), ("alice", "bob"));
        assert_eq!(ab.other("bob"), Some("alice"));
        assert_eq!(ab.other("carol"), None);
    }

    #[test]
    fn test_pair_rejects_self() {
        assert!(matches!(
            PeerPair::new("alice", "alice"),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_add_then_remove_restores_state() {
        let mut blacklist = PeerBlacklist::new();
        blacklist.add("alice", "carol").unwrap();
        let before = blacklist.clone();

        assert!(blacklist.add("alice", "bob").unwrap());
        assert!(blacklist.contains("bob", "alice"));
        assert!(!blacklist.add("bob", "alice").unwrap());

        assert!(blacklist.remove("alice", "bob"));
        assert_eq!(blacklist, before);
    }

    #[test]
    fn test_remove_absent_pair_is_noop() {
        let mut blacklist = PeerBlacklist::new();
        blacklist.add("alice", "bob").unwrap();
        assert!(!blacklist.remove("alice", "carol"));
        assert!(!blacklist.remove("alice", "alice"));
        assert_eq!(blacklist.len(), 1);
    }

    #[test]
    fn test_peers_of_sorted() {
        let mut blacklist = PeerBlacklist::new();
        blacklist.add("dave", "alice").unwrap();
        blacklist.add("alice", "bob").unwrap();
        blacklist.add("carol", "alice").unwrap();
        blacklist.add("bob", "carol").unwrap();
        assert_eq!(blacklist.peers_of("alice"), vec!["bob", "carol", "dave"]);
        assert_eq!(blacklist.peers_of("carol"), vec!["alice", "bob"]);
        assert!(blacklist.peers_of("erin").is_empty());
    }

    #[test]
    fn test_remove_node_prunes_both_positions() {
        let mut blacklist = PeerBlacklist::new();
        blacklist.add("alice", "bob").unwrap();
        blacklist.add("carol", "bob").unwrap();
        blacklist.add("alice", "carol").unwrap();

        assert_eq!(blacklist.remove_node("bob"), 2);
        assert_eq!(blacklist.len(), 1);
        assert!(blacklist.contains("carol", "alice"));
    }

    #[test]
    fn test_iteration_is_sorted() {
        let mut blacklist = PeerBlacklist::new();
        blacklist.add("zed", "yan").unwrap();
        blacklist.add("bob", "alice").unwrap();
        blacklist.add("carol", "alice").unwrap();
        let pairs: Vec<_> = blacklist.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            pairs,
            vec!["alice <-> bob", "alice <-> carol", "yan <-> zed"]
        );
    }
}
