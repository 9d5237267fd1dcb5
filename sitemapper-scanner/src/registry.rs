use crate::address::Address;
use dashmap::DashSet;

/// Set of addresses that have been claimed for crawling. Entries are never
/// removed, so each address is claimed at most once per crawl.
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    visited: DashSet<Address>,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically records `address`. Returns `true` only for the single caller
    /// that observed the absent -> present transition.
    pub fn try_claim(&self, address: &Address) -> bool {
        self.visited.insert(address.clone())
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.visited.contains(address)
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}
