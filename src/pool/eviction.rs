//! Eviction Table
//!
//! Scheduled evictions for pending validation requests, one deadline per
//! identity. The table only records when an identity is due; the mempool
//! decides what firing means.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct EvictionTable {
    deadlines: HashMap<String, u64>,
}

impl EvictionTable {
    /// Schedule an eviction unless one is already pending for `identity`
    ///
    /// An existing deadline is kept: the window is anchored at first request.
    pub fn schedule(&mut self, identity: &str, deadline: u64) {
        self.deadlines
            .entry(identity.to_string())
            .or_insert(deadline);
    }

    /// Cancel the eviction for `identity`; returns whether one was scheduled
    pub fn cancel(&mut self, identity: &str) -> bool {
        self.deadlines.remove(identity).is_some()
    }

    /// Identities whose deadline is at or before `now`
    pub fn due(&self, now: u64) -> Vec<String> {
        self.deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(identity, _)| identity.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_keeps_first_deadline() {
        let mut table = EvictionTable::default();
        table.schedule("a", 100);
        table.schedule("a", 500);
        assert_eq!(table.due(100), vec!["a".to_string()]);
    }

    #[test]
    fn test_due_and_cancel() {
        let mut table = EvictionTable::default();
        table.schedule("a", 100);
        table.schedule("b", 200);

        assert!(table.due(99).is_empty());
        assert_eq!(table.due(100), vec!["a".to_string()]);

        let mut both = table.due(200);
        both.sort();
        assert_eq!(both, vec!["a".to_string(), "b".to_string()]);

        assert!(table.cancel("a"));
        assert!(!table.cancel("a"));
        assert_eq!(table.due(1_000), vec!["b".to_string()]);
    }
}
