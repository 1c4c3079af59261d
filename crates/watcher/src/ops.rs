//! Operation filter and per-tick rate cap

use pollwatch_core::{Event, Op};
use std::collections::BTreeSet;

/// Restricts which events of a tick reach the consumer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpFilter {
    /// Allowed kinds, empty = all
    allowed: BTreeSet<Op>,
    /// Events delivered per tick, 0 = unlimited
    max_events: usize,
}

impl OpFilter {
    pub fn new(ops: impl IntoIterator<Item = Op>, max_events: usize) -> Self {
        Self {
            allowed: ops.into_iter().collect(),
            max_events,
        }
    }

    /// Replace the allowed set (empty allows everything)
    pub fn set_ops(&mut self, ops: impl IntoIterator<Item = Op>) {
        self.allowed = ops.into_iter().collect();
    }

    pub fn set_max_events(&mut self, max_events: usize) {
        self.max_events = max_events;
    }

    pub fn allows(&self, op: Op) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&op)
    }

    /// Drop disallowed kinds, then truncate to the cap
    ///
    /// Order is preserved. Events over the cap are discarded, not queued.
    pub fn apply(&self, events: Vec<Event>) -> Vec<Event> {
        let mut kept: Vec<Event> = events.into_iter().filter(|e| self.allows(e.op)).collect();
        if self.max_events > 0 {
            kept.truncate(self.max_events);
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollwatch_core::FileRecord;
    use std::time::UNIX_EPOCH;

    fn event(op: Op, path: &str) -> Event {
        Event::new(op, FileRecord::file(path, 1, 0o644, UNIX_EPOCH))
    }

    #[test]
    fn test_default_passes_everything() {
        let events = vec![event(Op::Create, "/a"), event(Op::Chmod, "/b")];
        assert_eq!(OpFilter::default().apply(events.clone()), events);
    }

    #[test]
    fn test_filter_ops_keeps_allowed_kinds() {
        let filter = OpFilter::new([Op::Write], 0);
        let kept = filter.apply(vec![event(Op::Create, "/a"), event(Op::Write, "/b")]);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].op, Op::Write);
    }

    #[test]
    fn test_rate_cap_keeps_first_events() {
        let filter = OpFilter::new([], 1);
        let kept = filter.apply(vec![
            event(Op::Create, "/a"),
            event(Op::Create, "/b"),
            event(Op::Create, "/c"),
        ]);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path.to_str(), Some("/a"));
    }

    #[test]
    fn test_filtered_events_do_not_count_against_cap() {
        let filter = OpFilter::new([Op::Write], 1);
        let kept = filter.apply(vec![
            event(Op::Create, "/a"),
            event(Op::Create, "/b"),
            event(Op::Write, "/c"),
        ]);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path.to_str(), Some("/c"));
    }
}
