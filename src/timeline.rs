// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Chronological transaction index spanning all payers.
//!
//! The [`Timeline`] decides spend order only; each payer's account remains
//! the source of truth for what happened. Backed by a `BTreeMap` so repeated
//! pops always come out in non-decreasing [`TransactionKey`] order, with no
//! sort needed before iteration.

use crate::base::{PayerId, TransactionKey};
use crossbeam::queue::SegQueue;
use std::collections::BTreeMap;

/// A transaction as seen by the spend walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub payer_id: PayerId,
    pub points: i64,
}

/// Ordered index of every transaction not yet fully consumed by spending.
#[derive(Debug, Default)]
pub struct Timeline {
    entries: BTreeMap<TransactionKey, TimelineEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts an entry. Also used to re-index the remainder of a partially
    /// spent transaction under its original key.
    pub fn insert(&mut self, key: TransactionKey, payer_id: PayerId, points: i64) {
        self.entries.insert(key, TimelineEntry { payer_id, points });
    }

    /// Removes and returns the earliest entry.
    pub fn pop_earliest(&mut self) -> Option<(TransactionKey, TimelineEntry)> {
        self.entries.pop_first()
    }

    /// Returns the earliest entry without removing it.
    pub fn peek_earliest(&self) -> Option<(&TransactionKey, &TimelineEntry)> {
        self.entries.first_key_value()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A record of a timeline entry removed by spending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedEntry {
    pub key: TransactionKey,
    pub payer_id: PayerId,
    pub points: i64,
}

/// Append-only log of entries the spend walk removed from the timeline.
///
/// Retained for future audit and undo features; no current operation reads
/// it back. Entries come out in append order.
#[derive(Debug, Default)]
pub struct ConsumedLog {
    entries: SegQueue<ConsumedEntry>,
}

impl ConsumedLog {
    pub fn new() -> Self {
        Self {
            entries: SegQueue::new(),
        }
    }

    pub fn push(&self, entry: ConsumedEntry) {
        self.entries.push(entry);
    }

    /// Pops the oldest record. Exposed for inspection in tests and future
    /// audit tooling.
    pub fn pop(&self) -> Option<ConsumedEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn key(secs: i64, seq: u64) -> TransactionKey {
        TransactionKey::new(ts(secs), seq)
    }

    #[test]
    fn pops_in_timestamp_order() {
        let mut timeline = Timeline::new();
        timeline.insert(key(30, 0), PayerId::from("A"), 10);
        timeline.insert(key(10, 1), PayerId::from("B"), 20);
        timeline.insert(key(20, 2), PayerId::from("A"), 30);

        let order: Vec<i64> = std::iter::from_fn(|| timeline.pop_earliest())
            .map(|(_, entry)| entry.points)
            .collect();
        assert_eq!(order, vec![20, 30, 10]);
    }

    #[test]
    fn equal_timestamps_pop_in_arrival_order() {
        let mut timeline = Timeline::new();
        timeline.insert(key(10, 1), PayerId::from("B"), 2);
        timeline.insert(key(10, 0), PayerId::from("A"), 1);

        assert_eq!(timeline.pop_earliest().unwrap().1.points, 1);
        assert_eq!(timeline.pop_earliest().unwrap().1.points, 2);
    }

    #[test]
    fn reinserted_remainder_keeps_its_position() {
        let mut timeline = Timeline::new();
        timeline.insert(key(10, 0), PayerId::from("A"), 400);
        timeline.insert(key(20, 1), PayerId::from("B"), 100);

        let (popped_key, entry) = timeline.pop_earliest().unwrap();
        assert_eq!(entry.points, 400);
        // Partial consumption: the remainder goes back under the same key
        // and must surface before the later entry.
        timeline.insert(popped_key, entry.payer_id, 150);
        assert_eq!(timeline.pop_earliest().unwrap().1.points, 150);
        assert_eq!(timeline.pop_earliest().unwrap().1.points, 100);
    }

    #[test]
    fn consumed_log_preserves_append_order() {
        let log = ConsumedLog::new();
        log.push(ConsumedEntry {
            key: key(10, 0),
            payer_id: PayerId::from("A"),
            points: 1,
        });
        log.push(ConsumedEntry {
            key: key(5, 1),
            payer_id: PayerId::from("B"),
            points: 2,
        });

        assert_eq!(log.len(), 2);
        assert_eq!(log.pop().unwrap().points, 1);
        assert_eq!(log.pop().unwrap().points, 2);
        assert!(log.is_empty());
    }
}
