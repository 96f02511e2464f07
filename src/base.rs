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

//! Core identifier types for payers and transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a payer (a points source).
///
/// Wraps the payer name as received from the partner, e.g. `"FETCH"`.
/// `Ord` so balance snapshots iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PayerId(pub String);

impl fmt::Display for PayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PayerId {
    fn from(name: &str) -> Self {
        PayerId(name.to_owned())
    }
}

/// Unique, totally ordered key for a transaction.
///
/// Orders by timestamp first, then by `seq`, a process-wide arrival counter
/// assigned at ingestion. Transactions with equal timestamps therefore
/// compare in arrival order, keeping replay and spend order stable without
/// a secondary sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionKey {
    pub timestamp: DateTime<Utc>,
    pub seq: u64,
}

impl TransactionKey {
    pub fn new(timestamp: DateTime<Utc>, seq: u64) -> Self {
        Self { timestamp, seq }
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.timestamp.to_rfc3339(), self.seq)
    }
}
