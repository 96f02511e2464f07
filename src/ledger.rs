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

//! The reward-points ledger.
//!
//! The [`Ledger`] is the central component: it ingests transactions into the
//! per-payer accounts and the shared timeline, and spends points oldest-first
//! across all payers.
//!
//! # Spending
//!
//! A spend walks the timeline in chronological order until the requested
//! amount is exhausted or no indexed transactions remain:
//!
//! - a credit covered by the remaining request is consumed whole;
//! - a credit larger than the remaining request is consumed partially, and
//!   its remainder is re-indexed under the original key;
//! - a debit returns its magnitude to the remaining request, bounded by what
//!   the walk has already tallied from that payer.
//!
//! A request larger than the total available points is satisfied partially
//! and is not an error; the returned shares simply sum to less than the
//! request.
//!
//! # Locking
//!
//! Mutating operations hold the timeline lock for their full duration, and
//! per-payer account locks are only ever taken while the timeline lock is
//! held. Balance reads take no timeline lock. This ordering (timeline, then
//! account) is fixed; see `tests/deadlock_test.rs`.

use crate::account::PayerAccount;
use crate::base::{PayerId, TransactionKey};
use crate::error::LedgerError;
use crate::timeline::{ConsumedEntry, ConsumedLog, Timeline};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// One payer's share of a spend, in the order the walk first touched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpendShare {
    pub payer_id: PayerId,
    /// Points deducted from this payer, always positive.
    pub points: i64,
}

/// Reward-points ledger for a single account holder.
///
/// # Invariants
///
/// - No payer balance is ever negative.
/// - A balance equals the payer's transaction history replayed in timestamp
///   order with the running total floored at zero after every step.
/// - Every unconsumed transaction is present in exactly one payer account
///   and in the timeline; consumed entries live only in the consumed log.
pub struct Ledger {
    /// Payer accounts indexed by payer id, created lazily.
    payers: DashMap<PayerId, PayerAccount>,
    /// Chronological index driving spend order.
    timeline: Mutex<Timeline>,
    /// Entries the spend walk removed from the timeline.
    consumed: ConsumedLog,
    /// Arrival counter backing the timestamp tie-break.
    arrivals: AtomicU64,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Ledger {
            payers: DashMap::new(),
            timeline: Mutex::new(Timeline::new()),
            consumed: ConsumedLog::new(),
            arrivals: AtomicU64::new(0),
        }
    }

    /// Ingests a transaction and returns the payer's new balance.
    ///
    /// Credits add to the balance directly. A debit against a non-zero
    /// balance forces a full chronological replay of the payer's history,
    /// because the debit may be timestamped earlier than the transactions
    /// that produced the current balance; the replay floors the running
    /// total at zero at every step, which is what makes retroactive
    /// corrections come out right.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EmptyPayerId`] - the payer id is empty.
    pub fn ingest(
        &self,
        payer_id: PayerId,
        points: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<i64, LedgerError> {
        if payer_id.0.is_empty() {
            return Err(LedgerError::EmptyPayerId);
        }

        let key = TransactionKey::new(timestamp, self.arrivals.fetch_add(1, Ordering::Relaxed));

        // The timeline lock spans both inserts so a concurrent spend never
        // sees an indexed transaction that its payer account lacks.
        let mut timeline = self.timeline.lock();
        timeline.insert(key, payer_id.clone(), points);

        let account = self
            .payers
            .entry(payer_id.clone())
            .or_insert_with(move || PayerAccount::new(payer_id));
        Ok(account.ingest(key, points))
    }

    /// Spends `amount` points across payers, oldest transactions first.
    ///
    /// Returns the per-payer deductions in first-touch order. If the ledger
    /// holds fewer points than requested, the spend is partial: the shares
    /// sum to whatever was available, and no error is raised.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidSpendAmount`] - `amount` is negative.
    /// - [`LedgerError::UnknownPayer`], [`LedgerError::MissingTransaction`] -
    ///   internal-consistency failures; these indicate a bug, not bad input.
    pub fn spend(&self, amount: i64) -> Result<Vec<SpendShare>, LedgerError> {
        if amount < 0 {
            return Err(LedgerError::InvalidSpendAmount);
        }

        let mut timeline = self.timeline.lock();
        let mut remaining = amount;
        let mut tallies: Vec<(PayerId, i64)> = Vec::new();

        while remaining > 0 {
            let Some((key, entry)) = timeline.pop_earliest() else {
                break;
            };
            self.consumed.push(ConsumedEntry {
                key,
                payer_id: entry.payer_id.clone(),
                points: entry.points,
            });

            let account = self
                .payers
                .get(&entry.payer_id)
                .ok_or(LedgerError::UnknownPayer)?;
            let slot = Self::tally_slot(&mut tallies, &entry.payer_id);

            if entry.points > 0 {
                if entry.points <= remaining {
                    // Consumed whole.
                    tallies[slot].1 += entry.points;
                    remaining -= entry.points;
                    account
                        .remove_oldest()
                        .ok_or(LedgerError::MissingTransaction)?;
                } else {
                    // Consumed partially: reduce the stored transaction and
                    // re-index the remainder under its original key.
                    tallies[slot].1 += remaining;
                    let left = account
                        .reduce_oldest(remaining)
                        .ok_or(LedgerError::MissingTransaction)?;
                    timeline.insert(key, entry.payer_id, left);
                    remaining = 0;
                }
            } else {
                // A debit surfacing in chronological order stands for points
                // already gone from this payer's usable pool. Its magnitude
                // flows back into the remaining request, bounded by what the
                // walk has tallied from this payer so far.
                let magnitude = -entry.points;
                let tallied = tallies[slot].1;
                if tallied > magnitude {
                    tallies[slot].1 -= magnitude;
                    remaining += magnitude;
                    account.deduct(magnitude);
                } else {
                    tallies[slot].1 = 0;
                    remaining += tallied;
                    account.reset_balance();
                }
                account
                    .remove_oldest()
                    .ok_or(LedgerError::MissingTransaction)?;
            }
        }

        if remaining > 0 {
            warn!(
                requested = amount,
                unfilled = remaining,
                "spend request exceeded available points"
            );
        }

        // Apply each non-zero tally to its payer's published balance once.
        let mut shares = Vec::with_capacity(tallies.len());
        for (payer_id, tally) in tallies {
            if tally == 0 {
                continue;
            }
            let account = self
                .payers
                .get(&payer_id)
                .ok_or(LedgerError::UnknownPayer)?;
            account.deduct(tally);
            shares.push(SpendShare {
                payer_id,
                points: tally,
            });
        }
        Ok(shares)
    }

    /// Snapshot of every payer's current balance.
    pub fn balances(&self) -> BTreeMap<PayerId, i64> {
        self.payers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().balance()))
            .collect()
    }

    /// Current balance for one payer; 0 for a payer the ledger has never seen.
    pub fn balance_of(&self, payer_id: &PayerId) -> i64 {
        self.payers
            .get(payer_id)
            .map(|account| account.balance())
            .unwrap_or(0)
    }

    /// Retrieves a payer account by id.
    pub fn account(
        &self,
        payer_id: &PayerId,
    ) -> Option<dashmap::mapref::one::Ref<'_, PayerId, PayerAccount>> {
        self.payers.get(payer_id)
    }

    /// Number of transactions currently indexed in the timeline.
    pub fn indexed_count(&self) -> usize {
        self.timeline.lock().len()
    }

    /// The append-only log of consumed timeline entries.
    pub fn consumed(&self) -> &ConsumedLog {
        &self.consumed
    }

    fn tally_slot(tallies: &mut Vec<(PayerId, i64)>, payer_id: &PayerId) -> usize {
        match tallies.iter().position(|(id, _)| id == payer_id) {
            Some(slot) => slot,
            None => {
                tallies.push((payer_id.clone(), 0));
                tallies.len() - 1
            }
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
