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

//! Per-payer account management.
//!
//! A [`PayerAccount`] holds the payer's unconsumed transactions in
//! chronological order together with a cached balance. The balance is not the
//! raw sum of the stored points: it is the result of replaying the
//! transactions in timestamp order with the running total floored at zero
//! after every step. A debit that lands chronologically before existing
//! credits therefore zeroes the running total at its own position rather
//! than reducing the final sum.
//!
//! # Example
//!
//! ```
//! use chrono::DateTime;
//! use points_ledger_rs::{PayerAccount, PayerId, TransactionKey};
//!
//! let account = PayerAccount::new(PayerId::from("FETCH"));
//! let t0 = DateTime::from_timestamp(1_665_705_600, 0).unwrap();
//! let balance = account.ingest(TransactionKey::new(t0, 0), 200);
//! assert_eq!(balance, 200);
//! ```

use crate::base::{PayerId, TransactionKey};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug)]
struct AccountData {
    payer_id: PayerId,
    balance: i64,
    /// Unconsumed transactions ordered by timestamp, then arrival.
    transactions: BTreeMap<TransactionKey, i64>,
}

impl AccountData {
    fn new(payer_id: PayerId) -> Self {
        Self {
            payer_id,
            balance: 0,
            transactions: BTreeMap::new(),
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= 0,
            "Invariant violated: balance for payer {} went negative: {}",
            self.payer_id,
            self.balance
        );
    }

    /// Inserts a transaction into the ordered store. Balance is untouched;
    /// ingestion decides how the balance moves.
    fn record(&mut self, key: TransactionKey, points: i64) {
        self.transactions.insert(key, points);
    }

    /// Adds a non-negative amount to the balance.
    ///
    /// The floor mirrors the replay semantics; for a credit it never fires.
    fn credit(&mut self, points: i64) -> i64 {
        self.balance += points;
        if self.balance < 0 {
            self.balance = 0;
        }
        self.assert_invariants();
        self.balance
    }

    /// Replays the full transaction history in chronological order.
    ///
    /// The running total is floored at zero after every transaction, so a
    /// large early debit zeroes the prefix before later credits apply. This
    /// is the recovery path for out-of-order arrivals.
    fn recompute(&mut self) -> i64 {
        let mut total = 0i64;
        for points in self.transactions.values() {
            total += points;
            if total < 0 {
                total = 0;
            }
        }
        debug!(
            payer = %self.payer_id,
            balance = total,
            transactions = self.transactions.len(),
            "replayed transaction history"
        );
        self.balance = total;
        self.assert_invariants();
        total
    }

    fn remove_oldest(&mut self) -> Option<(TransactionKey, i64)> {
        self.transactions.pop_first()
    }

    fn reduce_oldest(&mut self, amount: i64) -> Option<i64> {
        let mut entry = self.transactions.first_entry()?;
        *entry.get_mut() -= amount;
        Some(*entry.get())
    }

    /// Subtracts a spent amount from the balance, floored at zero.
    fn deduct(&mut self, amount: i64) -> i64 {
        self.balance = (self.balance - amount).max(0);
        self.assert_invariants();
        self.balance
    }

    fn reset_balance(&mut self) {
        self.balance = 0;
    }
}

/// A payer's transaction store and cached balance.
///
/// Created lazily on the payer's first transaction and never deleted. Owned
/// exclusively by the [`Ledger`](crate::Ledger); the spend walk mutates it
/// only through these operations.
#[derive(Debug)]
pub struct PayerAccount {
    inner: Mutex<AccountData>,
}

impl PayerAccount {
    pub fn new(payer_id: PayerId) -> Self {
        Self {
            inner: Mutex::new(AccountData::new(payer_id)),
        }
    }

    /// Current published balance.
    pub fn balance(&self) -> i64 {
        self.inner.lock().balance
    }

    /// Number of unconsumed transactions.
    pub fn transaction_count(&self) -> usize {
        self.inner.lock().transactions.len()
    }

    /// Records a transaction and updates the balance per its sign.
    ///
    /// Credits (including zero) add directly; the balance cannot decrease.
    /// Debits against a zero balance change nothing further. Any other debit
    /// forces a full chronological replay, because the debit may be
    /// timestamped earlier than the transactions that produced the current
    /// balance. Returns the new balance.
    pub fn ingest(&self, key: TransactionKey, points: i64) -> i64 {
        let mut data = self.inner.lock();
        data.record(key, points);

        if points >= 0 {
            data.credit(points)
        } else if data.balance == 0 {
            // Nothing to subtract from; the debit stays recorded for replay.
            data.balance
        } else {
            data.recompute()
        }
    }

    /// Replays the transaction history and stores the result as the balance.
    pub fn recompute(&self) -> i64 {
        self.inner.lock().recompute()
    }

    /// Pops the earliest unconsumed transaction (fully spent).
    pub fn remove_oldest(&self) -> Option<(TransactionKey, i64)> {
        self.inner.lock().remove_oldest()
    }

    /// Decrements the earliest transaction's points by `amount` (partially
    /// spent) and returns that transaction's remaining points.
    pub fn reduce_oldest(&self, amount: i64) -> Option<i64> {
        self.inner.lock().reduce_oldest(amount)
    }

    /// Subtracts a spend tally from the published balance, floored at zero.
    /// Returns the new balance.
    pub fn deduct(&self, amount: i64) -> i64 {
        self.inner.lock().deduct(amount)
    }

    /// Zeroes the published balance (debit absorption exhausted the tally).
    pub fn reset_balance(&self) {
        self.inner.lock().reset_balance()
    }
}
