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

//! Property-based tests for the points ledger.
//!
//! These tests verify invariants that should hold for any sequence of
//! transactions, checking the production structures against a naive
//! vector-based reference model where one exists.

use chrono::{DateTime, Utc};
use points_ledger_rs::{Ledger, PayerId};
use proptest::prelude::*;
use std::collections::HashMap;

const PAYERS: [&str; 3] = ["FETCH", "FESTIVAL", "GROCER"];

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn payer(index: usize) -> PayerId {
    PayerId::from(PAYERS[index])
}

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// A transaction of either sign: (payer index, points, timestamp seconds).
/// Timestamps are drawn from a small range so collisions and out-of-order
/// arrivals are common.
fn arb_transaction() -> impl Strategy<Value = (usize, i64, i64)> {
    (0..PAYERS.len(), -500i64..=1_000, 0i64..=100)
}

/// A strictly positive credit: (payer index, points, timestamp seconds).
fn arb_credit() -> impl Strategy<Value = (usize, i64, i64)> {
    (0..PAYERS.len(), 1i64..=1_000, 0i64..=100)
}

// =============================================================================
// Reference Model
// =============================================================================

/// Naive ingestion model: a per-payer vector of transactions, re-sorted and
/// replayed with a zero floor whenever a debit hits a non-zero balance.
#[derive(Default)]
struct ReferenceModel {
    history: HashMap<usize, Vec<(i64, u64, i64)>>,
    balances: HashMap<usize, i64>,
    arrivals: u64,
}

impl ReferenceModel {
    fn ingest(&mut self, payer: usize, points: i64, secs: i64) -> i64 {
        let arrival = self.arrivals;
        self.arrivals += 1;

        let history = self.history.entry(payer).or_default();
        history.push((secs, arrival, points));
        let balance = self.balances.entry(payer).or_insert(0);

        if points >= 0 {
            *balance += points;
        } else if *balance != 0 {
            let mut sorted = history.clone();
            sorted.sort();
            let mut total = 0i64;
            for (_, _, p) in sorted {
                total += p;
                if total < 0 {
                    total = 0;
                }
            }
            *balance = total;
        }
        *balance
    }
}

/// Expected per-payer deductions for a pure-credit history: walk the credits
/// in (timestamp, arrival) order taking from each until the request runs out.
fn expected_shares(credits: &[(usize, i64, i64)], amount: i64) -> HashMap<usize, i64> {
    let mut ordered: Vec<(i64, usize, usize, i64)> = credits
        .iter()
        .enumerate()
        .map(|(arrival, &(payer, points, secs))| (secs, arrival, payer, points))
        .collect();
    ordered.sort();

    let mut remaining = amount;
    let mut spent = HashMap::new();
    for (_, _, payer, points) in ordered {
        if remaining == 0 {
            break;
        }
        let take = points.min(remaining);
        *spent.entry(payer).or_insert(0) += take;
        remaining -= take;
    }
    spent
}

// =============================================================================
// Ingestion Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// The ledger agrees with the naive reference model transaction by
    /// transaction, for any mix of credits and debits in any arrival order.
    #[test]
    fn ledger_matches_reference_model(
        transactions in prop::collection::vec(arb_transaction(), 1..40),
    ) {
        let ledger = Ledger::new();
        let mut model = ReferenceModel::default();

        for &(who, points, secs) in &transactions {
            let got = ledger.ingest(payer(who), points, ts(secs)).unwrap();
            let want = model.ingest(who, points, secs);
            prop_assert_eq!(got, want);
        }

        for (who, want) in &model.balances {
            prop_assert_eq!(ledger.balance_of(&payer(*who)), *want);
        }
    }

    /// No payer balance is ever observable below zero, whatever arrives.
    #[test]
    fn balances_never_negative(
        transactions in prop::collection::vec(arb_transaction(), 1..40),
    ) {
        let ledger = Ledger::new();

        for &(who, points, secs) in &transactions {
            let balance = ledger.ingest(payer(who), points, ts(secs)).unwrap();
            prop_assert!(balance >= 0);
            for (_, b) in ledger.balances() {
                prop_assert!(b >= 0);
            }
        }
    }

    /// Pure credits sum exactly, independent of timestamps and arrival
    /// order: no clamp ever fires.
    #[test]
    fn pure_credits_sum(
        credits in prop::collection::vec(arb_credit(), 1..30),
    ) {
        let ledger = Ledger::new();
        let mut sums: HashMap<usize, i64> = HashMap::new();

        for &(who, points, secs) in &credits {
            ledger.ingest(payer(who), points, ts(secs)).unwrap();
            *sums.entry(who).or_insert(0) += points;
        }

        for (who, want) in sums {
            prop_assert_eq!(ledger.balance_of(&payer(who)), want);
        }
    }
}

// =============================================================================
// Spend Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Spending deducts exactly `min(amount, total available)` in total, and
    /// every per-payer share is positive.
    #[test]
    fn spend_conserves_points(
        credits in prop::collection::vec(arb_credit(), 1..30),
        amount in 0i64..=5_000,
    ) {
        let ledger = Ledger::new();
        let mut available = 0i64;
        for &(who, points, secs) in &credits {
            ledger.ingest(payer(who), points, ts(secs)).unwrap();
            available += points;
        }

        let shares = ledger.spend(amount).unwrap();
        let deducted: i64 = shares.iter().map(|s| s.points).sum();

        prop_assert_eq!(deducted, amount.min(available));
        for s in &shares {
            prop_assert!(s.points > 0);
        }
        for (_, balance) in ledger.balances() {
            prop_assert!(balance >= 0);
        }
    }

    /// Spending draws from the globally oldest transactions first: the
    /// per-payer deductions match a prefix walk over the credits sorted by
    /// timestamp and arrival.
    #[test]
    fn spend_is_globally_fifo(
        credits in prop::collection::vec(arb_credit(), 1..30),
        amount in 0i64..=5_000,
    ) {
        let ledger = Ledger::new();
        let mut totals: HashMap<usize, i64> = HashMap::new();
        for &(who, points, secs) in &credits {
            ledger.ingest(payer(who), points, ts(secs)).unwrap();
            *totals.entry(who).or_insert(0) += points;
        }

        let shares = ledger.spend(amount).unwrap();
        let want = expected_shares(&credits, amount);

        for s in &shares {
            let who = PAYERS.iter().position(|name| s.payer_id.0 == *name).unwrap();
            prop_assert_eq!(s.points, want[&who]);
            // The stored balance reflects the deduction.
            prop_assert_eq!(ledger.balance_of(&s.payer_id), totals[&who] - s.points);
        }
        prop_assert_eq!(
            shares.len(),
            want.values().filter(|points| **points > 0).count()
        );
    }

    /// Repeated spends keep draining oldest-first until nothing is left;
    /// balances land on zero exactly when everything has been consumed.
    #[test]
    fn repeated_spends_drain_the_ledger(
        credits in prop::collection::vec(arb_credit(), 1..20),
        chunk in 1i64..=500,
    ) {
        let ledger = Ledger::new();
        let mut available = 0i64;
        for &(who, points, secs) in &credits {
            ledger.ingest(payer(who), points, ts(secs)).unwrap();
            available += points;
        }

        let mut drained = 0i64;
        loop {
            let shares = ledger.spend(chunk).unwrap();
            let got: i64 = shares.iter().map(|s| s.points).sum();
            drained += got;
            if got < chunk {
                break;
            }
        }

        prop_assert_eq!(drained, available);
        for (_, balance) in ledger.balances() {
            prop_assert_eq!(balance, 0);
        }
        prop_assert_eq!(ledger.indexed_count(), 0);
    }
}
