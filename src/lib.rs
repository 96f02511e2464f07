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

//! # Points Ledger
//!
//! This library tracks reward-point balances contributed by multiple payers
//! to a single account holder, and spends points across payers oldest-first
//! while never letting any payer's balance go negative. Transactions that
//! arrive out of chronological order retroactively correct the affected
//! payer's balance.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Central engine owning all payer state; ingests transactions
//!   and runs the oldest-first spend walk
//! - [`PayerAccount`]: One payer's ordered transaction history and cached
//!   balance
//! - [`Timeline`]: Chronological index of unconsumed transactions across all
//!   payers, driving spend order
//! - [`LedgerError`]: Error types separating rejected input from
//!   internal-consistency failures
//!
//! ## Example
//!
//! ```
//! use chrono::DateTime;
//! use points_ledger_rs::{Ledger, PayerId};
//!
//! let ledger = Ledger::new();
//! let t0 = DateTime::from_timestamp(1_665_705_600, 0).unwrap();
//!
//! ledger.ingest(PayerId::from("FETCH"), 300, t0).unwrap();
//! let shares = ledger.spend(100).unwrap();
//! assert_eq!(shares[0].points, 100);
//! assert_eq!(ledger.balance_of(&PayerId::from("FETCH")), 200);
//! ```
//!
//! ## Thread Safety
//!
//! The ledger is safe to share across threads. Mutations serialize on the
//! timeline lock; balance reads do not.

pub mod account;
mod base;
pub mod error;
mod ledger;
mod timeline;

pub use account::PayerAccount;
pub use base::{PayerId, TransactionKey};
pub use error::LedgerError;
pub use ledger::{Ledger, SpendShare};
pub use timeline::{ConsumedEntry, ConsumedLog, Timeline, TimelineEntry};
