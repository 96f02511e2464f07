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

//! Error types for ledger operations.
//!
//! Two classes share one enum: validation errors, which reject bad input
//! before any state changes, and internal-consistency errors, which indicate
//! the timeline and the per-payer stores have diverged. The latter cannot
//! occur through the public API; [`LedgerError::is_internal`] lets adapters
//! report the two classes differently.

use thiserror::Error;

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Payer id is empty
    #[error("payer id must not be empty")]
    EmptyPayerId,

    /// Spend amount is negative
    #[error("spend amount must not be negative")]
    InvalidSpendAmount,

    /// Timeline references a payer with no account
    #[error("transaction index references an unknown payer")]
    UnknownPayer,

    /// Payer account has no transaction where the timeline says one exists
    #[error("payer has no recorded transaction to consume")]
    MissingTransaction,
}

impl LedgerError {
    /// True for errors that indicate an internal-consistency bug rather than
    /// rejected input. These should never surface during normal operation.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::UnknownPayer | Self::MissingTransaction)
    }
}
