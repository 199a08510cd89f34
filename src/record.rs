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

//! Dated ledger entries.
//!
//! A [`Record`] holds one period's rent (the only income figure) and the
//! itemized expenses paid for the property in that period. Amounts carry no
//! bounds: negative values are valid corrections.
//!
//! # Example
//!
//! ```
//! use rent_ledger::Record;
//! use rust_decimal_macros::dec;
//!
//! let record = Record {
//!     rent: dec!(1000),
//!     earth_rent: dec!(500),
//!     ..Record::default()
//! };
//! assert_eq!(record.profit(), dec!(500));
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One ledger entry of a rent object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub date: DateTime<Utc>,
    pub rent: Decimal,
    pub heat: Decimal,
    pub exploitation: Decimal,
    /// Maintenance of common property.
    pub mop: Decimal,
    pub renovation: Decimal,
    /// Solid waste removal.
    pub tbo: Decimal,
    pub electricity: Decimal,
    pub earth_rent: Decimal,
    pub other: Decimal,
    pub security: Decimal,
}

/// Partial update of a [`Record`]; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordUpdate {
    pub date: Option<DateTime<Utc>>,
    pub rent: Option<Decimal>,
    pub heat: Option<Decimal>,
    pub exploitation: Option<Decimal>,
    pub mop: Option<Decimal>,
    pub renovation: Option<Decimal>,
    pub tbo: Option<Decimal>,
    pub electricity: Option<Decimal>,
    pub earth_rent: Option<Decimal>,
    pub other: Option<Decimal>,
    pub security: Option<Decimal>,
}

impl Record {
    /// Sum of all itemized expense fields.
    ///
    /// Saturates at [`Decimal::MAX`] / [`Decimal::MIN`] instead of overflowing.
    pub fn expenses(&self) -> Decimal {
        [
            self.heat,
            self.exploitation,
            self.mop,
            self.renovation,
            self.tbo,
            self.electricity,
            self.earth_rent,
            self.other,
            self.security,
        ]
        .into_iter()
        .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn income(&self) -> Decimal {
        self.rent
    }

    /// Returns `income - expenses`, saturating like [`Record::expenses`].
    pub fn profit(&self) -> Decimal {
        self.income().saturating_sub(self.expenses())
    }

    /// Returns a copy with every field present in `patch` replaced.
    pub fn update(&self, patch: &RecordUpdate) -> Record {
        Record {
            date: patch.date.unwrap_or(self.date),
            rent: patch.rent.unwrap_or(self.rent),
            heat: patch.heat.unwrap_or(self.heat),
            exploitation: patch.exploitation.unwrap_or(self.exploitation),
            mop: patch.mop.unwrap_or(self.mop),
            renovation: patch.renovation.unwrap_or(self.renovation),
            tbo: patch.tbo.unwrap_or(self.tbo),
            electricity: patch.electricity.unwrap_or(self.electricity),
            earth_rent: patch.earth_rent.unwrap_or(self.earth_rent),
            other: patch.other.unwrap_or(self.other),
            security: patch.security.unwrap_or(self.security),
        }
    }
}

impl RecordUpdate {
    /// True when the patch would not change any record.
    pub fn is_empty(&self) -> bool {
        *self == RecordUpdate::default()
    }
}
