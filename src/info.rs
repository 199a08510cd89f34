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

//! Read-only financial view of a rent object.

use crate::record::Record;
use crate::rent_object::RentObject;
use rust_decimal::Decimal;
use serde::Serialize;

/// A record with its derived figures, raw and per unit of area.
///
/// The `*_by_area` fields are zero when the object's area is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordInfo {
    #[serde(flatten)]
    pub record: Record,
    pub income: Decimal,
    pub expenses: Decimal,
    pub profit: Decimal,
    pub income_by_area: Decimal,
    pub expenses_by_area: Decimal,
    pub profit_by_area: Decimal,
}

/// Projection of a [`RentObject`] with per-record figures, in date order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RentObjectInfo {
    pub name: String,
    pub description: String,
    pub area: Decimal,
    pub records_info: Vec<RecordInfo>,
}

impl RecordInfo {
    pub fn new(record: Record, area: Decimal) -> Self {
        let (income, expenses, profit) = (record.income(), record.expenses(), record.profit());
        Self {
            record,
            income,
            expenses,
            profit,
            income_by_area: per_area(income, area),
            expenses_by_area: per_area(expenses, area),
            profit_by_area: per_area(profit, area),
        }
    }
}

impl RentObjectInfo {
    /// Builds the projection, sorting the object's ledger as a side effect.
    pub fn project(object: &mut RentObject) -> Self {
        let area = object.area;
        let records_info = object
            .get_all_records()
            .into_iter()
            .map(|record| RecordInfo::new(record, area))
            .collect();

        Self {
            name: object.name.clone(),
            description: object.description.clone(),
            area,
            records_info,
        }
    }
}

impl From<RentObject> for RentObjectInfo {
    fn from(mut object: RentObject) -> Self {
        Self::project(&mut object)
    }
}

/// Zero area, or a quotient outside the decimal range, yields zero.
fn per_area(amount: Decimal, area: Decimal) -> Decimal {
    amount.checked_div(area).unwrap_or(Decimal::ZERO)
}
