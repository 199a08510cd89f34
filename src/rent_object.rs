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

//! Rent object aggregate.
//!
//! A [`RentObject`] owns the ledger of a single rental property. Records are
//! addressed by their position in the date-sorted ledger, which is transient:
//!
//! - [`RentObject::add_record`] appends and re-sorts, so every index may move.
//! - [`RentObject::delete_record`] swap-removes, so the former last record
//!   takes the deleted slot.
//! - [`RentObject::get_all_records`] re-sorts before returning.
//!
//! Each record also carries a [`RecordId`] that survives all of the above;
//! the `*_by_id` variants resolve it to the current position.
//!
//! # Example
//!
//! ```
//! use rent_ledger::{Record, RentObject};
//! use rust_decimal_macros::dec;
//!
//! let mut object = RentObject::new("Rodionova", "HSE campus", dec!(100));
//! let index = object.add_record(Record { rent: dec!(1000), ..Record::default() });
//! assert_eq!(object.get_record_by_index(index).unwrap().rent, dec!(1000));
//! assert_eq!(object.income(), dec!(1000));
//! ```

use crate::base::RecordId;
use crate::error::{RentError, Result};
use crate::record::{Record, RecordUpdate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A record together with its stable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: Record,
}

/// Rental property with its ledger.
///
/// # Invariants
///
/// - Any full read of the ledger returns it sorted ascending by date.
/// - Record ids are unique within the object and never reused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentObject {
    pub name: String,
    pub description: String,
    pub area: Decimal,
    #[serde(default)]
    records: Vec<RecordEntry>,
    /// Next id to hand out.
    #[serde(default)]
    next_record_id: u64,
}

/// Partial update of a [`RentObject`]; the ledger is never touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RentObjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub area: Option<Decimal>,
}

impl RentObjectUpdate {
    /// Patch replacing all three descriptive fields.
    pub fn new(name: impl Into<String>, description: impl Into<String>, area: Decimal) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            area: Some(area),
        }
    }
}

impl RentObject {
    pub fn new(name: impl Into<String>, description: impl Into<String>, area: Decimal) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            area,
            records: Vec::new(),
            next_record_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record, re-sorts the ledger and returns the record's new index.
    pub fn add_record(&mut self, record: Record) -> usize {
        self.push_sorted(record).1
    }

    /// Appends a record, re-sorts the ledger and returns its stable id.
    pub fn insert_record(&mut self, record: Record) -> RecordId {
        self.push_sorted(record).0
    }

    /// Removes the record at `index` by moving the last record into its slot.
    ///
    /// The ledger is not re-sorted, so the moved record may sit out of date
    /// order until the next full read.
    pub fn delete_record(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.records.swap_remove(index);
        Ok(())
    }

    /// Patches the record at `index` in place.
    pub fn update_record(&mut self, index: usize, patch: &RecordUpdate) -> Result<()> {
        self.check_index(index)?;
        let entry = &mut self.records[index];
        entry.record = entry.record.update(patch);
        Ok(())
    }

    pub fn get_record_by_index(&self, index: usize) -> Result<Record> {
        self.records
            .get(index)
            .map(|entry| entry.record)
            .ok_or(RentError::RecordNotFound)
    }

    /// Sorts the ledger by date and returns a copy of it.
    pub fn get_all_records(&mut self) -> Vec<Record> {
        self.sort_records();
        self.records.iter().map(|entry| entry.record).collect()
    }

    /// Sorts the ledger by date and returns the entries with their ids.
    pub fn entries(&mut self) -> &[RecordEntry] {
        self.sort_records();
        &self.records
    }

    pub fn record_id_at(&self, index: usize) -> Result<RecordId> {
        self.records
            .get(index)
            .map(|entry| entry.id)
            .ok_or(RentError::RecordNotFound)
    }

    /// Current position of the record with `id`.
    pub fn index_of(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|entry| entry.id == id)
    }

    pub fn get_record(&self, id: RecordId) -> Result<Record> {
        let index = self.index_of(id).ok_or(RentError::RecordNotFound)?;
        self.get_record_by_index(index)
    }

    pub fn update_record_by_id(&mut self, id: RecordId, patch: &RecordUpdate) -> Result<()> {
        let index = self.index_of(id).ok_or(RentError::RecordNotFound)?;
        self.update_record(index, patch)
    }

    pub fn delete_record_by_id(&mut self, id: RecordId) -> Result<()> {
        let index = self.index_of(id).ok_or(RentError::RecordNotFound)?;
        self.delete_record(index)
    }

    pub fn income(&self) -> Decimal {
        self.fold(Record::income)
    }

    pub fn expenses(&self) -> Decimal {
        self.fold(Record::expenses)
    }

    pub fn profit(&self) -> Decimal {
        self.fold(Record::profit)
    }

    /// Returns a copy with name, description and area overridden per `patch`.
    pub fn update(&self, patch: &RentObjectUpdate) -> RentObject {
        RentObject {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            area: patch.area.unwrap_or(self.area),
            records: self.records.clone(),
            next_record_id: self.next_record_id,
        }
    }

    /// Saturating sum of `figure` over the ledger.
    fn fold(&self, figure: fn(&Record) -> Decimal) -> Decimal {
        self.records
            .iter()
            .fold(Decimal::ZERO, |acc, entry| {
                acc.saturating_add(figure(&entry.record))
            })
    }

    fn push_sorted(&mut self, record: Record) -> (RecordId, usize) {
        let id = self.allocate_id();
        self.records.push(RecordEntry { id, record });
        self.sort_records();
        // Stable sort leaves the new entry last among equal dates.
        let after = self
            .records
            .partition_point(|entry| entry.record.date <= record.date);
        (id, after - 1)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.records.len() {
            return Err(RentError::RecordNotFound);
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> RecordId {
        // Objects decoded from older documents may lack the counter.
        let floor = self
            .records
            .iter()
            .map(|entry| entry.id.0.saturating_add(1))
            .max()
            .unwrap_or(0);
        let mut id = self.next_record_id.max(floor);
        if self.index_of(RecordId(id)).is_some() {
            // Counter pinned at u64::MAX: hand out the lowest free id.
            id = (0..u64::MAX)
                .find(|candidate| self.index_of(RecordId(*candidate)).is_none())
                .unwrap_or(id);
        }
        self.next_record_id = id.saturating_add(1);
        RecordId(id)
    }

    fn sort_records(&mut self) {
        // Stable: equal dates keep insertion order.
        self.records.sort_by(|a, b| a.record.date.cmp(&b.record.date));
    }
}
