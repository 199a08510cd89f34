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

//! Keyed storage of rent objects.
//!
//! Objects are keyed by `(UserId, name)`. Both backends honor the same
//! contract:
//!
//! | Operation | Fails with |
//! |-----------|------------|
//! | `add` | [`RentError::ObjectAlreadyExists`] on an occupied key |
//! | `update` | [`RentError::ObjectNotFound`], or `ObjectAlreadyExists` when renaming onto an occupied key |
//! | `delete`, `get_by_name` | [`RentError::ObjectNotFound`] |
//! | record operations | `ObjectNotFound`, then [`RentError::RecordNotFound`] |
//!
//! `get_all` is ordered ascending by name and returns an empty list for
//! unknown users. Record operations read the whole object, apply the change
//! and write the whole object back. This includes `get_all_records`, whose
//! date sort is stored so that positional operations match the list it
//! returned.
//!
//! # Example
//!
//! ```
//! use rent_ledger::{MemoryRepository, Record, RentObject, RentObjectRepository, UserId};
//! use rust_decimal_macros::dec;
//!
//! let repository = MemoryRepository::new();
//! let user = UserId(1);
//! repository.add(user, RentObject::new("Rodionova", "HSE", dec!(100))).unwrap();
//!
//! let index = repository
//!     .add_record(user, "Rodionova", Record { rent: dec!(1000), ..Record::default() })
//!     .unwrap();
//! assert_eq!(repository.get_record_by_index(user, "Rodionova", index).unwrap().rent, dec!(1000));
//! ```

pub mod document;
pub mod json_collection;
pub mod memory;

use crate::base::{RecordId, UserId};
use crate::error::{RentError, Result};
use crate::record::{Record, RecordUpdate};
use crate::rent_object::{RentObject, RentObjectUpdate};

/// Storage contract shared by every backend.
pub trait RentObjectRepository: Send + Sync {
    fn add(&self, user_id: UserId, object: RentObject) -> Result<()>;
    fn delete(&self, user_id: UserId, name: &str) -> Result<()>;
    fn update(&self, user_id: UserId, name: &str, patch: &RentObjectUpdate) -> Result<()>;
    fn get_by_name(&self, user_id: UserId, name: &str) -> Result<RentObject>;
    fn get_all(&self, user_id: UserId) -> Result<Vec<RentObject>>;

    /// Runs `apply` against the stored object and persists the result.
    ///
    /// Nothing is written when `apply` fails.
    fn modify<T>(
        &self,
        user_id: UserId,
        name: &str,
        apply: impl FnOnce(&mut RentObject) -> Result<T>,
    ) -> Result<T>;

    fn add_record(&self, user_id: UserId, name: &str, record: Record) -> Result<usize> {
        self.modify(user_id, name, |object| Ok(object.add_record(record)))
    }

    fn delete_record(&self, user_id: UserId, name: &str, index: usize) -> Result<()> {
        self.modify(user_id, name, |object| object.delete_record(index))
    }

    fn update_record(
        &self,
        user_id: UserId,
        name: &str,
        index: usize,
        patch: &RecordUpdate,
    ) -> Result<()> {
        self.modify(user_id, name, |object| object.update_record(index, patch))
    }

    fn get_record_by_index(&self, user_id: UserId, name: &str, index: usize) -> Result<Record> {
        self.get_by_name(user_id, name)?.get_record_by_index(index)
    }

    /// Sorts the stored ledger by date, persists it and returns the records.
    ///
    /// Indices taken from the returned list address the same records in
    /// later positional operations.
    fn get_all_records(&self, user_id: UserId, name: &str) -> Result<Vec<Record>> {
        self.modify(user_id, name, |object| Ok(object.get_all_records()))
    }

    /// Adds a record and returns its stable id instead of its position.
    fn insert_record(&self, user_id: UserId, name: &str, record: Record) -> Result<RecordId> {
        self.modify(user_id, name, |object| Ok(object.insert_record(record)))
    }

    fn get_record(&self, user_id: UserId, name: &str, id: RecordId) -> Result<Record> {
        self.get_by_name(user_id, name)?.get_record(id)
    }

    fn update_record_by_id(
        &self,
        user_id: UserId,
        name: &str,
        id: RecordId,
        patch: &RecordUpdate,
    ) -> Result<()> {
        self.modify(user_id, name, |object| object.update_record_by_id(id, patch))
    }

    fn delete_record_by_id(&self, user_id: UserId, name: &str, id: RecordId) -> Result<()> {
        self.modify(user_id, name, |object| object.delete_record_by_id(id))
    }
}

/// Re-runs `operation` while it fails with [`RentError::ConcurrentModification`].
///
/// At most `attempts` runs are made (at least one); the last error is returned.
pub fn retry_on_conflict<T>(attempts: usize, mut operation: impl FnMut() -> Result<T>) -> Result<T> {
    let mut remaining = attempts.max(1);
    loop {
        remaining -= 1;
        match operation() {
            Err(RentError::ConcurrentModification) if remaining > 0 => {
                tracing::warn!(remaining, "concurrent modification, retrying");
            }
            result => return result,
        }
    }
}
