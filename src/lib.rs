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

//! # Rent Ledger
//!
//! This library tracks rental properties ("rent objects") per user. Each
//! object owns a date-ordered ledger of records holding the period's rent and
//! itemized expenses, and exposes income, expenses and profit, in total or per
//! unit of area.
//!
//! ## Core Components
//!
//! - [`Record`]: One dated ledger entry with derived income, expenses and profit
//! - [`RentObject`]: A property with its ledger, addressed by index or [`RecordId`]
//! - [`RentObjectInfo`]: Read-only projection with per-record figures and area ratios
//! - [`RentObjectRepository`]: Storage contract keyed by [`UserId`] and object name,
//!   implemented by [`MemoryRepository`] and [`DocumentRepository`]
//! - [`RentError`]: Error types for lookup, index and storage failures
//!
//! ## Example
//!
//! ```
//! use rent_ledger::{MemoryRepository, Record, RentObject, RentObjectInfo, RentObjectRepository, UserId};
//! use rust_decimal_macros::dec;
//!
//! let repository = MemoryRepository::new();
//! repository.add(UserId(1), RentObject::new("Rodionova", "HSE campus", dec!(100))).unwrap();
//! repository
//!     .add_record(UserId(1), "Rodionova", Record { rent: dec!(1000), earth_rent: dec!(500), ..Record::default() })
//!     .unwrap();
//!
//! let info = RentObjectInfo::from(repository.get_by_name(UserId(1), "Rodionova").unwrap());
//! assert_eq!(info.records_info[0].profit_by_area, dec!(5));
//! ```
//!
//! ## Thread Safety
//!
//! Both repositories are `Send + Sync`. The memory backend serializes
//! mutations per user; the document backend detects lost updates through a
//! per-document version and reports them as
//! [`RentError::ConcurrentModification`].

mod base;
pub mod error;
pub mod info;
pub mod logging;
pub mod record;
pub mod rent_object;
pub mod repository;

pub use base::{RecordId, UserId};
pub use error::{RentError, Result};
pub use info::{RecordInfo, RentObjectInfo};
pub use record::{Record, RecordUpdate};
pub use rent_object::{RecordEntry, RentObject, RentObjectUpdate};
pub use repository::document::{Document, DocumentCollection, DocumentKey, DocumentRepository};
pub use repository::json_collection::JsonCollection;
pub use repository::memory::MemoryRepository;
pub use repository::{RentObjectRepository, retry_on_conflict};
