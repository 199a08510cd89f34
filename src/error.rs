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

//! Error types for rent object and repository operations.

use thiserror::Error;

/// Rent ledger errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RentError {
    /// No rent object is stored under the (user, name) key
    #[error("object not found")]
    ObjectNotFound,

    /// A rent object with the same name already exists for the user
    #[error("object already exists")]
    ObjectAlreadyExists,

    /// Record index or id is outside the object's ledger
    #[error("record not found")]
    RecordNotFound,

    /// The stored object changed between read and write
    #[error("object was modified concurrently")]
    ConcurrentModification,

    /// Underlying document store failed (I/O or encoding)
    #[error("storage failure: {0}")]
    Storage(String),

    /// Input is missing fields required by its shape
    #[error("missing fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

impl From<std::io::Error> for RentError {
    fn from(err: std::io::Error) -> Self {
        RentError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for RentError {
    fn from(err: serde_json::Error) -> Self {
        RentError::Storage(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RentError>;
