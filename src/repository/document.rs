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

//! Document-store repository backend.
//!
//! Each rent object is stored as one document:
//!
//! ```json
//! { "user_id": 1, "version": 3, "rent_object": { "name": "...", "records": [] } }
//! ```
//!
//! Mutations read the document, apply the change to the decoded object and
//! replace the whole document only if its `version` is still the one read.
//! A lost race surfaces as [`RentError::ConcurrentModification`]; retrying is
//! left to the caller (see [`retry_on_conflict`](super::retry_on_conflict)).

use super::RentObjectRepository;
use crate::base::UserId;
use crate::error::{RentError, Result};
use crate::rent_object::{RentObject, RentObjectUpdate};
use serde::{Deserialize, Serialize};

/// Stored form of a rent object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub user_id: UserId,
    /// Bumped on every replace.
    #[serde(default)]
    pub version: u64,
    pub rent_object: RentObject,
}

/// Unique index of a collection: `(user_id, rent_object.name)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentKey {
    pub user_id: UserId,
    pub name: String,
}

impl DocumentKey {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }
}

impl Document {
    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(self.user_id, self.rent_object.name.clone())
    }
}

/// A collection of [`Document`]s with a unique index on [`DocumentKey`].
pub trait DocumentCollection: Send + Sync {
    fn find_one(&self, key: &DocumentKey) -> Result<Option<Document>>;

    /// All documents of a user, in no particular order.
    fn find(&self, user_id: UserId) -> Result<Vec<Document>>;

    /// # Errors
    ///
    /// [`RentError::ObjectAlreadyExists`] if the key is taken.
    fn insert_one(&self, document: Document) -> Result<()>;

    /// Replaces the document at `key` if its version equals `expected_version`.
    ///
    /// The replacement may carry a different key (rename).
    ///
    /// # Errors
    ///
    /// - [`RentError::ObjectNotFound`] if nothing is stored at `key`.
    /// - [`RentError::ConcurrentModification`] on a version mismatch.
    /// - [`RentError::ObjectAlreadyExists`] if the new key is taken by another document.
    fn replace_one(
        &self,
        key: &DocumentKey,
        expected_version: u64,
        document: Document,
    ) -> Result<()>;

    /// Returns whether a document was removed.
    fn delete_one(&self, key: &DocumentKey) -> Result<bool>;

    fn drop_all(&self) -> Result<()>;
}

/// Repository over a [`DocumentCollection`] with optimistic concurrency.
#[derive(Debug)]
pub struct DocumentRepository<C> {
    collection: C,
}

impl<C: DocumentCollection> DocumentRepository<C> {
    pub fn new(collection: C) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Removes every stored document.
    pub fn clear(&self) -> Result<()> {
        self.collection.drop_all()
    }

    fn fetch(&self, key: &DocumentKey) -> Result<Document> {
        self.collection
            .find_one(key)?
            .ok_or(RentError::ObjectNotFound)
    }

    /// Writes `object` back over `current`, guarded by the version read.
    fn store(&self, key: &DocumentKey, current: &Document, object: RentObject) -> Result<()> {
        let replacement = Document {
            user_id: current.user_id,
            version: current.version + 1,
            rent_object: object,
        };
        self.collection
            .replace_one(key, current.version, replacement)
            .inspect_err(|err| {
                if *err == RentError::ConcurrentModification {
                    tracing::warn!(
                        user = %key.user_id,
                        name = %key.name,
                        version = current.version,
                        "document changed since read"
                    );
                }
            })
    }
}

impl<C: DocumentCollection> RentObjectRepository for DocumentRepository<C> {
    fn add(&self, user_id: UserId, object: RentObject) -> Result<()> {
        let name = object.name.clone();
        self.collection.insert_one(Document {
            user_id,
            version: 0,
            rent_object: object,
        })?;
        tracing::debug!(user = %user_id, name = %name, "document inserted");
        Ok(())
    }

    fn delete(&self, user_id: UserId, name: &str) -> Result<()> {
        if !self.collection.delete_one(&DocumentKey::new(user_id, name))? {
            return Err(RentError::ObjectNotFound);
        }
        tracing::debug!(user = %user_id, name, "document deleted");
        Ok(())
    }

    fn update(&self, user_id: UserId, name: &str, patch: &RentObjectUpdate) -> Result<()> {
        let key = DocumentKey::new(user_id, name);
        let current = self.fetch(&key)?;
        let updated = current.rent_object.update(patch);
        self.store(&key, &current, updated)?;
        tracing::debug!(user = %user_id, name, "document updated");
        Ok(())
    }

    fn get_by_name(&self, user_id: UserId, name: &str) -> Result<RentObject> {
        Ok(self.fetch(&DocumentKey::new(user_id, name))?.rent_object)
    }

    fn get_all(&self, user_id: UserId) -> Result<Vec<RentObject>> {
        let mut objects: Vec<RentObject> = self
            .collection
            .find(user_id)?
            .into_iter()
            .map(|document| document.rent_object)
            .collect();
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }

    fn modify<T>(
        &self,
        user_id: UserId,
        name: &str,
        apply: impl FnOnce(&mut RentObject) -> Result<T>,
    ) -> Result<T> {
        let key = DocumentKey::new(user_id, name);
        let current = self.fetch(&key)?;
        let mut object = current.rent_object.clone();
        let output = apply(&mut object)?;
        self.store(&key, &current, object)?;
        tracing::debug!(user = %user_id, name, version = current.version + 1, "document modified");
        Ok(output)
    }
}
