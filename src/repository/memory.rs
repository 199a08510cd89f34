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

//! In-process repository backend.
//!
//! # Thread Safety
//!
//! Objects live in a [`DashMap`] sharded by user. Every operation holds the
//! user's shard guard for its whole read-modify-write, so concurrent record
//! mutations on the same object are serialized and never lose updates, while
//! different users proceed in parallel.

use super::RentObjectRepository;
use crate::base::UserId;
use crate::error::{RentError, Result};
use crate::rent_object::{RentObject, RentObjectUpdate};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Rent objects of one user, ordered by name.
type UserObjects = BTreeMap<String, RentObject>;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    objects: DashMap<UserId, UserObjects>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    /// Builds a repository seeded with `objects`.
    ///
    /// # Errors
    ///
    /// [`RentError::ObjectAlreadyExists`] if two objects share a user and name.
    pub fn with_objects(objects: impl IntoIterator<Item = (UserId, RentObject)>) -> Result<Self> {
        let repository = Self::new();
        for (user_id, object) in objects {
            repository.add(user_id, object)?;
        }
        Ok(repository)
    }
}

impl RentObjectRepository for MemoryRepository {
    fn add(&self, user_id: UserId, object: RentObject) -> Result<()> {
        let mut user_objects = self.objects.entry(user_id).or_default();

        // Entry API keeps check-and-insert atomic under the shard guard.
        match user_objects.entry(object.name.clone()) {
            Entry::Occupied(_) => Err(RentError::ObjectAlreadyExists),
            Entry::Vacant(entry) => {
                tracing::debug!(user = %user_id, name = %object.name, "object added");
                entry.insert(object);
                Ok(())
            }
        }
    }

    fn delete(&self, user_id: UserId, name: &str) -> Result<()> {
        let mut user_objects = self
            .objects
            .get_mut(&user_id)
            .ok_or(RentError::ObjectNotFound)?;
        user_objects
            .remove(name)
            .ok_or(RentError::ObjectNotFound)?;
        tracing::debug!(user = %user_id, name, "object deleted");
        Ok(())
    }

    fn update(&self, user_id: UserId, name: &str, patch: &RentObjectUpdate) -> Result<()> {
        let mut user_objects = self
            .objects
            .get_mut(&user_id)
            .ok_or(RentError::ObjectNotFound)?;
        let updated = user_objects
            .get(name)
            .ok_or(RentError::ObjectNotFound)?
            .update(patch);

        if updated.name != name {
            if user_objects.contains_key(&updated.name) {
                return Err(RentError::ObjectAlreadyExists);
            }
            user_objects.remove(name);
        }
        tracing::debug!(user = %user_id, name, new_name = %updated.name, "object updated");
        user_objects.insert(updated.name.clone(), updated);
        Ok(())
    }

    fn get_by_name(&self, user_id: UserId, name: &str) -> Result<RentObject> {
        self.objects
            .get(&user_id)
            .and_then(|user_objects| user_objects.get(name).cloned())
            .ok_or(RentError::ObjectNotFound)
    }

    fn get_all(&self, user_id: UserId) -> Result<Vec<RentObject>> {
        Ok(self
            .objects
            .get(&user_id)
            .map(|user_objects| user_objects.values().cloned().collect())
            .unwrap_or_default())
    }

    fn modify<T>(
        &self,
        user_id: UserId,
        name: &str,
        apply: impl FnOnce(&mut RentObject) -> Result<T>,
    ) -> Result<T> {
        let mut user_objects = self
            .objects
            .get_mut(&user_id)
            .ok_or(RentError::ObjectNotFound)?;
        let stored = user_objects
            .get_mut(name)
            .ok_or(RentError::ObjectNotFound)?;

        let mut object = stored.clone();
        let output = apply(&mut object)?;
        *stored = object;
        tracing::debug!(user = %user_id, name, records = stored.len(), "object modified");
        Ok(output)
    }
}
