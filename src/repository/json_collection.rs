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

//! JSON document collection.
//!
//! Documents are held as raw [`serde_json::Value`]s, indexed by
//! [`DocumentKey`], behind a single [`Mutex`]. A file-backed collection
//! rewrites its file (as a JSON array) on every write: the new contents go to
//! a temporary sibling first and are renamed over the original, and the
//! in-memory rows only change once that succeeds.

use super::document::{Document, DocumentCollection, DocumentKey};
use crate::base::UserId;
use crate::error::{RentError, Result};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

type Rows = BTreeMap<DocumentKey, Value>;

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug)]
pub struct JsonCollection {
    rows: Mutex<Rows>,
    path: Option<PathBuf>,
}

impl JsonCollection {
    /// Collection that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            rows: Mutex::new(Rows::new()),
            path: None,
        }
    }

    /// Opens the collection stored at `path`, starting empty if the file is absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows = if path.exists() {
            load_rows(&path)?
        } else {
            Rows::new()
        };
        tracing::debug!(path = %path.display(), documents = rows.len(), "collection opened");
        Ok(Self {
            rows: Mutex::new(rows),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Persists `next` and installs it as the current rows.
    fn commit(&self, rows: &mut Rows, next: Rows) -> Result<()> {
        if let Some(path) = &self.path {
            write_rows(path, &next)?;
        }
        *rows = next;
        Ok(())
    }
}

impl DocumentCollection for JsonCollection {
    fn find_one(&self, key: &DocumentKey) -> Result<Option<Document>> {
        self.rows.lock().get(key).map(decode).transpose()
    }

    fn find(&self, user_id: UserId) -> Result<Vec<Document>> {
        self.rows
            .lock()
            .iter()
            .filter(|(key, _)| key.user_id == user_id)
            .map(|(_, value)| decode(value))
            .collect()
    }

    fn insert_one(&self, document: Document) -> Result<()> {
        let mut rows = self.rows.lock();
        let key = document.key();
        if rows.contains_key(&key) {
            return Err(RentError::ObjectAlreadyExists);
        }

        let mut next = rows.clone();
        next.insert(key, serde_json::to_value(&document)?);
        self.commit(&mut rows, next)
    }

    fn replace_one(
        &self,
        key: &DocumentKey,
        expected_version: u64,
        document: Document,
    ) -> Result<()> {
        let mut rows = self.rows.lock();
        let stored = rows.get(key).ok_or(RentError::ObjectNotFound)?;
        if decode(stored)?.version != expected_version {
            return Err(RentError::ConcurrentModification);
        }
        let new_key = document.key();
        if new_key != *key && rows.contains_key(&new_key) {
            return Err(RentError::ObjectAlreadyExists);
        }

        let mut next = rows.clone();
        next.remove(key);
        next.insert(new_key, serde_json::to_value(&document)?);
        self.commit(&mut rows, next)
    }

    fn delete_one(&self, key: &DocumentKey) -> Result<bool> {
        let mut rows = self.rows.lock();
        if !rows.contains_key(key) {
            return Ok(false);
        }

        let mut next = rows.clone();
        next.remove(key);
        self.commit(&mut rows, next)?;
        Ok(true)
    }

    fn drop_all(&self) -> Result<()> {
        let mut rows = self.rows.lock();
        self.commit(&mut rows, Rows::new())
    }
}

fn decode(value: &Value) -> Result<Document> {
    Ok(Document::deserialize(value)?)
}

fn load_rows(path: &Path) -> Result<Rows> {
    let data = fs::read_to_string(path)?;
    let values: Vec<Value> = serde_json::from_str(&data)?;
    let mut rows = Rows::new();
    for value in values {
        let key = decode(&value)?.key();
        if rows.insert(key.clone(), value).is_some() {
            return Err(RentError::Storage(format!(
                "duplicate document for user {} and object `{}` in {}",
                key.user_id,
                key.name,
                path.display()
            )));
        }
    }
    Ok(rows)
}

fn write_rows(path: &Path, rows: &Rows) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let documents: Vec<&Value> = rows.values().collect();
    let data = serde_json::to_string_pretty(&documents)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".");
    tmp.push(TMP_SUFFIX);
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rent_object::RentObject;
    use rust_decimal_macros::dec;

    fn document(user: i64, name: &str, version: u64) -> Document {
        Document {
            user_id: UserId(user),
            version,
            rent_object: RentObject::new(name, "", dec!(10)),
        }
    }

    #[test]
    fn unique_index_rejects_duplicates() {
        let collection = JsonCollection::in_memory();
        collection.insert_one(document(1, "a", 0)).unwrap();

        assert_eq!(
            collection.insert_one(document(1, "a", 0)),
            Err(RentError::ObjectAlreadyExists)
        );
        collection.insert_one(document(2, "a", 0)).unwrap();
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn replace_checks_version() {
        let collection = JsonCollection::in_memory();
        collection.insert_one(document(1, "a", 0)).unwrap();
        let key = DocumentKey::new(UserId(1), "a");

        assert_eq!(
            collection.replace_one(&key, 3, document(1, "a", 4)),
            Err(RentError::ConcurrentModification)
        );
        collection.replace_one(&key, 0, document(1, "a", 1)).unwrap();
        assert_eq!(collection.find_one(&key).unwrap().unwrap().version, 1);
    }

    #[test]
    fn replace_can_rekey() {
        let collection = JsonCollection::in_memory();
        collection.insert_one(document(1, "a", 0)).unwrap();
        collection.insert_one(document(1, "c", 0)).unwrap();
        let key = DocumentKey::new(UserId(1), "a");

        assert_eq!(
            collection.replace_one(&key, 0, document(1, "c", 1)),
            Err(RentError::ObjectAlreadyExists)
        );
        collection.replace_one(&key, 0, document(1, "b", 1)).unwrap();

        assert_eq!(collection.find_one(&key).unwrap(), None);
        assert!(
            collection
                .find_one(&DocumentKey::new(UserId(1), "b"))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn replace_of_missing_document_is_object_not_found() {
        let collection = JsonCollection::in_memory();
        let key = DocumentKey::new(UserId(1), "a");
        assert_eq!(
            collection.replace_one(&key, 0, document(1, "a", 1)),
            Err(RentError::ObjectNotFound)
        );
    }

    #[test]
    fn find_filters_by_user() {
        let collection = JsonCollection::in_memory();
        collection.insert_one(document(1, "a", 0)).unwrap();
        collection.insert_one(document(2, "b", 0)).unwrap();
        collection.insert_one(document(1, "c", 0)).unwrap();

        let names: Vec<_> = collection
            .find(UserId(1))
            .unwrap()
            .into_iter()
            .map(|d| d.rent_object.name)
            .collect();

        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn delete_and_drop() {
        let collection = JsonCollection::in_memory();
        collection.insert_one(document(1, "a", 0)).unwrap();
        collection.insert_one(document(1, "b", 0)).unwrap();
        let key = DocumentKey::new(UserId(1), "a");

        assert!(collection.delete_one(&key).unwrap());
        assert!(!collection.delete_one(&key).unwrap());
        collection.drop_all().unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("objects.json");

        let collection = JsonCollection::open(&path).unwrap();
        collection.insert_one(document(1, "a", 0)).unwrap();
        drop(collection);

        let reopened = JsonCollection::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(
            reopened
                .find_one(&DocumentKey::new(UserId(1), "a"))
                .unwrap(),
            Some(document(1, "a", 0))
        );
    }

    #[test]
    fn corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            JsonCollection::open(&path),
            Err(RentError::Storage(_))
        ));
    }
}
