// Copyright 2024 Veridoc contributors. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Storage seam for raw certificate and signature payloads.
//!
//! This crate never assumes a specific storage medium; the surrounding
//! system supplies a [`SecureStorage`] implementation backed by whatever
//! engine it uses for archival records.

use std::{collections::HashMap, sync::RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle to a stored byte payload.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StorageLocator(pub String);

/// Describes errors reported by a [`SecureStorage`] backend.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum StorageError {
    /// No payload exists for the requested locator.
    #[error("no payload stored for locator ({0})")]
    NotFound(String),

    /// The storage backend reported an error.
    #[error("storage backend error ({0})")]
    Backend(String),
}

/// Persists raw byte payloads on behalf of the trust engine.
pub trait SecureStorage: Send + Sync {
    /// Store `bytes` under `key` and return a locator for later retrieval.
    fn store(&self, key: &str, bytes: &[u8]) -> Result<StorageLocator, StorageError>;

    /// Retrieve the payload previously stored under `locator`.
    fn retrieve(&self, locator: &StorageLocator) -> Result<Vec<u8>, StorageError>;
}

/// A [`SecureStorage`] that keeps payloads in process memory.
#[derive(Debug, Default)]
pub struct InMemorySecureStorage {
    payloads: RwLock<HashMap<String, Vec<u8>>>,
}

impl SecureStorage for InMemorySecureStorage {
    fn store(&self, key: &str, bytes: &[u8]) -> Result<StorageLocator, StorageError> {
        let mut payloads = self
            .payloads
            .write()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        payloads.insert(key.to_owned(), bytes.to_vec());
        Ok(StorageLocator(key.to_owned()))
    }

    fn retrieve(&self, locator: &StorageLocator) -> Result<Vec<u8>, StorageError> {
        let payloads = self
            .payloads
            .read()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        payloads
            .get(&locator.0)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(locator.0.clone()))
    }
}
