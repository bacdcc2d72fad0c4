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

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    certificate::{Certificate, CertificateKey, CertificateStatus},
    storage::SecureStorage,
    time::ClockSource,
};

/// A certificate approaching the end of its validity window.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ExpiryNotice {
    /// Key of the expiring certificate.
    pub certificate: CertificateKey,

    /// Subject distinguished name, for display.
    pub subject: String,

    /// End of the validity window.
    pub not_after: DateTime<Utc>,

    /// Whole days remaining; zero or negative once expired.
    pub days_remaining: i64,
}

/// In-memory index of imported certificates, keyed by (issuer DN, serial).
///
/// Raw DER payloads are spilled to a [`SecureStorage`] backend when one is
/// configured; the index itself is process memory. Records are never
/// deleted, only superseded.
pub struct CertificateStore {
    certs: RwLock<HashMap<CertificateKey, Certificate>>,
    storage: Option<Arc<dyn SecureStorage>>,
}

impl CertificateStore {
    /// Create an empty store with no storage backend.
    pub fn new() -> Self {
        Self {
            certs: RwLock::new(HashMap::new()),
            storage: None,
        }
    }

    /// Create an empty store that spills raw DER payloads to `storage`.
    pub fn with_storage(storage: Arc<dyn SecureStorage>) -> Self {
        Self {
            certs: RwLock::new(HashMap::new()),
            storage: Some(storage),
        }
    }

    /// Insert a certificate, returning its key.
    ///
    /// Re-importing the same (issuer, serial) replaces the previous record;
    /// last writer wins.
    pub fn insert(&self, certificate: Certificate) -> CertificateKey {
        let key = certificate.key();

        if let Some(storage) = &self.storage {
            let storage_key = format!("certificate/{}/{}", key.issuer, key.serial_hex);
            if let Err(err) = storage.store(&storage_key, &certificate.der) {
                log::warn!("could not persist certificate payload: {err}");
            }
        }

        if let Ok(mut certs) = self.certs.write() {
            certs.insert(key.clone(), certificate);
        }

        key
    }

    /// Look up a certificate by key.
    pub fn get(&self, key: &CertificateKey) -> Option<Certificate> {
        self.certs.read().ok()?.get(key).cloned()
    }

    /// Look up a certificate by its SHA-256 fingerprint (uppercase hex).
    pub fn find_by_fingerprint(&self, sha256_fingerprint: &str) -> Option<Certificate> {
        let certs = self.certs.read().ok()?;
        certs
            .values()
            .find(|c| c.sha256_fingerprint == sha256_fingerprint)
            .cloned()
    }

    /// Update the mutable status field of a stored certificate.
    pub fn set_status(&self, key: &CertificateKey, status: CertificateStatus) {
        if let Ok(mut certs) = self.certs.write() {
            if let Some(cert) = certs.get_mut(key) {
                cert.status = status;
            }
        }
    }

    /// Insert a renewed certificate that supersedes `predecessor`.
    ///
    /// The predecessor record is kept; the new record references it.
    pub fn supersede(
        &self,
        predecessor: &CertificateKey,
        mut renewal: Certificate,
    ) -> CertificateKey {
        renewal.renews = Some(predecessor.clone());
        self.insert(renewal)
    }

    /// Return the DER encodings of every stored certificate.
    ///
    /// This is the candidate pool the chain validator searches for issuer
    /// links.
    pub fn all_ders(&self) -> Vec<Vec<u8>> {
        match self.certs.read() {
            Ok(certs) => certs.values().map(|c| c.der.clone()).collect(),
            Err(_) => vec![],
        }
    }

    /// Number of stored certificates.
    pub fn len(&self) -> usize {
        self.certs.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Return `true` if no certificates have been imported.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return certificates whose validity window ends within `within_days`
    /// of the clock's notion of now, soonest first.
    ///
    /// Superseded certificates (those another record renews) and already
    /// expired certificates are skipped.
    pub fn upcoming_expirations(
        &self,
        within_days: i64,
        clock: &dyn ClockSource,
    ) -> Vec<ExpiryNotice> {
        let now = clock.now();

        let certs = match self.certs.read() {
            Ok(certs) => certs,
            Err(_) => return vec![],
        };

        let superseded: Vec<CertificateKey> =
            certs.values().filter_map(|c| c.renews.clone()).collect();

        let mut notices: Vec<ExpiryNotice> = certs
            .iter()
            .filter(|(key, cert)| {
                let days = cert.days_until_expiry(now);
                days >= 0 && days <= within_days && !superseded.contains(key)
            })
            .map(|(key, cert)| ExpiryNotice {
                certificate: key.clone(),
                subject: cert.subject.clone(),
                not_after: cert.not_after,
                days_remaining: cert.days_until_expiry(now),
            })
            .collect();

        notices.sort_by_key(|n| n.not_after);
        notices
    }
}

impl Default for CertificateStore {
    fn default() -> Self {
        Self::new()
    }
}
