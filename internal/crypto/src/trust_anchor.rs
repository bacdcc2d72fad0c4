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

//! Configured trust anchors.
//!
//! A `TrustAnchorStore` holds the root certificates the chain validator
//! accepts as ends of a trust path. The set is loaded once at startup and
//! passed by reference into validation calls, never consulted through
//! ambient state, so tests can substitute a synthetic anchor set. The same
//! type also holds the trusted time-stamping authority certificates.

use std::collections::HashSet;

use x509_parser::pem::Pem;

use crate::{certificate::FormatError, hash::sha256};

/// A set of certificates explicitly marked as roots of trust.
#[derive(Debug, Default)]
pub struct TrustAnchorStore {
    anchor_ders: Vec<Vec<u8>>,
    fingerprints: HashSet<String>,
}

impl TrustAnchorStore {
    /// Create an empty store with no configured anchors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read zero or more X.509 certificates in PEM format and accept each as
    /// a trust anchor. Returns the number of anchors added.
    pub fn add_anchors_from_pem(&mut self, anchor_pems: &[u8]) -> Result<usize, FormatError> {
        let mut added = 0;

        for maybe_pem in Pem::iter_from_buffer(anchor_pems) {
            match maybe_pem {
                Ok(pem) => {
                    if pem.label == "CERTIFICATE" {
                        self.add_anchor_der(pem.contents);
                        added += 1;
                    }
                }
                Err(e) => {
                    return Err(FormatError::UnexpectedFormat(e.to_string()));
                }
            }
        }

        Ok(added)
    }

    /// Accept a single DER-encoded certificate as a trust anchor.
    pub fn add_anchor_der(&mut self, anchor_der: Vec<u8>) {
        self.fingerprints
            .insert(hex::encode_upper(sha256(&anchor_der)));
        self.anchor_ders.push(anchor_der);
    }

    /// Return `true` if a certificate with this SHA-256 fingerprint
    /// (uppercase hex) is a configured anchor.
    pub fn contains_fingerprint(&self, sha256_fingerprint: &str) -> bool {
        self.fingerprints.contains(sha256_fingerprint)
    }

    /// Return an iterator over the configured anchors in DER format.
    pub fn anchor_ders(&self) -> impl Iterator<Item = &'_ Vec<u8>> {
        self.anchor_ders.iter()
    }

    /// Number of configured anchors.
    pub fn len(&self) -> usize {
        self.anchor_ders.len()
    }

    /// Return `true` if no anchors are configured.
    pub fn is_empty(&self) -> bool {
        self.anchor_ders.is_empty()
    }

    /// Remove all configured anchors.
    pub fn clear(&mut self) {
        self.anchor_ders.clear();
        self.fingerprints.clear();
    }
}
