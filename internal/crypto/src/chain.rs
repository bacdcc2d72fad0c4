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

//! Chain-of-trust construction and validation.
//!
//! Starting at a leaf certificate, the validator repeatedly locates the
//! issuer among the provided certificates, verifies each signature link, and
//! stops when the path reaches a configured trust anchor. A well-formed
//! chain that never reaches an anchor is reported as a warning, not an
//! error; the policy decision belongs to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use veridoc_status_tracker::{log_item, validation_codes::*, StatusTracker, ValidationStatus};
use x509_parser::prelude::*;

use crate::{
    hash::sha256, raw_signature::validator_for_cert_alg, time::ClockSource,
    trust_anchor::TrustAnchorStore,
};

/// One certificate along a validated path.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChainLink {
    /// Subject distinguished name.
    pub subject: String,

    /// Serial number, uppercase hex.
    pub serial_hex: String,

    /// SHA-256 fingerprint of the DER encoding, uppercase hex.
    pub sha256_fingerprint: String,
}

/// Result of building and validating a chain of trust.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChainValidationResult {
    /// Overall chain verdict.
    pub status: ValidationStatus,

    /// The ordered path, from the leaf up to the last certificate examined.
    ///
    /// On failure this is the partial path walked before the break, kept
    /// for diagnostics.
    pub path: Vec<ChainLink>,

    /// `true` if the path ends at a configured trust anchor.
    pub trusted_root_reached: bool,
}

#[derive(Debug, Eq, Error, PartialEq)]
enum ChainError {
    #[error("certificate could not be parsed")]
    Malformed,

    #[error("signature link did not verify against the issuer key")]
    SignatureInvalid,

    #[error("no provided certificate matches the issuer name")]
    IssuerMissing,

    #[error("chain depth limit ({0}) exceeded")]
    DepthExceeded(usize),

    #[error("issuer certificate is outside its validity window")]
    IssuerNotValid,

    #[error("certificate is signed with an unsupported algorithm")]
    UnsupportedAlgorithm,
}

/// Builds and validates the trust chain from a leaf certificate up to a
/// configured trust-anchor set.
pub struct ChainValidator<'a> {
    anchors: &'a TrustAnchorStore,
    max_depth: usize,
    clock: &'a dyn ClockSource,
}

impl<'a> ChainValidator<'a> {
    /// Create a validator over the given anchor set.
    ///
    /// `max_depth` bounds the number of issuer hops walked from the leaf;
    /// the limit exists to stop unbounded or cyclic chains.
    pub fn new(anchors: &'a TrustAnchorStore, max_depth: usize, clock: &'a dyn ClockSource) -> Self {
        Self {
            anchors,
            max_depth,
            clock,
        }
    }

    /// Build the path from `leaf_der` through `provided_chain` and verify
    /// every link.
    pub fn build_and_validate(
        &self,
        leaf_der: &[u8],
        provided_chain: &[Vec<u8>],
        validation_log: &mut StatusTracker,
    ) -> ChainValidationResult {
        let mut log = StatusTracker::default();
        let result = self.walk(leaf_der, provided_chain, &mut log);
        let status = log.overall_status();
        validation_log.append(&log);

        ChainValidationResult {
            status,
            path: result.0,
            trusted_root_reached: result.1,
        }
    }

    fn walk(
        &self,
        leaf_der: &[u8],
        provided_chain: &[Vec<u8>],
        log: &mut StatusTracker,
    ) -> (Vec<ChainLink>, bool) {
        let now = self.clock.now();

        let Ok((_, leaf)) = X509Certificate::from_der(leaf_der) else {
            log_item!("chain", "leaf certificate could not be parsed", "build_and_validate")
                .validation_status(CERTIFICATE_MALFORMED)
                .failure_no_throw(log, ChainError::Malformed);
            return (vec![], false);
        };

        // Unparsable entries in the provided set are skipped; they can never
        // link anyway.
        let candidates: Vec<(&[u8], X509Certificate)> = provided_chain
            .iter()
            .filter_map(|der| {
                X509Certificate::from_der(der)
                    .ok()
                    .map(|(_, cert)| (der.as_slice(), cert))
            })
            .collect();

        let mut path = vec![link_for(leaf_der, &leaf)];
        let mut current_der = leaf_der;
        let mut current = leaf;

        loop {
            let label = current.subject().to_string();
            let fingerprint = hex::encode_upper(sha256(current_der));

            if self.anchors.contains_fingerprint(&fingerprint) {
                log_item!(label, "chain reached a configured trust anchor", "build_and_validate")
                    .validation_status(CHAIN_TRUSTED_ROOT_REACHED)
                    .success(log);
                return (path, true);
            }

            if current.subject().as_raw() == current.issuer().as_raw() {
                log_item!(
                    label,
                    "chain ends at a root that is not a configured trust anchor",
                    "build_and_validate"
                )
                .validation_status(CHAIN_UNTRUSTED_ROOT)
                .warning(log);
                return (path, false);
            }

            if path.len() > self.max_depth {
                log_item!(label, "chain depth limit exceeded", "build_and_validate")
                    .validation_status(CHAIN_DEPTH_EXCEEDED)
                    .failure_no_throw(log, ChainError::DepthExceeded(self.max_depth));
                return (path, false);
            }

            let issuer_candidates: Vec<&(&[u8], X509Certificate)> = candidates
                .iter()
                .filter(|(_, cand)| cand.subject().as_raw() == current.issuer().as_raw())
                .collect();

            if issuer_candidates.is_empty() {
                log_item!(
                    label,
                    "no provided certificate matches the issuer name",
                    "build_and_validate"
                )
                .validation_status(CHAIN_ISSUER_MISSING)
                .failure_no_throw(log, ChainError::IssuerMissing);
                return (path, false);
            }

            // Tie-break between same-name issuers: prefer the candidate whose
            // subject key id matches this certificate's authority key id.
            let aki = authority_key_id(&current);
            let selected = issuer_candidates
                .iter()
                .find(|(_, cand)| match (&aki, subject_key_id(cand)) {
                    (Some(aki), Some(ski)) => *aki == ski,
                    _ => false,
                })
                .copied()
                .unwrap_or(issuer_candidates[0]);

            let issuer_der: &[u8] = selected.0;
            let issuer: &X509Certificate = &selected.1;

            let Some(validator) = validator_for_cert_alg(&current.signature_algorithm.algorithm)
            else {
                log_item!(
                    label,
                    "certificate is signed with an unsupported algorithm",
                    "build_and_validate"
                )
                .validation_status(CHAIN_SIGNATURE_INVALID)
                .failure_no_throw(log, ChainError::UnsupportedAlgorithm);
                return (path, false);
            };

            if validator
                .validate(
                    &current.signature_value.data,
                    current.tbs_certificate.as_ref(),
                    issuer.public_key().raw,
                )
                .is_err()
            {
                log_item!(
                    label,
                    "signature link did not verify against the issuer key",
                    "build_and_validate"
                )
                .validation_status(CHAIN_SIGNATURE_INVALID)
                .failure_no_throw(log, ChainError::SignatureInvalid);
                return (path, false);
            }

            let issuer_validity_ok = x509_parser::time::ASN1Time::from_timestamp(now.timestamp())
                .map(|at| issuer.validity().is_valid_at(at))
                .unwrap_or(false);

            if !issuer_validity_ok {
                log_item!(
                    issuer.subject().to_string(),
                    "issuer certificate is outside its validity window",
                    "build_and_validate"
                )
                .validation_status(CHAIN_ISSUER_NOT_VALID)
                .failure_no_throw(log, ChainError::IssuerNotValid);
                return (path, false);
            }

            path.push(link_for(issuer_der, issuer));
            current_der = issuer_der;
            current = issuer.clone();
        }
    }
}

fn link_for(der: &[u8], cert: &X509Certificate) -> ChainLink {
    ChainLink {
        subject: cert.subject().to_string(),
        serial_hex: hex::encode_upper(cert.raw_serial()),
        sha256_fingerprint: hex::encode_upper(sha256(der)),
    }
}

fn authority_key_id(cert: &X509Certificate) -> Option<Vec<u8>> {
    cert.extensions().iter().find_map(|ext| {
        if let x509_parser::extensions::ParsedExtension::AuthorityKeyIdentifier(aki) =
            ext.parsed_extension()
        {
            aki.key_identifier.as_ref().map(|id| id.0.to_vec())
        } else {
            None
        }
    })
}

fn subject_key_id(cert: &X509Certificate) -> Option<Vec<u8>> {
    cert.extensions().iter().find_map(|ext| {
        if let x509_parser::extensions::ParsedExtension::SubjectKeyIdentifier(ski) =
            ext.parsed_extension()
        {
            Some(ski.0.to_vec())
        } else {
            None
        }
    })
}
