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

//! Overall certificate validation.
//!
//! [`CertificateValidator`] is the single authoritative answer to "is this
//! certificate usable": it composes the validity-window check, the
//! key-usage check for the requested purpose, the revocation checker, and
//! the chain validator, and aggregates their outcomes worst-of.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use veridoc_status_tracker::{
    log_item, validation_codes::*, LogItem, StatusTracker, ValidationStatus,
};

use crate::{
    certificate::{decode_certificate, Certificate, CertificateKey, CertificateStatus},
    chain::{ChainValidationResult, ChainValidator},
    revocation::{RevocationChecker, RevocationOutcome, RevocationStatus},
    time::ClockSource,
    trust_anchor::TrustAnchorStore,
};

/// What the caller intends to use the certificate for.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPurpose {
    /// Signing archival records. Accepts the digitalSignature or
    /// nonRepudiation key-usage bits, or the codeSigning / emailProtection
    /// extended usages.
    DigitalSignature,

    /// Issuing other certificates.
    CertificateSigning,

    /// Issuing RFC 3161 time stamp tokens.
    TimeStamping,
}

/// How to proceed when a required time stamp cannot be obtained.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    /// Fail the operation; nothing is persisted.
    #[default]
    Strict,

    /// Proceed without the time stamp and report a warning.
    Degraded,
}

/// Tunable limits and windows for validation and signing.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Days before expiry at which validation starts reporting a warning.
    pub warning_window_days: i64,

    /// Maximum number of issuer hops the chain validator will walk.
    pub max_chain_depth: usize,

    /// Seconds a revocation determination stays cached.
    pub revocation_ttl_secs: u64,

    /// Seconds allowed for each CRL, OCSP, or TSA network call.
    pub network_timeout_secs: u64,

    /// Behavior when a required time stamp cannot be obtained.
    pub timestamp_policy: TimestampPolicy,

    /// Whether time stamp requests carry a nonce.
    pub timestamp_nonce: bool,

    /// Maximum counter-signature nesting depth validated.
    pub max_counter_signature_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            warning_window_days: 30,
            max_chain_depth: 10,
            revocation_ttl_secs: 3600,
            network_timeout_secs: 10,
            timestamp_policy: TimestampPolicy::default(),
            timestamp_nonce: true,
            max_counter_signature_depth: 5,
        }
    }
}

/// Overall verdict for one certificate.
#[derive(Clone, Debug)]
pub struct CertificateValidationResult {
    /// Worst-of aggregate of all sub-checks.
    pub status: ValidationStatus,

    /// Key of the certificate validated.
    pub certificate: CertificateKey,

    /// Chain-of-trust outcome.
    pub chain: ChainValidationResult,

    /// Per-source revocation outcomes.
    pub revocation: Vec<RevocationOutcome>,

    /// Every sub-check outcome, in the order performed.
    pub log: Vec<LogItem>,

    /// When the validation ran.
    pub validated_at: DateTime<Utc>,

    /// The lifecycle status this validation implies for the certificate.
    pub certificate_status: CertificateStatus,
}

impl CertificateValidationResult {
    /// Plain-language reasons for every sub-check that was not valid.
    pub fn reasons(&self) -> Vec<String> {
        self.log
            .iter()
            .filter(|item| item.severity != ValidationStatus::Valid)
            .map(|item| item.description.to_string())
            .collect()
    }
}

#[derive(Debug, Eq, Error, PartialEq)]
enum CertificateCheckError {
    #[error("the certificate is not yet valid")]
    NotYetValid,

    #[error("the certificate has expired")]
    Expired,

    #[error("the certificate has been revoked")]
    Revoked,

    #[error("the certificate's key usage does not permit this purpose")]
    KeyUsage,
}

/// Composes the window, key-usage, revocation, and chain checks into one
/// verdict.
pub struct CertificateValidator {
    revocation: Arc<RevocationChecker>,
    clock: Arc<dyn ClockSource>,
    config: ValidationConfig,
}

impl CertificateValidator {
    /// Create a validator over the shared revocation checker and clock.
    pub fn new(
        revocation: Arc<RevocationChecker>,
        clock: Arc<dyn ClockSource>,
        config: ValidationConfig,
    ) -> Self {
        Self {
            revocation,
            clock,
            config,
        }
    }

    /// Validate `certificate` for `purpose`.
    ///
    /// `provided_chain` is the candidate pool for issuer links; `anchors`
    /// is the configured trust-anchor set.
    pub fn validate(
        &self,
        certificate: &Certificate,
        provided_chain: &[Vec<u8>],
        anchors: &TrustAnchorStore,
        purpose: KeyPurpose,
    ) -> CertificateValidationResult {
        let now = self.clock.now();
        let mut log = StatusTracker::default();
        let label = certificate.key().to_string();

        self.check_validity_window(certificate, now, &label, &mut log);
        check_key_usage(certificate, purpose, &label, &mut log);
        let revocation = self.check_revocation(certificate, provided_chain, &label, &mut log);

        let chain = ChainValidator::new(anchors, self.config.max_chain_depth, self.clock.as_ref())
            .build_and_validate(&certificate.der, provided_chain, &mut log);

        let status = log.overall_status();
        let certificate_status = implied_status(certificate, &revocation, now, status);

        CertificateValidationResult {
            status,
            certificate: certificate.key(),
            chain,
            revocation,
            log: log.logged_items().to_vec(),
            validated_at: now,
            certificate_status,
        }
    }

    fn check_validity_window(
        &self,
        certificate: &Certificate,
        now: DateTime<Utc>,
        label: &str,
        log: &mut StatusTracker,
    ) {
        if now < certificate.not_before {
            log_item!(
                label.to_string(),
                format!(
                    "certificate is not valid before {}",
                    certificate.not_before.format("%Y-%m-%d")
                ),
                "validate"
            )
            .validation_status(CERTIFICATE_NOT_YET_VALID)
            .failure_no_throw(log, CertificateCheckError::NotYetValid);
            return;
        }

        if now > certificate.not_after {
            log_item!(
                label.to_string(),
                format!(
                    "certificate expired on {}",
                    certificate.not_after.format("%Y-%m-%d")
                ),
                "validate"
            )
            .validation_status(CERTIFICATE_EXPIRED)
            .failure_no_throw(log, CertificateCheckError::Expired);
            return;
        }

        let days_remaining = certificate.days_until_expiry(now);
        if days_remaining <= self.config.warning_window_days {
            log_item!(
                label.to_string(),
                format!("certificate expires in {days_remaining} days"),
                "validate"
            )
            .validation_status(CERTIFICATE_EXPIRING_SOON)
            .warning(log);
            return;
        }

        log_item!(
            label.to_string(),
            "certificate is within its validity window",
            "validate"
        )
        .validation_status(CERTIFICATE_VALIDITY_OK)
        .success(log);
    }

    fn check_revocation(
        &self,
        certificate: &Certificate,
        provided_chain: &[Vec<u8>],
        label: &str,
        log: &mut StatusTracker,
    ) -> Vec<RevocationOutcome> {
        if !certificate.has_revocation_source() {
            // Nothing to consult is not a degraded outcome; certificates
            // without revocation infrastructure still validate cleanly.
            log_item!(
                label.to_string(),
                "certificate names no revocation source",
                "validate"
            )
            .validation_status(REVOCATION_SOURCE_MISSING)
            .informational(log);
            return vec![];
        }

        let issuer = provided_chain
            .iter()
            .find(|der| {
                decode_certificate(der)
                    .map(|c| c.subject_raw == certificate.issuer_raw)
                    .unwrap_or(false)
            })
            .and_then(|der| decode_certificate(der).ok());

        let outcomes = self.revocation.check(certificate, issuer.as_ref());

        match RevocationChecker::combined_status(&outcomes) {
            RevocationStatus::Revoked { at, reason } => {
                let when = at
                    .map(|at| format!(" at {}", at.format("%Y-%m-%d %H:%M:%S")))
                    .unwrap_or_default();
                let why = reason.map(|r| format!(" ({r})")).unwrap_or_default();

                log_item!(
                    label.to_string(),
                    format!("certificate was revoked{when}{why}"),
                    "validate"
                )
                .validation_status(CERTIFICATE_REVOKED)
                .failure_no_throw(log, CertificateCheckError::Revoked);
            }

            RevocationStatus::Good => {
                log_item!(
                    label.to_string(),
                    "no revocation source reports the certificate as revoked",
                    "validate"
                )
                .validation_status(REVOCATION_GOOD)
                .success(log);
            }

            RevocationStatus::Indeterminate { reason } => {
                log_item!(
                    label.to_string(),
                    format!("revocation status could not be determined: {reason}"),
                    "validate"
                )
                .validation_status(REVOCATION_INDETERMINATE)
                .indeterminate(log);
            }
        }

        outcomes
    }
}

fn check_key_usage(
    certificate: &Certificate,
    purpose: KeyPurpose,
    label: &str,
    log: &mut StatusTracker,
) {
    let ku = &certificate.key_usage;
    let eku = &certificate.extended_key_usage;

    let permitted = match purpose {
        KeyPurpose::DigitalSignature => {
            ku.digital_signature
                || ku.non_repudiation
                || eku.code_signing
                || eku.email_protection
        }
        KeyPurpose::CertificateSigning => ku.key_cert_sign,
        KeyPurpose::TimeStamping => eku.time_stamping,
    };

    if permitted {
        log_item!(
            label.to_string(),
            format!("key usage permits {purpose:?}"),
            "validate"
        )
        .validation_status(CERTIFICATE_KEY_USAGE_OK)
        .success(log);
    } else {
        log_item!(
            label.to_string(),
            format!("key usage does not permit {purpose:?}"),
            "validate"
        )
        .validation_status(CERTIFICATE_KEY_USAGE_INVALID)
        .failure_no_throw(log, CertificateCheckError::KeyUsage);
    }
}

fn implied_status(
    certificate: &Certificate,
    revocation: &[RevocationOutcome],
    now: DateTime<Utc>,
    overall: ValidationStatus,
) -> CertificateStatus {
    if RevocationChecker::combined_status(revocation).is_revoked() {
        return CertificateStatus::Revoked;
    }

    if now > certificate.not_after {
        return CertificateStatus::Expired;
    }

    match overall {
        ValidationStatus::Valid | ValidationStatus::Warning => CertificateStatus::Valid,
        _ => CertificateStatus::Unknown,
    }
}
