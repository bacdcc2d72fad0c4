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

//! Signature validation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use veridoc_status_tracker::{
    log_item, validation_codes::*, LogItem, StatusTracker, ValidationStatus,
};

use crate::{
    certificate::Certificate,
    raw_signature::validator_for_signing_alg,
    signature::{SignatureRecord, SignatureRecordId},
    time::ClockSource,
    time_stamp::{verify_time_stamp_reply, TimeStampError, TimeStampInfo},
    trust_anchor::TrustAnchorStore,
    validator::{
        CertificateValidationResult, CertificateValidator, KeyPurpose, TimestampPolicy,
        ValidationConfig,
    },
};

/// Aggregate verdict for one signature record.
#[derive(Clone, Debug)]
pub struct SignatureValidationResult {
    /// Worst-of aggregate of all sub-checks.
    pub status: ValidationStatus,

    /// Identity of the record validated.
    pub record: SignatureRecordId,

    /// Every sub-check outcome, in the order performed.
    pub log: Vec<LogItem>,

    /// When the validation ran.
    pub validated_at: DateTime<Utc>,

    /// The signer certificate's verdict, when that step was reached.
    pub certificate_result: Option<CertificateValidationResult>,

    /// The verified time stamp, when one was present and verifiable.
    pub timestamp: Option<TimeStampInfo>,
}

impl SignatureValidationResult {
    /// Plain-language reasons for every sub-check that was not valid.
    pub fn reasons(&self) -> Vec<String> {
        self.log
            .iter()
            .filter(|item| item.severity != ValidationStatus::Valid)
            .map(|item| item.description.to_string())
            .collect()
    }
}

/// The surrounding state a signature validation draws on.
pub struct SignatureValidationContext<'a> {
    /// The signer certificate recorded by the signature.
    pub certificate: &'a Certificate,

    /// Candidate pool for chain building, as raw DER.
    pub chain: &'a [Vec<u8>],

    /// Configured trust anchors.
    pub anchors: &'a TrustAnchorStore,

    /// Configured trusted time-stamping authorities.
    pub trusted_tsas: &'a TrustAnchorStore,

    /// Ancestors of this record, immediate parent first, each paired with
    /// its signer certificate.
    pub ancestors: &'a [(SignatureRecord, Certificate)],
}

#[derive(Debug, Eq, Error, PartialEq)]
enum SignatureCheckError {
    #[error("document was modified after signing")]
    DigestMismatch,

    #[error("signature value did not verify against the signer key")]
    SignatureMismatch,

    #[error("signer certificate does not match the one recorded at signing")]
    CertificateMismatch,

    #[error("signature algorithm is not supported")]
    UnsupportedAlgorithm,

    #[error("time stamp could not be verified")]
    TimeStamp,

    #[error("time stamp time is outside the signer certificate's validity")]
    TimeStampOutsideValidity,

    #[error("parent signature failed validation")]
    ParentInvalid,

    #[error("counter-signature nesting exceeds the supported depth")]
    ParentDepthExceeded,
}

/// Verifies an existing signature record end to end: document integrity,
/// cryptographic signature, signer certificate, time stamp, and parent
/// counter-signature chain.
pub struct SignatureValidator {
    cert_validator: Arc<CertificateValidator>,
    clock: Arc<dyn ClockSource>,
    config: ValidationConfig,
}

impl SignatureValidator {
    /// Create a validator over the shared certificate validator and clock.
    pub fn new(
        cert_validator: Arc<CertificateValidator>,
        clock: Arc<dyn ClockSource>,
        config: ValidationConfig,
    ) -> Self {
        Self {
            cert_validator,
            clock,
            config,
        }
    }

    /// Validate `record` against the document digest the caller recomputed.
    ///
    /// Validation is idempotent: with a frozen clock and unchanged
    /// revocation data, repeated calls produce identical results.
    pub fn validate(
        &self,
        record: &SignatureRecord,
        document_digest: &[u8],
        context: &SignatureValidationContext<'_>,
    ) -> SignatureValidationResult {
        let mut log = StatusTracker::default();
        let label = record.id.to_string();

        // A tampered document makes every other check moot; stop hard.
        if document_digest != record.document_digest.as_slice() {
            log_item!(
                label.clone(),
                "document modified after signing",
                "validate"
            )
            .validation_status(SIGNATURE_DIGEST_MISMATCH)
            .failure_no_throw(&mut log, SignatureCheckError::DigestMismatch);

            return self.finish(record, &log, None, None);
        }

        let certificate_result = self.check_signature_and_certificate(record, context, &mut log);
        let timestamp = self.check_time_stamp(record, context, &mut log);
        self.check_parents(record, context, &mut log);

        self.finish(record, &log, certificate_result, timestamp)
    }

    fn finish(
        &self,
        record: &SignatureRecord,
        log: &StatusTracker,
        certificate_result: Option<CertificateValidationResult>,
        timestamp: Option<TimeStampInfo>,
    ) -> SignatureValidationResult {
        SignatureValidationResult {
            status: log.overall_status(),
            record: record.id.clone(),
            log: log.logged_items().to_vec(),
            validated_at: self.clock.now(),
            certificate_result,
            timestamp,
        }
    }

    fn check_signature_and_certificate(
        &self,
        record: &SignatureRecord,
        context: &SignatureValidationContext<'_>,
        log: &mut StatusTracker,
    ) -> Option<CertificateValidationResult> {
        let label = record.id.to_string();
        let certificate = context.certificate;

        if certificate.sha256_fingerprint != record.certificate_fingerprint {
            log_item!(
                label.clone(),
                "signer certificate does not match the one recorded at signing",
                "validate"
            )
            .validation_status(SIGNATURE_MISMATCH)
            .failure_no_throw(log, SignatureCheckError::CertificateMismatch);
            return None;
        }

        match validator_for_signing_alg(record.signing_alg) {
            Some(validator) => {
                if validator
                    .validate(
                        &record.signature,
                        &record.document_digest,
                        &certificate.public_key_der,
                    )
                    .is_ok()
                {
                    log_item!(
                        label.clone(),
                        "signature verifies against the signer certificate",
                        "validate"
                    )
                    .validation_status(SIGNATURE_VALIDATED)
                    .success(log);
                } else {
                    log_item!(
                        label.clone(),
                        "signature value did not verify against the signer key",
                        "validate"
                    )
                    .validation_status(SIGNATURE_MISMATCH)
                    .failure_no_throw(log, SignatureCheckError::SignatureMismatch);
                }
            }
            None => {
                log_item!(
                    label.clone(),
                    format!(
                        "no validator available for signature algorithm {}",
                        record.signing_alg
                    ),
                    "validate"
                )
                .validation_status(SIGNATURE_MISMATCH)
                .indeterminate(log);
            }
        }

        let certificate_result = self.cert_validator.validate(
            certificate,
            context.chain,
            context.anchors,
            KeyPurpose::DigitalSignature,
        );

        for item in &certificate_result.log {
            log.add_non_error(item.clone());
        }

        Some(certificate_result)
    }

    fn check_time_stamp(
        &self,
        record: &SignatureRecord,
        context: &SignatureValidationContext<'_>,
        log: &mut StatusTracker,
    ) -> Option<TimeStampInfo> {
        let label = record.id.to_string();

        let Some(reply) = &record.timestamp_reply else {
            if record.level.requires_timestamp() {
                let description =
                    format!("level {} record carries no time stamp token", record.level);

                match self.config.timestamp_policy {
                    TimestampPolicy::Degraded => {
                        log_item!(label, description, "validate")
                            .validation_status(TIME_STAMP_MISSING)
                            .warning(log);
                    }
                    TimestampPolicy::Strict => {
                        log_item!(label, description, "validate")
                            .validation_status(TIME_STAMP_MISSING)
                            .indeterminate(log);
                    }
                }
            }
            return None;
        };

        match verify_time_stamp_reply(reply, &record.signature, context.trusted_tsas) {
            Ok(info) => {
                if !context.certificate.is_valid_at(info.gen_time) {
                    log_item!(
                        label,
                        "time stamp time is outside the signer certificate's validity window",
                        "validate"
                    )
                    .validation_status(TIME_STAMP_OUTSIDE_VALIDITY)
                    .failure_no_throw(log, SignatureCheckError::TimeStampOutsideValidity);
                    return Some(info);
                }

                log_item!(
                    label,
                    "time stamp verified against a trusted authority",
                    "validate"
                )
                .validation_status(TIME_STAMP_VALIDATED)
                .success(log);

                Some(info)
            }

            Err(TimeStampError::Untrusted) => {
                log_item!(
                    label,
                    "time stamp was not issued by a trusted authority",
                    "validate"
                )
                .validation_status(TIME_STAMP_UNTRUSTED)
                .failure_no_throw(log, SignatureCheckError::TimeStamp);
                None
            }

            Err(err) => {
                log_item!(
                    label,
                    format!("time stamp could not be verified ({err})"),
                    "validate"
                )
                .validation_status(TIME_STAMP_MISMATCH)
                .failure_no_throw(log, SignatureCheckError::TimeStamp);
                None
            }
        }
    }

    fn check_parents(
        &self,
        record: &SignatureRecord,
        context: &SignatureValidationContext<'_>,
        log: &mut StatusTracker,
    ) {
        if record.parent.is_none() {
            return;
        }

        let label = record.id.to_string();

        if context.ancestors.len() > self.config.max_counter_signature_depth {
            log_item!(
                label,
                "counter-signature nesting exceeds the supported depth",
                "validate"
            )
            .validation_status(SIGNATURE_PARENT_DEPTH_EXCEEDED)
            .failure_no_throw(log, SignatureCheckError::ParentDepthExceeded);
            return;
        }

        let Some((parent_record, parent_certificate)) = context.ancestors.first() else {
            log_item!(
                label,
                "parent signature record could not be resolved",
                "validate"
            )
            .validation_status(SIGNATURE_PARENT_INVALID)
            .failure_no_throw(log, SignatureCheckError::ParentInvalid);
            return;
        };

        // The counter-signature must bind the parent's signature value.
        let expected = record.digest_algorithm.digest(&parent_record.signature);
        if expected != record.document_digest {
            log_item!(
                label,
                "counter-signature does not bind the parent signature value",
                "validate"
            )
            .validation_status(SIGNATURE_PARENT_INVALID)
            .failure_no_throw(log, SignatureCheckError::ParentInvalid);
            return;
        }

        let parent_context = SignatureValidationContext {
            certificate: parent_certificate,
            chain: context.chain,
            anchors: context.anchors,
            trusted_tsas: context.trusted_tsas,
            ancestors: &context.ancestors[1..],
        };

        let parent_result = self.validate(
            parent_record,
            &parent_record.document_digest,
            &parent_context,
        );

        match parent_result.status {
            ValidationStatus::Valid | ValidationStatus::Warning => {
                log_item!(label, "parent signature validated", "validate").success(log);
            }
            _ => {
                log_item!(
                    label,
                    format!(
                        "parent signature failed validation ({})",
                        parent_result.status
                    ),
                    "validate"
                )
                .validation_status(SIGNATURE_PARENT_INVALID)
                .failure_no_throw(log, SignatureCheckError::ParentInvalid);
            }
        }
    }
}
