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

//! Signature creation.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use veridoc_status_tracker::ValidationStatus;

use crate::{
    certificate::Certificate,
    raw_signature::{RawSigner, RawSignerError},
    signature::{
        required_evidence, DigestAlgorithm, DocumentKind, SignatureFormat, SignatureLevel,
        SignatureRecord, SignatureRecordId,
    },
    time::ClockSource,
    time_stamp::{self, TimeStampError},
    transport::TimestampTransport,
    trust_anchor::TrustAnchorStore,
    validator::{CertificateValidator, KeyPurpose, TimestampPolicy, ValidationConfig},
};

/// Everything needed to create one signature.
pub struct SigningRequest<'a> {
    /// The signing certificate.
    pub certificate: &'a Certificate,

    /// Candidate pool for the signing certificate's chain, as raw DER.
    pub chain: &'a [Vec<u8>],

    /// The document content digest to sign.
    pub document_digest: Vec<u8>,

    /// Algorithm that produced `document_digest`.
    pub digest_algorithm: DigestAlgorithm,

    /// Declared kind of the signed document.
    pub document_kind: DocumentKind,

    /// Container format; inferred from `document_kind` when absent.
    pub format: Option<SignatureFormat>,

    /// Evidence level to produce.
    pub level: SignatureLevel,

    /// Signature policy identifier, required for EPES and above.
    pub policy_id: Option<String>,

    /// TSA to request time stamps from, for levels T and above.
    pub tsa_url: Option<String>,
}

/// Describes why signing was refused or failed.
///
/// Signing preconditions are checked before any cryptographic operation;
/// when an error is returned, no partial record has been produced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SigningError {
    /// A precondition failed before any cryptographic operation.
    #[error("signing precondition failed: {0}")]
    Precondition(String),

    /// The signing certificate did not pass validation.
    #[error("certificate failed validation ({status})")]
    CertificateRejected {
        /// The certificate's aggregate verdict.
        status: ValidationStatus,

        /// Plain-language reasons for the rejection.
        reasons: Vec<String>,
    },

    /// The counter-signature parent is not currently valid.
    #[error("parent signature is not valid")]
    ParentNotValid {
        /// The parent's last verdict, if one exists.
        status: Option<ValidationStatus>,
    },

    /// A required time stamp could not be obtained (strict policy).
    #[error("time stamp authority request failed: {0}")]
    TimestampAuthority(#[from] TimeStampError),

    /// The raw signer failed.
    #[error(transparent)]
    Signer(#[from] RawSignerError),
}

/// Creates signatures over document digests, requesting time stamps and
/// capturing revocation evidence as the requested level demands.
pub struct SignatureEngine {
    cert_validator: Arc<CertificateValidator>,
    ts_transport: Arc<dyn TimestampTransport>,
    clock: Arc<dyn ClockSource>,
    config: ValidationConfig,
}

impl SignatureEngine {
    /// Create an engine over the shared certificate validator, TSA
    /// transport, and clock.
    pub fn new(
        cert_validator: Arc<CertificateValidator>,
        ts_transport: Arc<dyn TimestampTransport>,
        clock: Arc<dyn ClockSource>,
        config: ValidationConfig,
    ) -> Self {
        Self {
            cert_validator,
            ts_transport,
            clock,
            config,
        }
    }

    /// Sign a document digest.
    ///
    /// The certificate must pass validation for the digital-signature
    /// purpose before any cryptographic operation happens. For levels T and
    /// above a time stamp is requested from the configured TSA; whether a
    /// TSA failure aborts signing or degrades the record is governed by the
    /// configured [`TimestampPolicy`].
    pub fn sign(
        &self,
        request: SigningRequest<'_>,
        signer: &dyn RawSigner,
        anchors: &TrustAnchorStore,
    ) -> Result<SignatureRecord, SigningError> {
        self.sign_impl(request, signer, anchors, None)
    }

    /// Counter-sign an existing signature.
    ///
    /// The parent's most recent validation must be a passing verdict; the
    /// caller is expected to have re-validated the parent immediately
    /// before calling, since validation results age as revocation data
    /// does. The produced record signs a digest of the parent's signature
    /// value and references the parent.
    pub fn counter_sign(
        &self,
        parent: &SignatureRecord,
        request: SigningRequest<'_>,
        signer: &dyn RawSigner,
        anchors: &TrustAnchorStore,
    ) -> Result<SignatureRecord, SigningError> {
        let parent_status = parent.last_validation.as_ref().map(|v| v.status);

        match parent_status {
            Some(ValidationStatus::Valid) | Some(ValidationStatus::Warning) => {}
            _ => {
                return Err(SigningError::ParentNotValid {
                    status: parent_status,
                });
            }
        }

        let counter_digest = request.digest_algorithm.digest(&parent.signature);

        let request = SigningRequest {
            document_digest: counter_digest,
            ..request
        };

        self.sign_impl(request, signer, anchors, Some(parent.id.clone()))
    }

    fn sign_impl(
        &self,
        request: SigningRequest<'_>,
        signer: &dyn RawSigner,
        anchors: &TrustAnchorStore,
        parent: Option<SignatureRecordId>,
    ) -> Result<SignatureRecord, SigningError> {
        // The digest is opaque caller-supplied content identity; only an
        // absent one is rejected.
        if request.document_digest.is_empty() {
            return Err(SigningError::Precondition(
                "document digest is empty".to_string(),
            ));
        }

        let format = request
            .format
            .unwrap_or_else(|| SignatureFormat::infer_from(request.document_kind));
        let evidence = required_evidence(format, request.level);

        if evidence.policy_id && request.policy_id.is_none() {
            return Err(SigningError::Precondition(format!(
                "{format} level {} requires a signature policy identifier",
                request.level
            )));
        }

        let validation = self.cert_validator.validate(
            request.certificate,
            request.chain,
            anchors,
            KeyPurpose::DigitalSignature,
        );

        if !matches!(
            validation.status,
            ValidationStatus::Valid | ValidationStatus::Warning
        ) {
            return Err(SigningError::CertificateRejected {
                status: validation.status,
                reasons: validation.reasons(),
            });
        }

        let signature = signer.sign(&request.document_digest)?;

        let timestamp_reply = if evidence.timestamp {
            self.obtain_time_stamp(request.tsa_url.as_deref(), &signature)?
        } else {
            None
        };

        let archive_timestamp_reply = if evidence.archive_timestamp {
            // The archive stamp covers the signature plus its first token.
            let mut archived = signature.clone();
            if let Some(reply) = &timestamp_reply {
                archived.extend_from_slice(reply);
            }
            self.obtain_time_stamp(request.tsa_url.as_deref(), &archived)?
        } else {
            None
        };

        let revocation_evidence = if evidence.revocation_data {
            validation.revocation.clone()
        } else {
            vec![]
        };

        Ok(SignatureRecord {
            id: SignatureRecordId {
                digest_hex: hex::encode(&request.document_digest),
                certificate_serial_hex: request.certificate.serial_hex(),
            },
            document_digest: request.document_digest,
            digest_algorithm: request.digest_algorithm,
            certificate: request.certificate.key(),
            certificate_fingerprint: request.certificate.sha256_fingerprint.clone(),
            format,
            level: request.level,
            policy_id: request.policy_id,
            signing_alg: signer.alg(),
            signature,
            signed_at: self.clock.now(),
            timestamp_reply: timestamp_reply.map(serde_bytes::ByteBuf::from),
            archive_timestamp_reply: archive_timestamp_reply.map(serde_bytes::ByteBuf::from),
            revocation_evidence,
            parent,
            last_validation: None,
        })
    }

    // A time stamp failure aborts the whole operation under the strict
    // policy; under the degraded policy the record is produced without a
    // token.
    fn obtain_time_stamp(
        &self,
        tsa_url: Option<&str>,
        message: &[u8],
    ) -> Result<Option<Vec<u8>>, SigningError> {
        let timeout = Duration::from_secs(self.config.network_timeout_secs);

        let attempt = match tsa_url {
            Some(url) => time_stamp::request_time_stamp(
                self.ts_transport.as_ref(),
                url,
                message,
                timeout,
                self.config.timestamp_nonce,
            ),
            None => Err(TimeStampError::InternalError(
                "no time stamp authority configured".to_string(),
            )),
        };

        match attempt {
            Ok(reply) => Ok(Some(reply)),
            Err(err) => match self.config.timestamp_policy {
                TimestampPolicy::Strict => Err(err.into()),
                TimestampPolicy::Degraded => {
                    log::warn!("proceeding without time stamp: {err}");
                    Ok(None)
                }
            },
        }
    }
}
