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

//! The trust-service facade the surrounding document workflow calls.
//!
//! Every operation returns structured result values; validation verdicts
//! are never raised as errors, so callers can branch on
//! [`ValidationStatus`] without knowing cryptographic internals.
//!
//! [`ValidationStatus`]: veridoc_status_tracker::ValidationStatus

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    certificate::{
        parse, Certificate, CertificateFormat, CertificateKey, CertificateStore, ExpiryNotice,
        FormatError,
    },
    revocation::RevocationChecker,
    raw_signature::RawSigner,
    signature::{
        DigestAlgorithm, DocumentKind, SignatureEngine, SignatureFormat, SignatureLevel,
        SignatureRecord, SignatureRecordId, SignatureValidationContext,
        SignatureValidationResult, SignatureValidator, SigningError, SigningRequest,
    },
    storage::SecureStorage,
    time::ClockSource,
    transport::{RevocationTransport, TimestampTransport},
    trust_anchor::TrustAnchorStore,
    validator::{CertificateValidationResult, CertificateValidator, ValidationConfig},
};

/// Describes failures of the facade operations themselves, as opposed to
/// validation verdicts, which are returned as structured results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// No certificate has been imported under the given key.
    #[error("no certificate imported under {0}")]
    UnknownCertificate(CertificateKey),

    /// No signature record exists under the given id.
    #[error("no signature record {0}")]
    UnknownSignature(SignatureRecordId),

    /// Certificate bytes could not be decoded.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Signing was refused or failed.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// An unexpected internal error.
    #[error("internal error ({0})")]
    Internal(String),
}

/// What an import produced.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ImportedCertificate {
    /// Key of the imported subject certificate.
    pub certificate: CertificateKey,

    /// Keys of the chain certificates carried by the same byte stream.
    pub chain: Vec<CertificateKey>,

    /// `true` if the byte stream also carried a private key (PKCS#12).
    pub has_private_key: bool,
}

/// Parameters for [`TrustServices::sign_document`].
#[derive(Clone, Debug)]
pub struct SignDocumentRequest {
    /// Key of the signing certificate.
    pub certificate: CertificateKey,

    /// The document content digest to sign.
    pub document_digest: Vec<u8>,

    /// Algorithm that produced the digest.
    pub digest_algorithm: DigestAlgorithm,

    /// Declared kind of the signed document.
    pub document_kind: DocumentKind,

    /// Container format; inferred from the document kind when absent.
    pub format: Option<SignatureFormat>,

    /// Evidence level to produce.
    pub level: SignatureLevel,

    /// Signature policy identifier (EPES and above).
    pub policy_id: Option<String>,

    /// TSA to request time stamps from (levels T and above).
    pub tsa_url: Option<String>,
}

/// Parameters for [`TrustServices::counter_sign`].
#[derive(Clone, Debug)]
pub struct CounterSignRequest {
    /// Key of the counter-signing certificate.
    pub certificate: CertificateKey,

    /// Digest algorithm used over the parent signature value.
    pub digest_algorithm: DigestAlgorithm,

    /// Container format; defaults to CAdES.
    pub format: Option<SignatureFormat>,

    /// Evidence level to produce.
    pub level: SignatureLevel,

    /// Signature policy identifier (EPES and above).
    pub policy_id: Option<String>,

    /// TSA to request time stamps from (levels T and above).
    pub tsa_url: Option<String>,
}

/// The digital trust and signature subsystem, assembled.
pub struct TrustServices {
    store: CertificateStore,
    anchors: TrustAnchorStore,
    trusted_tsas: TrustAnchorStore,
    records: RwLock<HashMap<SignatureRecordId, SignatureRecord>>,
    cert_validator: Arc<CertificateValidator>,
    engine: SignatureEngine,
    sig_validator: SignatureValidator,
    clock: Arc<dyn ClockSource>,
}

impl TrustServices {
    /// Assemble the subsystem over its external collaborators.
    ///
    /// `anchors` and `trusted_tsas` are the process-wide trust
    /// configuration, loaded once at startup.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ValidationConfig,
        anchors: TrustAnchorStore,
        trusted_tsas: TrustAnchorStore,
        revocation_transport: Arc<dyn RevocationTransport>,
        timestamp_transport: Arc<dyn TimestampTransport>,
        clock: Arc<dyn ClockSource>,
        storage: Option<Arc<dyn SecureStorage>>,
    ) -> Self {
        let revocation = Arc::new(RevocationChecker::new(
            revocation_transport,
            clock.clone(),
            config.revocation_ttl_secs,
            config.network_timeout_secs,
        ));

        let cert_validator = Arc::new(CertificateValidator::new(
            revocation,
            clock.clone(),
            config.clone(),
        ));

        let engine = SignatureEngine::new(
            cert_validator.clone(),
            timestamp_transport,
            clock.clone(),
            config.clone(),
        );

        let sig_validator =
            SignatureValidator::new(cert_validator.clone(), clock.clone(), config);

        let store = match storage {
            Some(storage) => CertificateStore::with_storage(storage),
            None => CertificateStore::new(),
        };

        Self {
            store,
            anchors,
            trusted_tsas,
            records: RwLock::new(HashMap::new()),
            cert_validator,
            engine,
            sig_validator,
            clock,
        }
    }

    /// Import a certificate (and any chain it carries) from raw bytes.
    pub fn import_certificate(
        &self,
        bytes: &[u8],
        format: CertificateFormat,
        password: Option<&str>,
    ) -> Result<ImportedCertificate, ServiceError> {
        let parsed = parse(bytes, format, password)?;

        let mut chain_keys = vec![];
        for der in &parsed.chain {
            let chain_cert = crate::certificate::decode_certificate(der)?;
            chain_keys.push(self.store.insert(chain_cert));
        }

        let key = self.store.insert(parsed.certificate);

        Ok(ImportedCertificate {
            certificate: key,
            chain: chain_keys,
            has_private_key: parsed.private_key_der.is_some(),
        })
    }

    /// Validate an imported certificate for the digital-signature purpose.
    ///
    /// The certificate's stored lifecycle status is updated to match the
    /// verdict.
    pub fn validate_certificate(
        &self,
        key: &CertificateKey,
    ) -> Result<CertificateValidationResult, ServiceError> {
        let certificate = self.certificate(key)?;
        let chain = self.store.all_ders();

        let result = self.cert_validator.validate(
            &certificate,
            &chain,
            &self.anchors,
            crate::validator::KeyPurpose::DigitalSignature,
        );

        self.store.set_status(key, result.certificate_status);
        Ok(result)
    }

    /// Sign a document digest and retain the produced record.
    pub fn sign_document(
        &self,
        request: SignDocumentRequest,
        signer: &dyn RawSigner,
    ) -> Result<SignatureRecord, ServiceError> {
        let certificate = self.certificate(&request.certificate)?;
        let chain = self.store.all_ders();

        let record = self.engine.sign(
            SigningRequest {
                certificate: &certificate,
                chain: &chain,
                document_digest: request.document_digest,
                digest_algorithm: request.digest_algorithm,
                document_kind: request.document_kind,
                format: request.format,
                level: request.level,
                policy_id: request.policy_id,
                tsa_url: request.tsa_url,
            },
            signer,
            &self.anchors,
        )?;

        self.insert_record(record.clone())?;
        Ok(record)
    }

    /// Counter-sign an existing signature record.
    ///
    /// The parent is re-validated first; a counter-signature is only
    /// produced over a parent whose fresh verdict passes.
    pub fn counter_sign(
        &self,
        parent: &SignatureRecordId,
        request: CounterSignRequest,
        signer: &dyn RawSigner,
    ) -> Result<SignatureRecord, ServiceError> {
        // Validation results age with revocation data, so the stored
        // verdict is never trusted here.
        let parent_digest = self.record(parent)?.document_digest.clone();
        self.validate_signature(parent, &parent_digest)?;

        let parent_record = self.record(parent)?;
        let certificate = self.certificate(&request.certificate)?;
        let chain = self.store.all_ders();

        let record = self.engine.counter_sign(
            &parent_record,
            SigningRequest {
                certificate: &certificate,
                chain: &chain,
                document_digest: vec![],
                digest_algorithm: request.digest_algorithm,
                document_kind: DocumentKind::Binary,
                format: request.format,
                level: request.level,
                policy_id: request.policy_id,
                tsa_url: request.tsa_url,
            },
            signer,
            &self.anchors,
        )?;

        self.insert_record(record.clone())?;
        Ok(record)
    }

    /// Validate a signature record against a freshly recomputed document
    /// digest.
    ///
    /// The record's `last_validation` is overwritten with the new result;
    /// repeated validation is idempotent while revocation data and the
    /// clock stand still.
    pub fn validate_signature(
        &self,
        id: &SignatureRecordId,
        document_digest: &[u8],
    ) -> Result<SignatureValidationResult, ServiceError> {
        let record = self.record(id)?;
        let certificate = self.certificate(&record.certificate)?;
        let chain = self.store.all_ders();
        let ancestors = self.resolve_ancestors(&record)?;

        let context = SignatureValidationContext {
            certificate: &certificate,
            chain: &chain,
            anchors: &self.anchors,
            trusted_tsas: &self.trusted_tsas,
            ancestors: &ancestors,
        };

        let result = self.sig_validator.validate(&record, document_digest, &context);

        let mut records = self
            .records
            .write()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if let Some(stored) = records.get_mut(id) {
            stored.last_validation = Some(result.clone());
        }

        Ok(result)
    }

    /// Certificates whose validity window ends within `within_days`.
    pub fn check_upcoming_expirations(&self, within_days: i64) -> Vec<ExpiryNotice> {
        self.store
            .upcoming_expirations(within_days, self.clock.as_ref())
    }

    /// The certificate store backing this facade.
    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    /// Look up a retained signature record.
    pub fn signature_record(&self, id: &SignatureRecordId) -> Option<SignatureRecord> {
        self.records.read().ok()?.get(id).cloned()
    }

    fn certificate(&self, key: &CertificateKey) -> Result<Certificate, ServiceError> {
        self.store
            .get(key)
            .ok_or_else(|| ServiceError::UnknownCertificate(key.clone()))
    }

    fn record(&self, id: &SignatureRecordId) -> Result<SignatureRecord, ServiceError> {
        self.records
            .read()
            .map_err(|e| ServiceError::Internal(e.to_string()))?
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownSignature(id.clone()))
    }

    fn insert_record(&self, record: SignatureRecord) -> Result<(), ServiceError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        records.insert(record.id.clone(), record);
        Ok(())
    }

    // Walk parent references, immediate parent first. The nesting guard in
    // the signature validator bounds how deep this list is examined.
    fn resolve_ancestors(
        &self,
        record: &SignatureRecord,
    ) -> Result<Vec<(SignatureRecord, Certificate)>, ServiceError> {
        let mut ancestors = vec![];
        let mut next = record.parent.clone();
        let mut seen = vec![record.id.clone()];

        while let Some(parent_id) = next {
            if seen.contains(&parent_id) {
                return Err(ServiceError::Internal(
                    "cycle in counter-signature parents".to_string(),
                ));
            }
            seen.push(parent_id.clone());

            let parent = self.record(&parent_id)?;
            let parent_cert = self.certificate(&parent.certificate)?;
            next = parent.parent.clone();
            ancestors.push((parent, parent_cert));
        }

        Ok(ancestors)
    }
}
