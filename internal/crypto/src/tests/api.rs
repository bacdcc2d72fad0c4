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

use std::sync::Arc;

use veridoc_status_tracker::ValidationStatus;

use crate::{
    api::{CounterSignRequest, ServiceError, SignDocumentRequest, TrustServices},
    certificate::{CertificateFormat, CertificateKey, CertificateStatus},
    hash::sha256,
    raw_signature::{signer_from_cert_chain_and_private_key, SigningAlg},
    signature::{DigestAlgorithm, DocumentKind, SignatureLevel},
    tests::test_utils::*,
    time::ClockSource,
    validator::ValidationConfig,
};

fn services(clock: Arc<dyn ClockSource>) -> TrustServices {
    TrustServices::new(
        ValidationConfig {
            timestamp_nonce: false,
            ..ValidationConfig::default()
        },
        anchors_with_root(),
        trusted_tsas(),
        FakeRevocationTransport::with_crl(CRL_DER),
        FakeTimestampTransport::with_reply(TS_REPLY),
        clock,
        None,
    )
}

fn import_bundle(services: &TrustServices, leaf_pem: &[u8]) -> CertificateKey {
    let mut bundle = leaf_pem.to_vec();
    bundle.extend_from_slice(ISSUING_PEM);
    bundle.extend_from_slice(ROOT_PEM);

    services
        .import_certificate(&bundle, CertificateFormat::Pem, None)
        .unwrap()
        .certificate
}

#[test]
fn import_records_leaf_and_chain() {
    let services = services(clock_at(2025, 6, 1));

    let mut bundle = SIGNER_RSA_PEM.to_vec();
    bundle.extend_from_slice(ISSUING_PEM);
    bundle.extend_from_slice(ROOT_PEM);

    let imported = services
        .import_certificate(&bundle, CertificateFormat::Pem, None)
        .unwrap();

    assert_eq!(imported.chain.len(), 2);
    assert!(!imported.has_private_key);
    assert_eq!(services.store().len(), 3);
}

#[test]
fn certificate_valid_midway_through_its_window() {
    // Certificate valid 2024-01-01..2026-01-01, clock at 2025-06-01.
    let services = services(clock_at(2025, 6, 1));
    let key = import_bundle(&services, SIGNER_RSA_PEM);

    let result = services.validate_certificate(&key).unwrap();

    assert_eq!(result.status, ValidationStatus::Valid);
    assert!(result.chain.trusted_root_reached);
    assert_eq!(
        services.store().get(&key).unwrap().status,
        CertificateStatus::Valid
    );
}

#[test]
fn certificate_expired_after_its_window() {
    // Same certificate, clock at 2026-02-01.
    let services = services(clock_at(2026, 2, 1));
    let key = import_bundle(&services, SIGNER_RSA_PEM);

    let result = services.validate_certificate(&key).unwrap();

    assert_eq!(result.status, ValidationStatus::Invalid);
    assert!(result.reasons().iter().any(|r| r.contains("expired")));
    assert_eq!(
        services.store().get(&key).unwrap().status,
        CertificateStatus::Expired
    );
}

#[test]
fn revoked_certificate_surfaces_through_the_facade() {
    let services = services(clock_at(2025, 6, 1));

    let mut bundle = Vec::new();
    bundle.extend_from_slice(include_bytes!("fixtures/revoked.pem"));
    bundle.extend_from_slice(ISSUING_PEM);
    bundle.extend_from_slice(ROOT_PEM);

    let key = services
        .import_certificate(&bundle, CertificateFormat::Pem, None)
        .unwrap()
        .certificate;

    let result = services.validate_certificate(&key).unwrap();

    assert_eq!(result.status, ValidationStatus::Invalid);
    assert_eq!(
        services.store().get(&key).unwrap().status,
        CertificateStatus::Revoked
    );
}

#[test]
fn validating_an_unknown_certificate_is_an_error_not_a_verdict() {
    let services = services(clock_at(2025, 6, 1));

    let bogus = CertificateKey {
        issuer: "CN=Nobody".to_string(),
        serial_hex: "00".to_string(),
    };

    assert!(matches!(
        services.validate_certificate(&bogus),
        Err(ServiceError::UnknownCertificate(_))
    ));
}

#[test]
fn sign_validate_and_tamper_via_the_facade() {
    let services = services(clock_at(2025, 6, 1));
    let key = import_bundle(&services, SIGNER_RSA_PEM);

    let digest = sha256(b"archival record body");
    let signer =
        signer_from_cert_chain_and_private_key(SIGNER_RSA_PEM, SIGNER_RSA_KEY, SigningAlg::Ps256)
            .unwrap();

    let record = services
        .sign_document(
            SignDocumentRequest {
                certificate: key,
                document_digest: digest.clone(),
                digest_algorithm: DigestAlgorithm::Sha256,
                document_kind: DocumentKind::Binary,
                format: None,
                level: SignatureLevel::Bes,
                policy_id: None,
                tsa_url: None,
            },
            signer.as_ref(),
        )
        .unwrap();

    assert!(record.timestamp_reply.is_none());

    // Round trip: the same digest validates.
    let result = services.validate_signature(&record.id, &digest).unwrap();
    assert_eq!(result.status, ValidationStatus::Valid);

    // The verdict is cached on the record (and only the verdict).
    let stored = services.signature_record(&record.id).unwrap();
    assert_eq!(
        stored.last_validation.map(|v| v.status),
        Some(ValidationStatus::Valid)
    );
    assert_eq!(stored.signature, record.signature);

    // Tamper detection: a different digest never validates.
    let tampered = sha256(b"altered record body");
    let result = services.validate_signature(&record.id, &tampered).unwrap();
    assert_eq!(result.status, ValidationStatus::Invalid);
    assert!(result
        .reasons()
        .iter()
        .any(|r| r.contains("document modified after signing")));
}

#[test]
fn counter_sign_via_the_facade() {
    let services = services(clock_at(2025, 6, 1));
    let rsa_key = import_bundle(&services, SIGNER_RSA_PEM);
    let ed_key = import_bundle(&services, SIGNER_ED_PEM);

    let digest = sha256(b"archival record body");
    let rsa_signer =
        signer_from_cert_chain_and_private_key(SIGNER_RSA_PEM, SIGNER_RSA_KEY, SigningAlg::Ps256)
            .unwrap();

    let parent = services
        .sign_document(
            SignDocumentRequest {
                certificate: rsa_key,
                document_digest: digest,
                digest_algorithm: DigestAlgorithm::Sha256,
                document_kind: DocumentKind::Binary,
                format: None,
                level: SignatureLevel::Bes,
                policy_id: None,
                tsa_url: None,
            },
            rsa_signer.as_ref(),
        )
        .unwrap();

    let ed_signer =
        signer_from_cert_chain_and_private_key(SIGNER_ED_PEM, SIGNER_ED_KEY, SigningAlg::Ed25519)
            .unwrap();

    let counter = services
        .counter_sign(
            &parent.id,
            CounterSignRequest {
                certificate: ed_key,
                digest_algorithm: DigestAlgorithm::Sha256,
                format: None,
                level: SignatureLevel::Bes,
                policy_id: None,
                tsa_url: None,
            },
            ed_signer.as_ref(),
        )
        .unwrap();

    assert_eq!(counter.parent, Some(parent.id.clone()));

    // Counter-signing re-validated the parent.
    let stored_parent = services.signature_record(&parent.id).unwrap();
    assert!(stored_parent.last_validation.is_some());

    // Validating the counter-signature also validates its parent chain.
    let result = services
        .validate_signature(&counter.id, &counter.document_digest)
        .unwrap();
    assert_eq!(result.status, ValidationStatus::Valid);
}

#[test]
fn t_level_signing_through_the_facade_attaches_a_token() {
    // Long-lived Ed25519 signer; clock past the token's genTime so the
    // token falls inside the certificate window.
    let services = services(clock_at(2026, 9, 1));
    let ed_key = import_bundle(&services, SIGNER_ED_PEM);

    let ed_signer =
        signer_from_cert_chain_and_private_key(SIGNER_ED_PEM, SIGNER_ED_KEY, SigningAlg::Ed25519)
            .unwrap();

    let record = services
        .sign_document(
            SignDocumentRequest {
                certificate: ed_key,
                document_digest: DOCUMENT_DIGEST.to_vec(),
                digest_algorithm: DigestAlgorithm::Sha256,
                document_kind: DocumentKind::Binary,
                format: None,
                level: SignatureLevel::T,
                policy_id: None,
                tsa_url: Some("http://tsa.veridoc.test/".to_string()),
            },
            ed_signer.as_ref(),
        )
        .unwrap();

    assert!(record.timestamp_reply.is_some());

    let result = services
        .validate_signature(&record.id, DOCUMENT_DIGEST)
        .unwrap();

    assert_eq!(result.status, ValidationStatus::Valid);
    assert!(result.timestamp.is_some());
}

#[test]
fn expirations_are_reported_within_the_requested_window() {
    let services = services(clock_at(2025, 12, 15));
    import_bundle(&services, SIGNER_RSA_PEM);

    let notices = services.check_upcoming_expirations(30);

    assert_eq!(notices.len(), 1);
    assert!(notices[0].subject.contains("signer_rsa"));

    assert!(services.check_upcoming_expirations(5).is_empty());
}
