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

use veridoc_status_tracker::{validation_codes::*, ValidationStatus};

use crate::{
    raw_signature::{signer_from_cert_chain_and_private_key, RawSigner, SigningAlg},
    revocation::RevocationChecker,
    signature::{
        required_evidence, DigestAlgorithm, DocumentKind, SignatureEngine, SignatureFormat,
        SignatureLevel, SignatureValidationContext, SignatureValidator, SigningError,
        SigningRequest,
    },
    tests::test_utils::*,
    time::ClockSource,
    validator::{CertificateValidator, TimestampPolicy, ValidationConfig},
};

fn engine_and_validator(
    revocation_transport: Arc<FakeRevocationTransport>,
    ts_transport: Arc<FakeTimestampTransport>,
    clock: Arc<dyn ClockSource>,
    timestamp_policy: TimestampPolicy,
) -> (SignatureEngine, SignatureValidator) {
    let config = ValidationConfig {
        timestamp_policy,
        timestamp_nonce: false,
        ..ValidationConfig::default()
    };

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
        ts_transport,
        clock.clone(),
        config.clone(),
    );
    let validator = SignatureValidator::new(cert_validator, clock, config);

    (engine, validator)
}

fn ed_signer() -> Box<dyn RawSigner> {
    signer_from_cert_chain_and_private_key(SIGNER_ED_PEM, SIGNER_ED_KEY, SigningAlg::Ed25519)
        .unwrap()
}

fn bes_request<'a>(certificate: &'a crate::certificate::Certificate, chain: &'a [Vec<u8>]) -> SigningRequest<'a> {
    SigningRequest {
        certificate,
        chain,
        document_digest: DOCUMENT_DIGEST.to_vec(),
        digest_algorithm: DigestAlgorithm::Sha256,
        document_kind: DocumentKind::Binary,
        format: None,
        level: SignatureLevel::Bes,
        policy_id: None,
        tsa_url: None,
    }
}

#[test]
fn bes_sign_then_validate_round_trips() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, validator) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 9, 1),
        TimestampPolicy::Strict,
    );

    let record = engine
        .sign(bes_request(&signer_cert, &chain), ed_signer().as_ref(), &anchors)
        .unwrap();

    // Ed25519 is deterministic; the signature matches the fixture exactly.
    assert_eq!(record.signature, ED_SIGNATURE.to_vec());
    assert_eq!(record.format, SignatureFormat::CAdES);
    assert_eq!(record.level, SignatureLevel::Bes);
    assert!(record.timestamp_reply.is_none());
    assert!(record.parent.is_none());

    let tsas = trusted_tsas();
    let context = SignatureValidationContext {
        certificate: &signer_cert,
        chain: &chain,
        anchors: &anchors,
        trusted_tsas: &tsas,
        ancestors: &[],
    };

    let result = validator.validate(&record, DOCUMENT_DIGEST, &context);
    assert_eq!(result.status, ValidationStatus::Valid);
    assert!(result.timestamp.is_none());
}

#[test]
fn tampered_digest_is_a_hard_stop() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, validator) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 9, 1),
        TimestampPolicy::Strict,
    );

    let record = engine
        .sign(bes_request(&signer_cert, &chain), ed_signer().as_ref(), &anchors)
        .unwrap();

    let tsas = trusted_tsas();
    let context = SignatureValidationContext {
        certificate: &signer_cert,
        chain: &chain,
        anchors: &anchors,
        trusted_tsas: &tsas,
        ancestors: &[],
    };

    let tampered = crate::hash::sha256(b"a different document");
    let result = validator.validate(&record, &tampered, &context);

    assert_eq!(result.status, ValidationStatus::Invalid);
    assert!(result
        .reasons()
        .iter()
        .any(|r| r.contains("document modified after signing")));

    // Remaining checks are skipped once tampering is established.
    assert_eq!(result.log.len(), 1);
}

#[test]
fn validation_is_idempotent_under_a_frozen_clock() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, validator) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 9, 1),
        TimestampPolicy::Strict,
    );

    let record = engine
        .sign(bes_request(&signer_cert, &chain), ed_signer().as_ref(), &anchors)
        .unwrap();

    let tsas = trusted_tsas();
    let context = SignatureValidationContext {
        certificate: &signer_cert,
        chain: &chain,
        anchors: &anchors,
        trusted_tsas: &tsas,
        ancestors: &[],
    };

    let first = validator.validate(&record, DOCUMENT_DIGEST, &context);
    let second = validator.validate(&record, DOCUMENT_DIGEST, &context);

    assert_eq!(first.status, second.status);
    assert_eq!(first.validated_at, second.validated_at);
    assert_eq!(first.log.len(), second.log.len());
    for (a, b) in first.log.iter().zip(second.log.iter()) {
        assert_eq!(a.validation_status, b.validation_status);
        assert_eq!(a.severity, b.severity);
    }
}

#[test]
fn t_level_embeds_and_verifies_a_time_stamp() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, validator) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::with_reply(TS_REPLY),
        clock_at(2026, 9, 1),
        TimestampPolicy::Strict,
    );

    let request = SigningRequest {
        level: SignatureLevel::T,
        tsa_url: Some("http://tsa.veridoc.test/".to_string()),
        ..bes_request(&signer_cert, &chain)
    };

    let record = engine.sign(request, ed_signer().as_ref(), &anchors).unwrap();
    assert!(record.timestamp_reply.is_some());

    let tsas = trusted_tsas();
    let context = SignatureValidationContext {
        certificate: &signer_cert,
        chain: &chain,
        anchors: &anchors,
        trusted_tsas: &tsas,
        ancestors: &[],
    };

    let result = validator.validate(&record, DOCUMENT_DIGEST, &context);
    assert_eq!(result.status, ValidationStatus::Valid);

    let info = result.timestamp.unwrap();
    assert_eq!(info.gen_time.format("%Y-%m-%d").to_string(), "2026-08-07");
}

#[test]
fn t_level_strict_fails_when_tsa_unreachable() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, _) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 9, 1),
        TimestampPolicy::Strict,
    );

    let request = SigningRequest {
        level: SignatureLevel::T,
        tsa_url: Some("http://tsa.veridoc.test/".to_string()),
        ..bes_request(&signer_cert, &chain)
    };

    let err = engine
        .sign(request, ed_signer().as_ref(), &anchors)
        .unwrap_err();
    assert!(matches!(err, SigningError::TimestampAuthority(_)));
}

#[test]
fn t_level_degraded_signs_without_a_time_stamp() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, validator) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 9, 1),
        TimestampPolicy::Degraded,
    );

    let request = SigningRequest {
        level: SignatureLevel::T,
        tsa_url: Some("http://tsa.veridoc.test/".to_string()),
        ..bes_request(&signer_cert, &chain)
    };

    let record = engine.sign(request, ed_signer().as_ref(), &anchors).unwrap();
    assert!(record.timestamp_reply.is_none());

    let tsas = trusted_tsas();
    let context = SignatureValidationContext {
        certificate: &signer_cert,
        chain: &chain,
        anchors: &anchors,
        trusted_tsas: &tsas,
        ancestors: &[],
    };

    let result = validator.validate(&record, DOCUMENT_DIGEST, &context);
    assert_eq!(result.status, ValidationStatus::Warning);
    assert!(result
        .log
        .iter()
        .any(|item| item.validation_status.as_deref() == Some(TIME_STAMP_MISSING)));
}

#[test]
fn epes_requires_a_policy_identifier() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, _) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 9, 1),
        TimestampPolicy::Strict,
    );

    let request = SigningRequest {
        level: SignatureLevel::Epes,
        ..bes_request(&signer_cert, &chain)
    };

    let err = engine
        .sign(request, ed_signer().as_ref(), &anchors)
        .unwrap_err();
    assert!(matches!(err, SigningError::Precondition(_)));
}

#[test]
fn ten_byte_digest_signs_at_bes_without_a_tsa() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, validator) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 9, 1),
        TimestampPolicy::Strict,
    );

    let request = SigningRequest {
        document_digest: vec![7u8; 10],
        ..bes_request(&signer_cert, &chain)
    };

    let record = engine.sign(request, ed_signer().as_ref(), &anchors).unwrap();
    assert!(record.timestamp_reply.is_none());

    let tsas = trusted_tsas();
    let context = SignatureValidationContext {
        certificate: &signer_cert,
        chain: &chain,
        anchors: &anchors,
        trusted_tsas: &tsas,
        ancestors: &[],
    };

    let result = validator.validate(&record, &[7u8; 10], &context);
    assert_eq!(result.status, ValidationStatus::Valid);
}

#[test]
fn empty_digest_is_rejected_before_any_crypto() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, _) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 9, 1),
        TimestampPolicy::Strict,
    );

    let request = SigningRequest {
        document_digest: vec![],
        ..bes_request(&signer_cert, &chain)
    };

    let err = engine
        .sign(request, ed_signer().as_ref(), &anchors)
        .unwrap_err();
    assert!(matches!(err, SigningError::Precondition(_)));
}

#[test]
fn signing_with_a_rejected_certificate_fails_before_any_crypto() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    // The RSA signer certificate is expired at this clock.
    let signer_cert = cert(SIGNER_RSA_DER);
    let (engine, _) = engine_and_validator(
        FakeRevocationTransport::with_crl(CRL_DER),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 2, 1),
        TimestampPolicy::Strict,
    );

    let err = engine
        .sign(bes_request(&signer_cert, &chain), ed_signer().as_ref(), &anchors)
        .unwrap_err();

    match err {
        SigningError::CertificateRejected { status, reasons } => {
            assert_eq!(status, ValidationStatus::Invalid);
            assert!(reasons.iter().any(|r| r.contains("expired")));
        }
        other => panic!("expected certificate rejection, got {other:?}"),
    }
}

#[test]
fn counter_sign_builds_on_a_validated_parent() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, validator) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 9, 1),
        TimestampPolicy::Strict,
    );

    let mut parent = engine
        .sign(bes_request(&signer_cert, &chain), ed_signer().as_ref(), &anchors)
        .unwrap();

    let tsas = trusted_tsas();
    let context = SignatureValidationContext {
        certificate: &signer_cert,
        chain: &chain,
        anchors: &anchors,
        trusted_tsas: &tsas,
        ancestors: &[],
    };
    parent.last_validation = Some(validator.validate(&parent, DOCUMENT_DIGEST, &context));

    let counter_request = SigningRequest {
        document_digest: vec![],
        ..bes_request(&signer_cert, &chain)
    };

    let counter = engine
        .counter_sign(&parent, counter_request, ed_signer().as_ref(), &anchors)
        .unwrap();

    assert_eq!(counter.parent, Some(parent.id.clone()));
    assert_eq!(
        counter.document_digest,
        DigestAlgorithm::Sha256.digest(&parent.signature)
    );

    let ancestors = vec![(parent.clone(), signer_cert.clone())];
    let counter_context = SignatureValidationContext {
        certificate: &signer_cert,
        chain: &chain,
        anchors: &anchors,
        trusted_tsas: &tsas,
        ancestors: &ancestors,
    };

    let result = validator.validate(&counter, &counter.document_digest.clone(), &counter_context);
    assert_eq!(result.status, ValidationStatus::Valid);
}

#[test]
fn counter_sign_refuses_an_unvalidated_parent() {
    let chain = chain_pool();
    let anchors = anchors_with_root();
    let signer_cert = cert(SIGNER_ED_DER);
    let (engine, _) = engine_and_validator(
        FakeRevocationTransport::unavailable(),
        FakeTimestampTransport::unavailable(),
        clock_at(2026, 9, 1),
        TimestampPolicy::Strict,
    );

    let parent = engine
        .sign(bes_request(&signer_cert, &chain), ed_signer().as_ref(), &anchors)
        .unwrap();

    let counter_request = SigningRequest {
        document_digest: vec![],
        ..bes_request(&signer_cert, &chain)
    };

    let err = engine
        .counter_sign(&parent, counter_request, ed_signer().as_ref(), &anchors)
        .unwrap_err();
    assert!(matches!(err, SigningError::ParentNotValid { status: None }));
}

#[test]
fn evidence_table_is_monotonic_across_levels() {
    for format in [
        SignatureFormat::CAdES,
        SignatureFormat::PAdES,
        SignatureFormat::XAdES,
    ] {
        let bes = required_evidence(format, SignatureLevel::Bes);
        assert!(!bes.policy_id && !bes.timestamp && !bes.revocation_data);

        let epes = required_evidence(format, SignatureLevel::Epes);
        assert!(epes.policy_id && !epes.timestamp);

        let t = required_evidence(format, SignatureLevel::T);
        assert!(t.timestamp && !t.revocation_data);

        let lt = required_evidence(format, SignatureLevel::Lt);
        assert!(lt.timestamp && lt.revocation_data && !lt.archive_timestamp);

        let lta = required_evidence(format, SignatureLevel::Lta);
        assert!(lta.timestamp && lta.revocation_data && lta.archive_timestamp);
    }
}

#[test]
fn format_is_inferred_from_the_document_kind() {
    assert_eq!(
        SignatureFormat::infer_from(DocumentKind::Pdf),
        SignatureFormat::PAdES
    );
    assert_eq!(
        SignatureFormat::infer_from(DocumentKind::Xml),
        SignatureFormat::XAdES
    );
    assert_eq!(
        SignatureFormat::infer_from(DocumentKind::Binary),
        SignatureFormat::CAdES
    );
}
