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
    certificate::CertificateStatus,
    revocation::RevocationChecker,
    tests::test_utils::*,
    time::ClockSource,
    validator::{CertificateValidator, KeyPurpose, ValidationConfig},
};

fn validator(
    transport: Arc<FakeRevocationTransport>,
    clock: Arc<dyn ClockSource>,
) -> CertificateValidator {
    let config = ValidationConfig::default();
    let revocation = Arc::new(RevocationChecker::new(
        transport,
        clock.clone(),
        config.revocation_ttl_secs,
        config.network_timeout_secs,
    ));
    CertificateValidator::new(revocation, clock, config)
}

fn has_code(result: &crate::validator::CertificateValidationResult, code: &str) -> bool {
    result
        .log
        .iter()
        .any(|item| item.validation_status.as_deref() == Some(code))
}

#[test]
fn certificate_inside_window_validates() {
    // 2024-01-01..2026-01-01 certificate, clock frozen at 2025-06-01.
    let validator = validator(
        FakeRevocationTransport::with_crl(CRL_DER),
        clock_at(2025, 6, 1),
    );

    let result = validator.validate(
        &cert(SIGNER_RSA_DER),
        &chain_pool(),
        &anchors_with_root(),
        KeyPurpose::DigitalSignature,
    );

    assert_eq!(result.status, ValidationStatus::Valid);
    assert!(result.chain.trusted_root_reached);
    assert_eq!(result.certificate_status, CertificateStatus::Valid);
    assert!(has_code(&result, CERTIFICATE_VALIDITY_OK));
    assert!(has_code(&result, REVOCATION_GOOD));
}

#[test]
fn expired_certificate_is_invalid() {
    // Same certificate, clock frozen after its notAfter.
    let validator = validator(
        FakeRevocationTransport::with_crl(CRL_DER),
        clock_at(2026, 2, 1),
    );

    let result = validator.validate(
        &cert(SIGNER_RSA_DER),
        &chain_pool(),
        &anchors_with_root(),
        KeyPurpose::DigitalSignature,
    );

    assert_eq!(result.status, ValidationStatus::Invalid);
    assert_eq!(result.certificate_status, CertificateStatus::Expired);
    assert!(has_code(&result, CERTIFICATE_EXPIRED));
    assert!(result.reasons().iter().any(|r| r.contains("expired")));
}

#[test]
fn certificate_before_window_is_invalid() {
    let validator = validator(
        FakeRevocationTransport::with_crl(CRL_DER),
        clock_at(2023, 12, 1),
    );

    let result = validator.validate(
        &cert(SIGNER_RSA_DER),
        &chain_pool(),
        &anchors_with_root(),
        KeyPurpose::DigitalSignature,
    );

    assert_eq!(result.status, ValidationStatus::Invalid);
    assert!(has_code(&result, CERTIFICATE_NOT_YET_VALID));
}

#[test]
fn certificate_expiring_soon_warns() {
    // Seventeen days before notAfter, inside the default 30-day window.
    let validator = validator(
        FakeRevocationTransport::with_crl(CRL_DER),
        clock_at(2025, 12, 15),
    );

    let result = validator.validate(
        &cert(SIGNER_RSA_DER),
        &chain_pool(),
        &anchors_with_root(),
        KeyPurpose::DigitalSignature,
    );

    assert_eq!(result.status, ValidationStatus::Warning);
    assert_eq!(result.certificate_status, CertificateStatus::Valid);
    assert!(has_code(&result, CERTIFICATE_EXPIRING_SOON));
}

#[test]
fn revoked_certificate_is_invalid() {
    let validator = validator(
        FakeRevocationTransport::with_crl(CRL_DER),
        clock_at(2025, 6, 1),
    );

    let result = validator.validate(
        &cert(REVOKED_DER),
        &chain_pool(),
        &anchors_with_root(),
        KeyPurpose::DigitalSignature,
    );

    assert_eq!(result.status, ValidationStatus::Invalid);
    assert_eq!(result.certificate_status, CertificateStatus::Revoked);
    assert!(has_code(&result, CERTIFICATE_REVOKED));
}

#[test]
fn ca_certificate_cannot_sign_documents() {
    let validator = validator(
        FakeRevocationTransport::with_crl(CRL_DER),
        clock_at(2025, 6, 1),
    );

    // The issuing CA carries only keyCertSign/cRLSign.
    let result = validator.validate(
        &cert(ISSUING_DER),
        &[ROOT_DER.to_vec()],
        &anchors_with_root(),
        KeyPurpose::DigitalSignature,
    );

    assert_eq!(result.status, ValidationStatus::Invalid);
    assert!(has_code(&result, CERTIFICATE_KEY_USAGE_INVALID));

    // But it passes for the certificate-signing purpose.
    let result = validator.validate(
        &cert(ISSUING_DER),
        &[ROOT_DER.to_vec()],
        &anchors_with_root(),
        KeyPurpose::CertificateSigning,
    );
    assert_eq!(result.status, ValidationStatus::Valid);
}

#[test]
fn no_revocation_source_does_not_degrade_the_verdict() {
    let validator = validator(
        FakeRevocationTransport::unavailable(),
        clock_at(2025, 6, 1),
    );

    // The Ed25519 signer names no CRL or OCSP source at all.
    let result = validator.validate(
        &cert(SIGNER_ED_DER),
        &chain_pool(),
        &anchors_with_root(),
        KeyPurpose::DigitalSignature,
    );

    assert_eq!(result.status, ValidationStatus::Valid);
    assert!(has_code(&result, REVOCATION_SOURCE_MISSING));
    assert!(result.revocation.is_empty());
}

#[test]
fn unreachable_revocation_source_degrades_to_indeterminate() {
    let validator = validator(
        FakeRevocationTransport::unavailable(),
        clock_at(2025, 6, 1),
    );

    let result = validator.validate(
        &cert(SIGNER_RSA_DER),
        &chain_pool(),
        &anchors_with_root(),
        KeyPurpose::DigitalSignature,
    );

    assert_eq!(result.status, ValidationStatus::Indeterminate);
    assert!(has_code(&result, REVOCATION_INDETERMINATE));
}

#[test]
fn untrusted_chain_demotes_to_warning() {
    let validator = validator(
        FakeRevocationTransport::with_crl(CRL_DER),
        clock_at(2025, 6, 1),
    );

    let result = validator.validate(
        &cert(SIGNER_RSA_DER),
        &chain_pool(),
        &crate::trust_anchor::TrustAnchorStore::new(),
        KeyPurpose::DigitalSignature,
    );

    assert_eq!(result.status, ValidationStatus::Warning);
    assert!(!result.chain.trusted_root_reached);
}
