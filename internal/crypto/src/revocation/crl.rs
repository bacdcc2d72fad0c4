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

use chrono::{DateTime, Utc};
use thiserror::Error;
use x509_parser::prelude::*;

use crate::{
    certificate::Certificate, raw_signature::validator_for_cert_alg,
    revocation::RevocationStatus,
};

/// Describes why a downloaded CRL could not be used.
#[derive(Debug, Eq, Error, PartialEq)]
pub(crate) enum CrlError {
    #[error("malformed CRL ({0})")]
    Malformed(String),

    #[error("CRL issuer does not match the certificate issuer")]
    WrongIssuer,

    #[error("CRL signature did not verify against the issuer key")]
    SignatureInvalid,

    #[error("CRL is signed with an unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("CRL is past its nextUpdate time")]
    Stale,
}

/// Scan a DER-encoded CRL for the certificate's serial.
///
/// When `issuer` is available, the CRL signature is verified before any
/// entry is trusted.
pub(crate) fn status_for_certificate(
    crl_der: &[u8],
    certificate: &Certificate,
    issuer: Option<&Certificate>,
    now: DateTime<Utc>,
) -> Result<RevocationStatus, CrlError> {
    let (_rem, crl) = CertificateRevocationList::from_der(crl_der)
        .map_err(|e| CrlError::Malformed(e.to_string()))?;

    if crl.issuer().as_raw() != certificate.issuer_raw.as_slice() {
        return Err(CrlError::WrongIssuer);
    }

    if let Some(issuer) = issuer {
        let validator = validator_for_cert_alg(&crl.signature_algorithm.algorithm)
            .ok_or(CrlError::UnsupportedAlgorithm)?;

        validator
            .validate(
                &crl.signature_value.data,
                crl.tbs_cert_list.as_ref(),
                &issuer.public_key_der,
            )
            .map_err(|_| CrlError::SignatureInvalid)?;
    }

    if let Some(next_update) = crl.next_update() {
        if next_update.timestamp() < now.timestamp() {
            return Err(CrlError::Stale);
        }
    }

    for revoked in crl.iter_revoked_certificates() {
        if !serials_match(revoked.raw_serial(), &certificate.serial) {
            continue;
        }

        let at = DateTime::<Utc>::from_timestamp(revoked.revocation_date.timestamp(), 0);
        let reason = revoked
            .reason_code()
            .map(|(_critical, code)| format!("{code:?}"));

        return Ok(RevocationStatus::Revoked { at, reason });
    }

    Ok(RevocationStatus::Good)
}

// DER integers may carry a leading zero octet to keep the value positive.
fn serials_match(a: &[u8], b: &[u8]) -> bool {
    strip_leading_zeros(a) == strip_leading_zeros(b)
}

fn strip_leading_zeros(serial: &[u8]) -> &[u8] {
    let mut s = serial;
    while s.len() > 1 && s[0] == 0 {
        s = &s[1..];
    }
    s
}
