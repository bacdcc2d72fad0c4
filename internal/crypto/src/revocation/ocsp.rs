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
use rasn::prelude::*;
use rasn_ocsp::{BasicOcspResponse, CertStatus, OcspResponseStatus};
use rasn_pkix::Certificate as PkixCertificate;
use thiserror::Error;

use crate::{
    certificate::Certificate,
    hash::sha1,
    raw_signature::{oids, validator_for_rasn_algs},
    revocation::RevocationStatus,
};

/// Describes why an OCSP exchange could not produce a determination.
#[derive(Debug, Eq, Error, PartialEq)]
pub(crate) enum OcspError {
    #[error("malformed OCSP structure ({0})")]
    Malformed(String),

    #[error("OCSP responder answered with a non-successful status")]
    Unsuccessful,

    #[error("OCSP response carries no entry for the certificate")]
    NoMatchingResponse,

    #[error("OCSP response signature did not verify")]
    SignatureInvalid,

    #[error("OCSP response is signed with an unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("OCSP response is outside its validity interval")]
    Stale,
}

pub(crate) struct OcspAssessment {
    pub(crate) status: RevocationStatus,
    pub(crate) next_update: Option<DateTime<Utc>>,
}

/// Build a DER-encoded OCSP request binding the certificate's serial to its
/// issuer's name and key hashes (SHA-1 CertID, as responders expect).
pub(crate) fn build_request(
    certificate: &Certificate,
    issuer: &Certificate,
) -> Result<Vec<u8>, OcspError> {
    let req_cert = expected_cert_id(certificate, issuer)?;

    let ocsp_req = rasn_ocsp::Request {
        req_cert,
        single_request_extensions: None,
    };

    let tbs_request = rasn_ocsp::TbsRequest {
        version: rasn_ocsp::Version::from(0u8),
        requestor_name: None,
        request_list: vec![ocsp_req],
        request_extensions: None,
    };

    let ocsp_request = rasn_ocsp::OcspRequest {
        tbs_request,
        optional_signature: None,
    };

    rasn::der::encode(&ocsp_request).map_err(|e| OcspError::Malformed(e.to_string()))
}

/// Interpret a DER-encoded OCSP response for the certificate.
///
/// The response signature must verify against a certificate carried in the
/// response or against the issuer itself, and the matching single response
/// must be inside its validity interval at `now`.
pub(crate) fn assess_response(
    response_der: &[u8],
    certificate: &Certificate,
    issuer: &Certificate,
    now: DateTime<Utc>,
) -> Result<OcspAssessment, OcspError> {
    let ocsp_response: rasn_ocsp::OcspResponse =
        rasn::der::decode(response_der).map_err(|e| OcspError::Malformed(e.to_string()))?;

    if ocsp_response.status != OcspResponseStatus::Successful {
        return Err(OcspError::Unsuccessful);
    }

    let response_bytes = ocsp_response
        .bytes
        .ok_or_else(|| OcspError::Malformed("missing response bytes".to_string()))?;

    let basic_response: BasicOcspResponse = rasn::der::decode(&response_bytes.response)
        .map_err(|e| OcspError::Malformed(e.to_string()))?;

    verify_response_signature(&basic_response, issuer)?;

    let expected_id = expected_cert_id(certificate, issuer)?;
    let response_data = &basic_response.tbs_response_data;

    for single in &response_data.responses {
        let cert_id = &single.cert_id;

        if cert_id.serial_number != expected_id.serial_number
            || cert_id.issuer_name_hash != expected_id.issuer_name_hash
            || cert_id.issuer_key_hash != expected_id.issuer_key_hash
        {
            continue;
        }

        let this_update = single.this_update.with_timezone(&Utc);
        let next_update = single
            .next_update
            .as_ref()
            .map(|nu| nu.with_timezone(&Utc));

        return match &single.cert_status {
            CertStatus::Good => {
                if now < this_update {
                    return Err(OcspError::Stale);
                }
                if let Some(next_update) = next_update {
                    if now > next_update {
                        return Err(OcspError::Stale);
                    }
                }

                Ok(OcspAssessment {
                    status: RevocationStatus::Good,
                    next_update,
                })
            }

            CertStatus::Revoked(revoked_info) => {
                let at = Some(revoked_info.revocation_time.with_timezone(&Utc));
                let reason = revoked_info
                    .revocation_reason
                    .map(|reason| format!("{reason:?}"));

                Ok(OcspAssessment {
                    status: RevocationStatus::Revoked { at, reason },
                    next_update,
                })
            }

            CertStatus::Unknown(_) => Ok(OcspAssessment {
                status: RevocationStatus::Indeterminate {
                    reason: "OCSP responder does not know the certificate".to_string(),
                },
                next_update,
            }),
        };
    }

    Err(OcspError::NoMatchingResponse)
}

// One of the certificates carried in the response, or the issuer itself,
// must have signed the response data.
fn verify_response_signature(
    basic_response: &BasicOcspResponse,
    issuer: &Certificate,
) -> Result<(), OcspError> {
    let response_data_tbs = rasn::der::encode(&basic_response.tbs_response_data)
        .map_err(|e| OcspError::Malformed(e.to_string()))?;

    let sig_alg = &basic_response.signature_algorithm.algorithm;
    let validator =
        validator_for_rasn_algs(sig_alg, None).ok_or(OcspError::UnsupportedAlgorithm)?;

    let mut candidate_keys: Vec<Vec<u8>> = vec![];

    if let Some(ocsp_certs) = &basic_response.certs {
        for ocsp_cert in ocsp_certs {
            if let Ok(spki_der) =
                rasn::der::encode(&ocsp_cert.tbs_certificate.subject_public_key_info)
            {
                candidate_keys.push(spki_der);
            }
        }
    }

    candidate_keys.push(issuer.public_key_der.clone());

    let signature = basic_response.signature.as_raw_slice();

    for key in &candidate_keys {
        if validator
            .validate(signature, &response_data_tbs, key)
            .is_ok()
        {
            return Ok(());
        }
    }

    Err(OcspError::SignatureInvalid)
}

fn expected_cert_id(
    certificate: &Certificate,
    issuer: &Certificate,
) -> Result<rasn_ocsp::CertId, OcspError> {
    let subject: PkixCertificate = rasn::der::decode(&certificate.der)
        .map_err(|e| OcspError::Malformed(e.to_string()))?;
    let issuer_cert: PkixCertificate =
        rasn::der::decode(&issuer.der).map_err(|e| OcspError::Malformed(e.to_string()))?;

    let issuer_name_raw = rasn::der::encode(&issuer_cert.tbs_certificate.subject)
        .map_err(|e| OcspError::Malformed(e.to_string()))?;

    let issuer_key_raw = issuer_cert
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .as_raw_slice();

    let sha1_oid =
        oids::rasn_oid(oids::arcs::SHA1).ok_or_else(|| OcspError::Malformed("oid".to_string()))?;

    // Many OCSP responders expect the parameters to be NULL, not absent.
    let null_params =
        rasn::der::encode(&()).map_err(|e| OcspError::Malformed(e.to_string()))?;

    let sha1_ai = rasn_pkix::AlgorithmIdentifier {
        algorithm: sha1_oid,
        parameters: Some(Any::new(null_params)),
    };

    Ok(rasn_ocsp::CertId {
        hash_algorithm: sha1_ai,
        issuer_name_hash: OctetString::from(sha1(&issuer_name_raw)),
        issuer_key_hash: OctetString::from(sha1(issuer_key_raw)),
        serial_number: subject.tbs_certificate.serial_number,
    })
}
