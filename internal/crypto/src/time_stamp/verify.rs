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

//! Verification of RFC 3161 time stamp tokens.

use chrono::{DateTime, Utc};
use rasn::types::OctetString;
use rasn_cms::{CertificateChoices, SignerIdentifier};
use rasn_pkix::Certificate as PkixCertificate;

use crate::{
    hash::{sha256, sha384, sha512},
    raw_signature::{
        oids::{arcs, rasn_oid_is},
        validator_for_rasn_algs,
    },
    time_stamp::{rfc3161, TimeStampError},
    trust_anchor::TrustAnchorStore,
};

/// What a verified time stamp token attests.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeStampInfo {
    /// The attested time.
    pub gen_time: DateTime<Utc>,

    /// SHA-256 fingerprint of the TSA certificate that signed the token,
    /// uppercase hex.
    pub signer_fingerprint: String,
}

/// Verify a DER-encoded TimeStampResp against the message it should bind
/// and the configured set of trusted TSA certificates.
///
/// Checks, in order: the response was granted; the token's imprint is a
/// supported hash of `message`; the token's CMS signature verifies against
/// a certificate carried in the token; and that certificate (or another in
/// the token) is a configured trusted TSA.
pub fn verify_time_stamp_reply(
    reply_der: &[u8],
    message: &[u8],
    trusted_tsas: &TrustAnchorStore,
) -> Result<TimeStampInfo, TimeStampError> {
    let response = rfc3161::decode_reply(reply_der)?;

    if !rfc3161::is_granted(&response) {
        return Err(TimeStampError::NotGranted);
    }

    let signed_data = rfc3161::signed_data_from_reply(&response)?;
    let tst_info = rfc3161::tst_info_from_signed_data(&signed_data)?;

    if !rfc3161::imprint_matches(&tst_info.message_imprint, message) {
        return Err(TimeStampError::ImprintMismatch);
    }

    let econtent = rfc3161::econtent_octets(&signed_data)?;

    let certs: Vec<&PkixCertificate> = signed_data
        .certificates
        .as_ref()
        .map(|set| {
            set.to_vec()
                .into_iter()
                .filter_map(|choice| match choice {
                    CertificateChoices::Certificate(cert) => Some(&**cert),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if certs.is_empty() {
        return Err(TimeStampError::DecodeError(
            "token carries no certificates".to_string(),
        ));
    }

    let mut last_err = TimeStampError::SignatureInvalid;

    // Look for any signer whose certificate is present and whose signature
    // verifies.
    for signer_info in signed_data.signer_infos.to_vec() {
        let Some(cert) = certs.iter().copied().find(|cert| match &signer_info.sid {
            SignerIdentifier::IssuerAndSerialNumber(iasn) => {
                iasn.issuer == cert.tbs_certificate.issuer
                    && iasn.serial_number == cert.tbs_certificate.serial_number
            }
            _ => false,
        }) else {
            continue;
        };

        // The signed attributes must bind the TSTInfo content digest.
        let to_verify = match &signer_info.signed_attrs {
            Some(signed_attrs) => {
                let digest_alg = &signer_info.digest_algorithm.algorithm;

                let econtent_digest = if rasn_oid_is(digest_alg, arcs::SHA256) {
                    sha256(&econtent)
                } else if rasn_oid_is(digest_alg, arcs::SHA384) {
                    sha384(&econtent)
                } else if rasn_oid_is(digest_alg, arcs::SHA512) {
                    sha512(&econtent)
                } else {
                    last_err = TimeStampError::DecodeError(
                        "unsupported digest algorithm".to_string(),
                    );
                    continue;
                };

                let Some(message_digest) = message_digest_attr(signed_attrs) else {
                    last_err = TimeStampError::DecodeError(
                        "token carries no message-digest attribute".to_string(),
                    );
                    continue;
                };

                if message_digest.as_ref() != econtent_digest.as_slice() {
                    last_err = TimeStampError::ImprintMismatch;
                    continue;
                }

                // Signed attributes verify under their explicit SET OF
                // encoding, not the implicit tag used inside SignerInfo.
                match rasn::der::encode(signed_attrs) {
                    Ok(der) => der,
                    Err(e) => {
                        last_err = TimeStampError::DecodeError(e.to_string());
                        continue;
                    }
                }
            }
            None => econtent.clone(),
        };

        let Ok(spki_der) = rasn::der::encode(&cert.tbs_certificate.subject_public_key_info)
        else {
            continue;
        };

        let Some(validator) = validator_for_rasn_algs(
            &signer_info.signature_algorithm.algorithm,
            Some(&signer_info.digest_algorithm.algorithm),
        ) else {
            last_err = TimeStampError::DecodeError(
                "unsupported signature algorithm".to_string(),
            );
            continue;
        };

        if validator
            .validate(signer_info.signature.as_ref(), &to_verify, &spki_der)
            .is_err()
        {
            last_err = TimeStampError::SignatureInvalid;
            continue;
        }

        // The signer (or another certificate carried in the token) must be
        // a configured trusted TSA.
        let Ok(signer_der) = rasn::der::encode(cert) else {
            continue;
        };
        let signer_fingerprint = hex::encode_upper(sha256(&signer_der));

        let trusted = trusted_tsas.contains_fingerprint(&signer_fingerprint)
            || certs.iter().any(|c| {
                rasn::der::encode(*c)
                    .map(|der| {
                        trusted_tsas.contains_fingerprint(&hex::encode_upper(sha256(&der)))
                    })
                    .unwrap_or(false)
            });

        if !trusted {
            return Err(TimeStampError::Untrusted);
        }

        return Ok(TimeStampInfo {
            gen_time: tst_info.gen_time.with_timezone(&Utc),
            signer_fingerprint,
        });
    }

    Err(last_err)
}

fn message_digest_attr(signed_attrs: &rasn_cms::SignedAttributes) -> Option<OctetString> {
    signed_attrs.to_vec().into_iter().find_map(|attr| {
        if !rasn_oid_is(&attr.r#type, arcs::MESSAGE_DIGEST) {
            return None;
        }

        attr.values
            .to_vec()
            .first()
            .and_then(|value| rasn::der::decode::<OctetString>(value.as_bytes()).ok())
    })
}
