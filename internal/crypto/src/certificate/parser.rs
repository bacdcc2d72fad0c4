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

//! Decoding of PEM, DER, and PKCS#12 byte streams into [`Certificate`]
//! values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use x509_parser::{
    der_parser::{oid, Oid},
    extensions::{DistributionPointName, GeneralName, ParsedExtension},
    pem::Pem,
    prelude::*,
};

use crate::{
    certificate::{Certificate, CertificateStatus, ExtendedKeyUsageFlags, KeyUsageFlags},
    hash::{sha1, sha256},
};

/// Byte stream formats accepted by [`parse`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateFormat {
    /// One or more PEM `CERTIFICATE` blocks; the first is the subject, the
    /// rest are its chain.
    Pem,

    /// A single DER-encoded certificate.
    Der,

    /// A password-protected PKCS#12 (PFX) container.
    Pkcs12,
}

/// Describes errors that can be identified when decoding certificate bytes.
///
/// These are not retryable; the caller must re-supply the input.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum FormatError {
    /// The byte stream does not match the declared format.
    #[error("the byte stream does not match the declared format ({0})")]
    UnexpectedFormat(String),

    /// A required certificate field is absent.
    #[error("required certificate field is absent ({0})")]
    MissingField(&'static str),

    /// The certificate's validity window is inverted.
    #[error("the certificate's notBefore is after its notAfter")]
    InvalidValidity,

    /// A PKCS#12 container was supplied without a password.
    #[error("a password is required to open a PKCS#12 container")]
    PasswordRequired,

    /// The PKCS#12 MAC did not verify; the password is likely wrong.
    #[error("PKCS#12 integrity check failed (wrong password?)")]
    MacVerification,

    /// The container decoded but held no certificate.
    #[error("no certificate found in the supplied bytes")]
    NoCertificate,
}

/// Result of parsing a certificate byte stream.
#[derive(Clone, Debug)]
pub struct ParsedCertificate {
    /// The subject (end-entity) certificate.
    pub certificate: Certificate,

    /// Any additional certificates carried by the byte stream, as raw DER.
    pub chain: Vec<Vec<u8>>,

    /// The private key accompanying the certificate (PKCS#12 only), as
    /// DER-encoded PKCS#8.
    pub private_key_der: Option<Vec<u8>>,
}

/// Decode `bytes` in the declared `format` into a [`ParsedCertificate`].
///
/// `password` is required for (and only consulted by) the PKCS#12 format.
/// This is a pure decode with no side effects.
pub fn parse(
    bytes: &[u8],
    format: CertificateFormat,
    password: Option<&str>,
) -> Result<ParsedCertificate, FormatError> {
    match format {
        CertificateFormat::Der => Ok(ParsedCertificate {
            certificate: decode_certificate(bytes)?,
            chain: vec![],
            private_key_der: None,
        }),

        CertificateFormat::Pem => parse_pem(bytes),

        CertificateFormat::Pkcs12 => parse_pkcs12(bytes, password),
    }
}

fn parse_pem(bytes: &[u8]) -> Result<ParsedCertificate, FormatError> {
    let mut ders: Vec<Vec<u8>> = vec![];

    for maybe_pem in Pem::iter_from_buffer(bytes) {
        let pem = maybe_pem.map_err(|e| FormatError::UnexpectedFormat(e.to_string()))?;
        if pem.label == "CERTIFICATE" {
            ders.push(pem.contents);
        }
    }

    if ders.is_empty() {
        return Err(FormatError::NoCertificate);
    }

    let certificate = decode_certificate(&ders[0])?;

    Ok(ParsedCertificate {
        certificate,
        chain: ders.split_off(1),
        private_key_der: None,
    })
}

fn parse_pkcs12(bytes: &[u8], password: Option<&str>) -> Result<ParsedCertificate, FormatError> {
    let password = password.ok_or(FormatError::PasswordRequired)?;

    let pfx =
        p12::PFX::parse(bytes).map_err(|e| FormatError::UnexpectedFormat(format!("{e:?}")))?;

    if !pfx.verify_mac(password) {
        return Err(FormatError::MacVerification);
    }

    let cert_ders = pfx
        .cert_bags(password)
        .map_err(|e| FormatError::UnexpectedFormat(format!("{e:?}")))?;

    if cert_ders.is_empty() {
        return Err(FormatError::NoCertificate);
    }

    let key_ders = pfx
        .key_bags(password)
        .map_err(|e| FormatError::UnexpectedFormat(format!("{e:?}")))?;

    // The container does not guarantee bag order. The subject certificate is
    // the first non-CA entry; CA entries become the chain.
    let mut decoded: Vec<(Certificate, Vec<u8>)> = vec![];
    for der in cert_ders {
        let cert = decode_certificate(&der)?;
        decoded.push((cert, der));
    }

    let leaf_idx = decoded
        .iter()
        .position(|(cert, _)| !cert.is_ca)
        .unwrap_or(0);

    let (certificate, _) = decoded.remove(leaf_idx);
    let chain = decoded.into_iter().map(|(_, der)| der).collect();

    Ok(ParsedCertificate {
        certificate,
        chain,
        private_key_der: key_ders.into_iter().next(),
    })
}

/// Decode a single DER-encoded X.509 certificate into a [`Certificate`].
pub(crate) fn decode_certificate(der: &[u8]) -> Result<Certificate, FormatError> {
    let (_rem, x509) = X509Certificate::from_der(der)
        .map_err(|e| FormatError::UnexpectedFormat(e.to_string()))?;

    let serial = x509.raw_serial().to_vec();
    if serial.is_empty() {
        return Err(FormatError::MissingField("serialNumber"));
    }

    let validity = x509.validity();
    let not_before = asn1_time_to_datetime(&validity.not_before)
        .ok_or(FormatError::MissingField("notBefore"))?;
    let not_after = asn1_time_to_datetime(&validity.not_after)
        .ok_or(FormatError::MissingField("notAfter"))?;

    if not_before > not_after {
        return Err(FormatError::InvalidValidity);
    }

    let mut key_usage = KeyUsageFlags::default();
    let mut extended_key_usage = ExtendedKeyUsageFlags::default();
    let mut crl_urls: Vec<String> = vec![];
    let mut ocsp_urls: Vec<String> = vec![];
    let mut subject_key_id: Option<Vec<u8>> = None;
    let mut authority_key_id: Option<Vec<u8>> = None;

    for ext in x509.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::KeyUsage(ku) => {
                key_usage = KeyUsageFlags {
                    digital_signature: ku.digital_signature(),
                    non_repudiation: ku.non_repudiation(),
                    key_cert_sign: ku.key_cert_sign(),
                    crl_sign: ku.crl_sign(),
                };
            }

            ParsedExtension::ExtendedKeyUsage(eku) => {
                extended_key_usage = ExtendedKeyUsageFlags {
                    any: eku.any,
                    code_signing: eku.code_signing,
                    email_protection: eku.email_protection,
                    time_stamping: eku.time_stamping,
                    ocsp_signing: eku.ocsp_signing,
                    client_auth: eku.client_auth,
                    server_auth: eku.server_auth,
                    other: eku.other.iter().map(|oid| oid.to_id_string()).collect(),
                };
            }

            ParsedExtension::CRLDistributionPoints(points) => {
                for point in points.points.iter() {
                    if let Some(DistributionPointName::FullName(names)) = &point.distribution_point
                    {
                        for name in names {
                            if let GeneralName::URI(uri) = name {
                                crl_urls.push((*uri).to_string());
                            }
                        }
                    }
                }
            }

            ParsedExtension::AuthorityInfoAccess(aia) => {
                for ad in &aia.accessdescs {
                    if ad.access_method == AD_OCSP_OID {
                        if let GeneralName::URI(uri) = ad.access_location {
                            ocsp_urls.push(uri.to_string());
                        }
                    }
                }
            }

            ParsedExtension::SubjectKeyIdentifier(ski) => {
                subject_key_id = Some(ski.0.to_vec());
            }

            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                if let Some(key_id) = &aki.key_identifier {
                    authority_key_id = Some(key_id.0.to_vec());
                }
            }

            _ => (),
        }
    }

    Ok(Certificate {
        subject: x509.subject().to_string(),
        issuer: x509.issuer().to_string(),
        subject_raw: x509.subject().as_raw().to_vec(),
        issuer_raw: x509.issuer().as_raw().to_vec(),
        serial,
        not_before,
        not_after,
        public_key_der: x509.public_key().raw.to_vec(),
        key_usage,
        extended_key_usage,
        signature_algorithm: x509.signature_algorithm.algorithm.to_id_string(),
        hash_algorithm: hash_algorithm_name(&x509.signature_algorithm.algorithm),
        crl_urls,
        ocsp_urls,
        der: der.to_vec(),
        sha1_fingerprint: hex::encode_upper(sha1(der)),
        sha256_fingerprint: hex::encode_upper(sha256(der)),
        subject_key_id: subject_key_id.map(serde_bytes::ByteBuf::from),
        authority_key_id: authority_key_id.map(serde_bytes::ByteBuf::from),
        is_ca: x509.tbs_certificate.is_ca(),
        status: CertificateStatus::Unknown,
        renews: None,
    })
}

fn asn1_time_to_datetime(time: &x509_parser::time::ASN1Time) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(time.timestamp(), 0)
}

fn hash_algorithm_name(alg: &Oid) -> Option<String> {
    let name = if *alg == SHA256_WITH_RSAENCRYPTION_OID || *alg == ECDSA_WITH_SHA256_OID {
        "sha256"
    } else if *alg == SHA384_WITH_RSAENCRYPTION_OID || *alg == ECDSA_WITH_SHA384_OID {
        "sha384"
    } else if *alg == SHA512_WITH_RSAENCRYPTION_OID || *alg == ECDSA_WITH_SHA512_OID {
        "sha512"
    } else if *alg == ED25519_OID {
        "sha512"
    } else {
        return None;
    };

    Some(name.to_string())
}

const AD_OCSP_OID: Oid<'static> = oid!(1.3.6 .1 .5 .5 .7 .48 .1);
const SHA256_WITH_RSAENCRYPTION_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .1 .11);
const SHA384_WITH_RSAENCRYPTION_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .1 .12);
const SHA512_WITH_RSAENCRYPTION_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .1 .13);
const ECDSA_WITH_SHA256_OID: Oid<'static> = oid!(1.2.840 .10045 .4 .3 .2);
const ECDSA_WITH_SHA384_OID: Oid<'static> = oid!(1.2.840 .10045 .4 .3 .3);
const ECDSA_WITH_SHA512_OID: Oid<'static> = oid!(1.2.840 .10045 .4 .3 .4);
const ED25519_OID: Oid<'static> = oid!(1.3.101 .112);
