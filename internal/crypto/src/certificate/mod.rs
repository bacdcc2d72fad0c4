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

//! Imported certificates and their metadata.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod parser;
pub(crate) use parser::decode_certificate;
pub use parser::{parse, CertificateFormat, FormatError, ParsedCertificate};

mod store;
pub use store::{CertificateStore, ExpiryNotice};

/// Identifies a certificate uniquely: serial number within an issuer.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CertificateKey {
    /// Issuer distinguished name.
    pub issuer: String,

    /// Uppercase hex rendering of the certificate serial number.
    pub serial_hex: String,
}

impl Display for CertificateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.issuer, self.serial_hex)
    }
}

/// Lifecycle status of an imported certificate.
///
/// This is the only mutable field of a [`Certificate`]; it is updated by the
/// revocation checker and certificate validator.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    /// The certificate is usable as far as is known.
    Valid,

    /// The certificate's validity window has ended.
    Expired,

    /// A revocation source reports the certificate as revoked.
    Revoked,

    /// The certificate is administratively on hold.
    Suspended,

    /// No determination has been made yet.
    #[default]
    Unknown,
}

/// Key usage bits extracted from the X.509 keyUsage extension.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct KeyUsageFlags {
    /// digitalSignature bit.
    pub digital_signature: bool,

    /// nonRepudiation (contentCommitment) bit.
    pub non_repudiation: bool,

    /// keyCertSign bit.
    pub key_cert_sign: bool,

    /// cRLSign bit.
    pub crl_sign: bool,
}

/// Extended key usage values extracted from the X.509 extendedKeyUsage
/// extension.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ExtendedKeyUsageFlags {
    /// anyExtendedKeyUsage.
    pub any: bool,

    /// id-kp-codeSigning.
    pub code_signing: bool,

    /// id-kp-emailProtection.
    pub email_protection: bool,

    /// id-kp-timeStamping.
    pub time_stamping: bool,

    /// id-kp-OCSPSigning.
    pub ocsp_signing: bool,

    /// id-kp-clientAuth.
    pub client_auth: bool,

    /// id-kp-serverAuth.
    pub server_auth: bool,

    /// Any other EKU OIDs, in dotted-decimal notation.
    pub other: Vec<String>,
}

/// An imported X.509 certificate and the metadata the trust engine needs
/// from it.
///
/// Values are immutable after import except for [`status`](Self::status).
/// A certificate is never deleted, only superseded by a renewed record that
/// references its predecessor through [`renews`](Self::renews).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Certificate {
    /// Subject distinguished name.
    pub subject: String,

    /// Issuer distinguished name.
    pub issuer: String,

    /// DER encoding of the subject name, for exact chain linkage.
    #[serde(with = "serde_bytes")]
    pub subject_raw: Vec<u8>,

    /// DER encoding of the issuer name, for exact chain linkage.
    #[serde(with = "serde_bytes")]
    pub issuer_raw: Vec<u8>,

    /// Serial number content octets, big-endian.
    #[serde(with = "serde_bytes")]
    pub serial: Vec<u8>,

    /// Start of the validity window.
    pub not_before: DateTime<Utc>,

    /// End of the validity window.
    pub not_after: DateTime<Utc>,

    /// DER-encoded SubjectPublicKeyInfo.
    #[serde(with = "serde_bytes")]
    pub public_key_der: Vec<u8>,

    /// Key usage bits.
    pub key_usage: KeyUsageFlags,

    /// Extended key usage values.
    pub extended_key_usage: ExtendedKeyUsageFlags,

    /// Signature algorithm OID in dotted-decimal notation.
    pub signature_algorithm: String,

    /// Hash algorithm named by the signature algorithm, when recognized.
    pub hash_algorithm: Option<String>,

    /// CRL distribution point URLs.
    pub crl_urls: Vec<String>,

    /// OCSP responder URLs from the authorityInfoAccess extension.
    pub ocsp_urls: Vec<String>,

    /// The raw DER encoding of the certificate.
    #[serde(with = "serde_bytes")]
    pub der: Vec<u8>,

    /// SHA-1 fingerprint of the DER encoding, uppercase hex.
    pub sha1_fingerprint: String,

    /// SHA-256 fingerprint of the DER encoding, uppercase hex.
    pub sha256_fingerprint: String,

    /// subjectKeyIdentifier extension content, if present.
    #[serde(default)]
    pub subject_key_id: Option<serde_bytes::ByteBuf>,

    /// authorityKeyIdentifier key id content, if present.
    #[serde(default)]
    pub authority_key_id: Option<serde_bytes::ByteBuf>,

    /// Whether basicConstraints marks this certificate as a CA.
    pub is_ca: bool,

    /// Current lifecycle status.
    pub status: CertificateStatus,

    /// Key of the predecessor certificate this record renews, if any.
    #[serde(default)]
    pub renews: Option<CertificateKey>,
}

impl Certificate {
    /// Return the (issuer DN, serial) key that uniquely identifies this
    /// certificate.
    pub fn key(&self) -> CertificateKey {
        CertificateKey {
            issuer: self.issuer.clone(),
            serial_hex: self.serial_hex(),
        }
    }

    /// Return the serial number as uppercase hex.
    pub fn serial_hex(&self) -> String {
        hex::encode_upper(&self.serial)
    }

    /// Return `true` if `at` falls within the validity window (inclusive).
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }

    /// Whole days until the validity window ends; negative once expired.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.not_after - now).num_days()
    }

    /// Return `true` if this certificate names at least one revocation
    /// source (CRL or OCSP).
    pub fn has_revocation_source(&self) -> bool {
        !self.crl_urls.is_empty() || !self.ocsp_urls.is_empty()
    }
}
