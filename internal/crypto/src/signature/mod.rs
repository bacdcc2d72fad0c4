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

//! Signature records: creation and validation of verifiable signatures
//! over archival record digests.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    certificate::CertificateKey,
    hash::{sha256, sha384, sha512},
    raw_signature::SigningAlg,
    revocation::RevocationOutcome,
};

mod engine;
pub use engine::{SignatureEngine, SigningError, SigningRequest};

mod validator;
pub use validator::{
    SignatureValidationContext, SignatureValidationResult, SignatureValidator,
};

/// The declared kind of the signed document, used to infer a container
/// format when the caller does not name one.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A PDF document.
    Pdf,

    /// An XML document.
    Xml,

    /// Any other binary content.
    Binary,
}

/// Advanced electronic signature container format.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SignatureFormat {
    /// CMS-based signatures over generic binary content.
    CAdES,

    /// PDF-embedded signatures.
    PAdES,

    /// XML signatures.
    XAdES,
}

impl SignatureFormat {
    /// The format used for a document kind when none is requested.
    pub fn infer_from(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Pdf => Self::PAdES,
            DocumentKind::Xml => Self::XAdES,
            DocumentKind::Binary => Self::CAdES,
        }
    }
}

impl Display for SignatureFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CAdES => "CAdES",
            Self::PAdES => "PAdES",
            Self::XAdES => "XAdES",
        })
    }
}

/// Signature evidence level, from basic to long-term-archival.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SignatureLevel {
    /// Basic electronic signature.
    Bes,

    /// Policy-bound signature.
    Epes,

    /// Signature with a trusted time stamp.
    T,

    /// Long-term: time stamp plus captured revocation data.
    Lt,

    /// Long-term-archival: adds an archive time stamp.
    Lta,
}

impl SignatureLevel {
    /// `true` for levels that must carry a time stamp token.
    pub fn requires_timestamp(self) -> bool {
        matches!(self, Self::T | Self::Lt | Self::Lta)
    }
}

impl Display for SignatureLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bes => "BES",
            Self::Epes => "EPES",
            Self::T => "T",
            Self::Lt => "LT",
            Self::Lta => "LTA",
        })
    }
}

/// What a (format, level) combination must embed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EvidenceRequirements {
    /// A signature policy identifier must be present.
    pub policy_id: bool,

    /// A trusted time stamp over the signature value must be present.
    pub timestamp: bool,

    /// Revocation data for the signing certificate must be captured.
    pub revocation_data: bool,

    /// An archive time stamp over the whole record must be present.
    pub archive_timestamp: bool,
}

/// The evidence each format/level combination must embed.
///
/// The match is exhaustive over both enums so a new format or level cannot
/// be added without deciding its requirements.
pub fn required_evidence(format: SignatureFormat, level: SignatureLevel) -> EvidenceRequirements {
    match (format, level) {
        (SignatureFormat::CAdES, SignatureLevel::Bes)
        | (SignatureFormat::PAdES, SignatureLevel::Bes)
        | (SignatureFormat::XAdES, SignatureLevel::Bes) => EvidenceRequirements::default(),

        (SignatureFormat::CAdES, SignatureLevel::Epes)
        | (SignatureFormat::PAdES, SignatureLevel::Epes)
        | (SignatureFormat::XAdES, SignatureLevel::Epes) => EvidenceRequirements {
            policy_id: true,
            ..EvidenceRequirements::default()
        },

        (SignatureFormat::CAdES, SignatureLevel::T)
        | (SignatureFormat::PAdES, SignatureLevel::T)
        | (SignatureFormat::XAdES, SignatureLevel::T) => EvidenceRequirements {
            timestamp: true,
            ..EvidenceRequirements::default()
        },

        (SignatureFormat::CAdES, SignatureLevel::Lt)
        | (SignatureFormat::PAdES, SignatureLevel::Lt)
        | (SignatureFormat::XAdES, SignatureLevel::Lt) => EvidenceRequirements {
            timestamp: true,
            revocation_data: true,
            ..EvidenceRequirements::default()
        },

        (SignatureFormat::CAdES, SignatureLevel::Lta)
        | (SignatureFormat::PAdES, SignatureLevel::Lta)
        | (SignatureFormat::XAdES, SignatureLevel::Lta) => EvidenceRequirements {
            timestamp: true,
            revocation_data: true,
            archive_timestamp: true,
            ..EvidenceRequirements::default()
        },
    }
}

/// Digest algorithms accepted for document content hashes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,

    /// SHA-384.
    Sha384,

    /// SHA-512.
    Sha512,
}

impl DigestAlgorithm {
    /// Digest length in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Hash `data` with this algorithm.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => sha256(data),
            Self::Sha384 => sha384(data),
            Self::Sha512 => sha512(data),
        }
    }
}

/// Identifies a signature record: the signed document's digest plus the
/// signing certificate's serial.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SignatureRecordId {
    /// Lowercase hex of the document content digest.
    pub digest_hex: String,

    /// Uppercase hex serial of the signing certificate.
    pub certificate_serial_hex: String,
}

impl Display for SignatureRecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.digest_hex, self.certificate_serial_hex)
    }
}

/// A signature over an archival record digest.
///
/// Created once at signing time and immutable afterwards except for
/// [`last_validation`](Self::last_validation), which is overwritten each
/// time the record is re-validated. Validation never alters the signature
/// bytes themselves.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SignatureRecord {
    /// Record identity: document digest + signer serial.
    pub id: SignatureRecordId,

    /// The signed document content digest.
    #[serde(with = "serde_bytes")]
    pub document_digest: Vec<u8>,

    /// Algorithm that produced `document_digest`.
    pub digest_algorithm: DigestAlgorithm,

    /// Key of the signing certificate.
    pub certificate: CertificateKey,

    /// SHA-256 fingerprint of the signing certificate, uppercase hex.
    pub certificate_fingerprint: String,

    /// Signature container format.
    pub format: SignatureFormat,

    /// Signature evidence level.
    pub level: SignatureLevel,

    /// Signature policy identifier (EPES and above).
    pub policy_id: Option<String>,

    /// Raw signature algorithm.
    pub signing_alg: SigningAlg,

    /// The cryptographic signature over `document_digest`.
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,

    /// When the signature was created.
    pub signed_at: DateTime<Utc>,

    /// RFC 3161 reply binding `signature`, for levels T and above.
    ///
    /// Absent on a T+ record only when it was produced under the degraded
    /// signing policy.
    pub timestamp_reply: Option<serde_bytes::ByteBuf>,

    /// Archive time stamp over the signature and its first token (LTA).
    pub archive_timestamp_reply: Option<serde_bytes::ByteBuf>,

    /// Revocation outcomes captured at signing time (LT and above).
    pub revocation_evidence: Vec<RevocationOutcome>,

    /// The parent signature this record counter-signs, if any.
    pub parent: Option<SignatureRecordId>,

    /// Result of the most recent validation; recomputed on demand.
    #[serde(skip)]
    pub last_validation: Option<SignatureValidationResult>,
}
