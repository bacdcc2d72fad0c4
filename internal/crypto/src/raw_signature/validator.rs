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

use rasn::types::ObjectIdentifier;
use thiserror::Error;
use x509_parser::der_parser::Oid;

use crate::raw_signature::{
    oids::{arcs, rasn_oid_is, *},
    validators,
    SigningAlg,
};

/// A `RawSignatureValidator` implementation checks a signature encoded using
/// a specific signature algorithm and a private/public key pair.
///
/// IMPORTANT: This only covers the bare signature value. Verifying the
/// containers around it (certificates, signature records, time stamp tokens)
/// is the concern of the other modules of this crate.
pub trait RawSignatureValidator {
    /// Return `Ok(())` if the signature `sig` is valid for the raw content
    /// `data` and the public key `public_key` (a DER-encoded
    /// SubjectPublicKeyInfo).
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError>;
}

/// Return a built-in signature validator for the requested signature
/// algorithm.
pub fn validator_for_signing_alg(alg: SigningAlg) -> Option<Box<dyn RawSignatureValidator>> {
    match alg {
        SigningAlg::Es256 => Some(Box::new(validators::EcdsaValidator::Es256)),
        SigningAlg::Es384 => Some(Box::new(validators::EcdsaValidator::Es384)),
        SigningAlg::Es512 => None,
        SigningAlg::Ps256 => Some(Box::new(validators::RsaPssValidator::Sha256)),
        SigningAlg::Ps384 => Some(Box::new(validators::RsaPssValidator::Sha384)),
        SigningAlg::Ps512 => Some(Box::new(validators::RsaPssValidator::Sha512)),
        SigningAlg::Ed25519 => Some(Box::new(validators::Ed25519Validator)),
    }
}

/// Return a validator for the signature algorithm named by an X.509
/// `signatureAlgorithm` field (certificates and CRLs).
pub(crate) fn validator_for_cert_alg(alg: &Oid) -> Option<Box<dyn RawSignatureValidator>> {
    if *alg == SHA256_WITH_RSAENCRYPTION_OID {
        Some(Box::new(validators::RsaLegacyValidator::Sha256))
    } else if *alg == SHA384_WITH_RSAENCRYPTION_OID {
        Some(Box::new(validators::RsaLegacyValidator::Sha384))
    } else if *alg == SHA512_WITH_RSAENCRYPTION_OID {
        Some(Box::new(validators::RsaLegacyValidator::Sha512))
    } else if *alg == ECDSA_WITH_SHA256_OID {
        validator_for_signing_alg(SigningAlg::Es256)
    } else if *alg == ECDSA_WITH_SHA384_OID {
        validator_for_signing_alg(SigningAlg::Es384)
    } else if *alg == ECDSA_WITH_SHA512_OID {
        validator_for_signing_alg(SigningAlg::Es512)
    } else if *alg == ED25519_OID {
        validator_for_signing_alg(SigningAlg::Ed25519)
    } else {
        None
    }
}

/// Return a validator for a (signature algorithm, hash algorithm) pair as
/// carried by OCSP responses and CMS signer infos.
pub(crate) fn validator_for_rasn_algs(
    sig_alg: &ObjectIdentifier,
    hash_alg: Option<&ObjectIdentifier>,
) -> Option<Box<dyn RawSignatureValidator>> {
    if rasn_oid_is(sig_alg, arcs::SHA256_WITH_RSAENCRYPTION) {
        return Some(Box::new(validators::RsaLegacyValidator::Sha256));
    }

    if rasn_oid_is(sig_alg, arcs::SHA384_WITH_RSAENCRYPTION) {
        return Some(Box::new(validators::RsaLegacyValidator::Sha384));
    }

    if rasn_oid_is(sig_alg, arcs::SHA512_WITH_RSAENCRYPTION) {
        return Some(Box::new(validators::RsaLegacyValidator::Sha512));
    }

    if rasn_oid_is(sig_alg, arcs::ED25519) {
        return validator_for_signing_alg(SigningAlg::Ed25519);
    }

    if rasn_oid_is(sig_alg, arcs::RSA) {
        // Plain rsaEncryption; the hash comes from the digest algorithm.
        return match hash_alg {
            Some(hash) if rasn_oid_is(hash, arcs::SHA256) => {
                Some(Box::new(validators::RsaLegacyValidator::Sha256))
            }
            Some(hash) if rasn_oid_is(hash, arcs::SHA384) => {
                Some(Box::new(validators::RsaLegacyValidator::Sha384))
            }
            Some(hash) if rasn_oid_is(hash, arcs::SHA512) => {
                Some(Box::new(validators::RsaLegacyValidator::Sha512))
            }
            _ => None,
        };
    }

    if rasn_oid_is(sig_alg, arcs::EC_PUBLICKEY)
        || rasn_oid_is(sig_alg, arcs::ECDSA_WITH_SHA256)
        || rasn_oid_is(sig_alg, arcs::ECDSA_WITH_SHA384)
        || rasn_oid_is(sig_alg, arcs::ECDSA_WITH_SHA512)
    {
        if rasn_oid_is(sig_alg, arcs::ECDSA_WITH_SHA256) {
            return validator_for_signing_alg(SigningAlg::Es256);
        }
        if rasn_oid_is(sig_alg, arcs::ECDSA_WITH_SHA384) {
            return validator_for_signing_alg(SigningAlg::Es384);
        }

        return match hash_alg {
            Some(hash) if rasn_oid_is(hash, arcs::SHA256) => {
                validator_for_signing_alg(SigningAlg::Es256)
            }
            Some(hash) if rasn_oid_is(hash, arcs::SHA384) => {
                validator_for_signing_alg(SigningAlg::Es384)
            }
            _ => None,
        };
    }

    None
}

/// Describes errors that can be identified when validating a raw signature.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum RawSignatureValidationError {
    /// The signature does not match the provided data or public key.
    #[error("the signature does not match the provided data or public key")]
    SignatureMismatch,

    /// An invalid public key was provided.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// An invalid signature value was provided.
    #[error("invalid signature value")]
    InvalidSignature,

    /// The signature uses an unsupported signing or hash algorithm.
    #[error("signature uses an unsupported algorithm")]
    UnsupportedAlgorithm,

    /// An unexpected internal error occurred while validating.
    #[error("internal error ({0})")]
    InternalError(String),
}
