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

//! Built-in [`RawSignatureValidator`] implementations over the pure-Rust
//! crypto stack.

use ecdsa::signature::hazmat::PrehashVerifier;
use rsa::{
    pkcs8::DecodePublicKey,
    sha2::{Sha256, Sha384, Sha512},
    signature::Verifier,
    RsaPublicKey,
};
use sha2::Digest;
use x509_parser::prelude::FromDer;

use crate::raw_signature::{
    oids::{EC_PUBLICKEY_OID, PRIME256V1_OID, SECP384R1_OID},
    RawSignatureValidationError, RawSignatureValidator,
};

/// Validates RSASSA-PKCS1-v1_5 signatures, as used by certificate, CRL,
/// OCSP, and CMS signatures.
pub(crate) enum RsaLegacyValidator {
    Sha256,
    Sha384,
    Sha512,
}

impl RawSignatureValidator for RsaLegacyValidator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let public_key = RsaPublicKey::from_public_key_der(public_key)
            .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

        let signature = rsa::pkcs1v15::Signature::try_from(sig)
            .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

        let result = match self {
            Self::Sha256 => rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public_key)
                .verify(data, &signature),
            Self::Sha384 => rsa::pkcs1v15::VerifyingKey::<Sha384>::new(public_key)
                .verify(data, &signature),
            Self::Sha512 => rsa::pkcs1v15::VerifyingKey::<Sha512>::new(public_key)
                .verify(data, &signature),
        };

        result.map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}

/// Validates RSASSA-PSS signatures, as produced by [`RsaSigner`].
///
/// [`RsaSigner`]: crate::raw_signature::signers::RsaSigner
pub(crate) enum RsaPssValidator {
    Sha256,
    Sha384,
    Sha512,
}

impl RawSignatureValidator for RsaPssValidator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let public_key = RsaPublicKey::from_public_key_der(public_key)
            .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

        let signature = rsa::pss::Signature::try_from(sig)
            .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

        let result = match self {
            Self::Sha256 => {
                rsa::pss::VerifyingKey::<Sha256>::new(public_key).verify(data, &signature)
            }
            Self::Sha384 => {
                rsa::pss::VerifyingKey::<Sha384>::new(public_key).verify(data, &signature)
            }
            Self::Sha512 => {
                rsa::pss::VerifyingKey::<Sha512>::new(public_key).verify(data, &signature)
            }
        };

        result.map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}

/// Validates ECDSA signatures (P-256 and P-384), accepting both ASN.1 DER
/// and fixed-size encodings of the signature value.
pub(crate) enum EcdsaValidator {
    Es256,
    Es384,
}

enum EcdsaCurve {
    P256,
    P384,
}

fn ec_curve_from_public_key_der(public_key: &[u8]) -> Option<EcdsaCurve> {
    let (_rem, spki) = x509_parser::x509::SubjectPublicKeyInfo::from_der(public_key).ok()?;

    if spki.algorithm.algorithm != EC_PUBLICKEY_OID {
        return None;
    }

    let curve = spki.algorithm.parameters.as_ref()?.as_oid().ok()?;

    if curve == PRIME256V1_OID {
        Some(EcdsaCurve::P256)
    } else if curve == SECP384R1_OID {
        Some(EcdsaCurve::P384)
    } else {
        None
    }
}

impl RawSignatureValidator for EcdsaValidator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        let digest = match self {
            Self::Es256 => Sha256::digest(data).to_vec(),
            Self::Es384 => Sha384::digest(data).to_vec(),
        };

        let curve = ec_curve_from_public_key_der(public_key)
            .ok_or(RawSignatureValidationError::InvalidPublicKey)?;

        let result = match curve {
            EcdsaCurve::P256 => {
                use p256::pkcs8::DecodePublicKey;

                let signature = ecdsa::Signature::<p256::NistP256>::from_der(sig)
                    .or_else(|_| ecdsa::Signature::<p256::NistP256>::from_slice(sig))
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

                let vk = p256::ecdsa::VerifyingKey::from_public_key_der(public_key)
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

                vk.verify_prehash(&digest, &signature)
            }
            EcdsaCurve::P384 => {
                use p384::pkcs8::DecodePublicKey;

                let signature = ecdsa::Signature::<p384::NistP384>::from_der(sig)
                    .or_else(|_| ecdsa::Signature::<p384::NistP384>::from_slice(sig))
                    .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

                let vk = p384::ecdsa::VerifyingKey::from_public_key_der(public_key)
                    .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

                vk.verify_prehash(&digest, &signature)
            }
        };

        result.map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}

/// Validates Ed25519 signatures.
pub(crate) struct Ed25519Validator;

impl RawSignatureValidator for Ed25519Validator {
    fn validate(
        &self,
        sig: &[u8],
        data: &[u8],
        public_key: &[u8],
    ) -> Result<(), RawSignatureValidationError> {
        use ed25519_dalek::{pkcs8::DecodePublicKey, Verifier, VerifyingKey};

        let vk = VerifyingKey::from_public_key_der(public_key)
            .map_err(|_| RawSignatureValidationError::InvalidPublicKey)?;

        let signature = ed25519_dalek::Signature::from_slice(sig)
            .map_err(|_| RawSignatureValidationError::InvalidSignature)?;

        vk.verify(data, &signature)
            .map_err(|_| RawSignatureValidationError::SignatureMismatch)
    }
}
