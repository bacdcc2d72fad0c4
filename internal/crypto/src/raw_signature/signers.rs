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

//! Built-in [`RawSigner`] implementations over the pure-Rust crypto stack.

use ed25519_dalek::Signer as _;
use rsa::{
    pkcs8::DecodePrivateKey,
    pss::SigningKey,
    sha2::{Sha256, Sha384, Sha512},
    signature::{RandomizedSigner, SignatureEncoding, Signer},
    RsaPrivateKey,
};

use crate::raw_signature::{RawSigner, RawSignerError, SigningAlg};

fn pem_str(private_key: &[u8]) -> Result<&str, RawSignerError> {
    std::str::from_utf8(private_key)
        .map_err(|e| RawSignerError::InvalidSigningCredentials(e.to_string()))
}

/// Signs with RSASSA-PSS using the `rsa` crate.
pub(crate) struct RsaSigner {
    alg: SigningAlg,
    cert_chain: Vec<Vec<u8>>,
    private_key: RsaPrivateKey,
}

impl RsaSigner {
    pub(crate) fn from_pkcs8_pem(
        cert_chain: Vec<Vec<u8>>,
        private_key: &[u8],
        alg: SigningAlg,
    ) -> Result<Self, RawSignerError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem_str(private_key)?)
            .map_err(|e| RawSignerError::InvalidSigningCredentials(e.to_string()))?;

        if !matches!(alg, SigningAlg::Ps256 | SigningAlg::Ps384 | SigningAlg::Ps512) {
            return Err(RawSignerError::InternalError(
                "RsaSigner should be used only for SigningAlg::Ps***".to_string(),
            ));
        }

        Ok(Self {
            alg,
            cert_chain,
            private_key,
        })
    }
}

impl RawSigner for RsaSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, RawSignerError> {
        let mut rng = rand::thread_rng();

        match self.alg {
            SigningAlg::Ps256 => {
                let s = SigningKey::<Sha256>::new(self.private_key.clone());
                let sig = s.sign_with_rng(&mut rng, data);
                Ok(sig.to_bytes().to_vec())
            }

            SigningAlg::Ps384 => {
                let s = SigningKey::<Sha384>::new(self.private_key.clone());
                let sig = s.sign_with_rng(&mut rng, data);
                Ok(sig.to_bytes().to_vec())
            }

            _ => {
                let s = SigningKey::<Sha512>::new(self.private_key.clone());
                let sig = s.sign_with_rng(&mut rng, data);
                Ok(sig.to_bytes().to_vec())
            }
        }
    }

    fn alg(&self) -> SigningAlg {
        self.alg
    }

    fn cert_chain(&self) -> Result<Vec<Vec<u8>>, RawSignerError> {
        Ok(self.cert_chain.clone())
    }
}

enum EcdsaSigningKey {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

/// Signs with ECDSA (P-256 or P-384) using the RustCrypto elliptic curve
/// crates. Signatures are deterministic per RFC 6979.
pub(crate) struct EcdsaSigner {
    key: EcdsaSigningKey,
    cert_chain: Vec<Vec<u8>>,
}

impl EcdsaSigner {
    pub(crate) fn from_pkcs8_pem(
        cert_chain: Vec<Vec<u8>>,
        private_key: &[u8],
        alg: SigningAlg,
    ) -> Result<Self, RawSignerError> {
        let pem = pem_str(private_key)?;

        let key = match alg {
            SigningAlg::Es256 => {
                use p256::pkcs8::DecodePrivateKey;
                EcdsaSigningKey::P256(
                    p256::ecdsa::SigningKey::from_pkcs8_pem(pem)
                        .map_err(|e| RawSignerError::InvalidSigningCredentials(e.to_string()))?,
                )
            }
            SigningAlg::Es384 => {
                use p384::pkcs8::DecodePrivateKey;
                EcdsaSigningKey::P384(
                    p384::ecdsa::SigningKey::from_pkcs8_pem(pem)
                        .map_err(|e| RawSignerError::InvalidSigningCredentials(e.to_string()))?,
                )
            }
            _ => {
                return Err(RawSignerError::InternalError(
                    "EcdsaSigner should be used only for SigningAlg::Es256/Es384".to_string(),
                ));
            }
        };

        Ok(Self { key, cert_chain })
    }
}

impl RawSigner for EcdsaSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, RawSignerError> {
        match &self.key {
            EcdsaSigningKey::P256(key) => {
                let sig: p256::ecdsa::Signature = key.sign(data);
                Ok(sig.to_vec())
            }
            EcdsaSigningKey::P384(key) => {
                let sig: p384::ecdsa::Signature = key.sign(data);
                Ok(sig.to_vec())
            }
        }
    }

    fn alg(&self) -> SigningAlg {
        match self.key {
            EcdsaSigningKey::P256(_) => SigningAlg::Es256,
            EcdsaSigningKey::P384(_) => SigningAlg::Es384,
        }
    }

    fn cert_chain(&self) -> Result<Vec<Vec<u8>>, RawSignerError> {
        Ok(self.cert_chain.clone())
    }
}

/// Signs with Ed25519 using `ed25519-dalek`. Signatures are deterministic
/// per RFC 8032.
pub(crate) struct Ed25519Signer {
    key: ed25519_dalek::SigningKey,
    cert_chain: Vec<Vec<u8>>,
}

impl Ed25519Signer {
    pub(crate) fn from_pkcs8_pem(
        cert_chain: Vec<Vec<u8>>,
        private_key: &[u8],
    ) -> Result<Self, RawSignerError> {
        use ed25519_dalek::pkcs8::DecodePrivateKey;

        let key = ed25519_dalek::SigningKey::from_pkcs8_pem(pem_str(private_key)?)
            .map_err(|e| RawSignerError::InvalidSigningCredentials(e.to_string()))?;

        Ok(Self { key, cert_chain })
    }
}

impl RawSigner for Ed25519Signer {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, RawSignerError> {
        let sig = self.key.sign(data);
        Ok(sig.to_bytes().to_vec())
    }

    fn alg(&self) -> SigningAlg {
        SigningAlg::Ed25519
    }

    fn cert_chain(&self) -> Result<Vec<Vec<u8>>, RawSignerError> {
        Ok(self.cert_chain.clone())
    }
}
