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

use thiserror::Error;
use x509_parser::{error::PEMError, pem::Pem};

use crate::raw_signature::{signers, SigningAlg};

/// Implementations of the `RawSigner` trait generate a cryptographic
/// signature over an arbitrary byte array.
///
/// A `RawSigner` stands in for the private key: key material may live in a
/// file, in memory, or behind an external service, and the signature engine
/// never sees it directly.
pub trait RawSigner: Send + Sync {
    /// Return a raw signature over the original byte slice.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, RawSignerError>;

    /// Return the algorithm implemented by this signer.
    fn alg(&self) -> SigningAlg;

    /// Return the signing certificate chain.
    ///
    /// Each certificate should be encoded in DER format and sequenced from
    /// end-entity certificate to the outermost certificate authority.
    fn cert_chain(&self) -> Result<Vec<Vec<u8>>, RawSignerError>;
}

/// Describes errors that can be identified when generating a raw signature.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum RawSignerError {
    /// An I/O error occurred. This typically happens when loading
    /// public/private key material from files.
    ///
    /// NOTE: We do not directly capture the I/O error itself because it
    /// lacks an `Eq` implementation. Instead we capture the error
    /// description.
    #[error("I/O error ({0})")]
    IoError(String),

    /// The private key or certificate chain could not be used.
    #[error("invalid signing credentials ({0})")]
    InvalidSigningCredentials(String),

    /// An unexpected internal error occurred while signing.
    #[error("internal error ({0})")]
    InternalError(String),
}

impl From<std::io::Error> for RawSignerError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// Return a built-in [`RawSigner`] for the requested signature algorithm,
/// configured from a PEM certificate chain and a PEM PKCS#8 private key.
pub fn signer_from_cert_chain_and_private_key(
    cert_chain: &[u8],
    private_key: &[u8],
    alg: SigningAlg,
) -> Result<Box<dyn RawSigner>, RawSignerError> {
    let cert_chain = Pem::iter_from_buffer(cert_chain)
        .map(|r| match r {
            Ok(pem) => Ok(pem.contents),
            Err(e) => Err(e),
        })
        .collect::<Result<Vec<Vec<u8>>, PEMError>>()
        .map_err(|e| RawSignerError::InvalidSigningCredentials(e.to_string()))?;

    match alg {
        SigningAlg::Ps256 | SigningAlg::Ps384 | SigningAlg::Ps512 => Ok(Box::new(
            signers::RsaSigner::from_pkcs8_pem(cert_chain, private_key, alg)?,
        )),

        SigningAlg::Es256 | SigningAlg::Es384 => Ok(Box::new(
            signers::EcdsaSigner::from_pkcs8_pem(cert_chain, private_key, alg)?,
        )),

        SigningAlg::Es512 => Err(RawSignerError::InternalError(
            "es512 signing is not supported".to_string(),
        )),

        SigningAlg::Ed25519 => Ok(Box::new(signers::Ed25519Signer::from_pkcs8_pem(
            cert_chain,
            private_key,
        )?)),
    }
}
