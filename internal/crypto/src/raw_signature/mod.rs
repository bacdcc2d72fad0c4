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

//! Tools for working with raw signature algorithms.
//!
//! Raw signatures here are the bare cryptographic values; the containers
//! around them (signature records, certificates, time stamp tokens) live in
//! the other modules of this crate.

pub(crate) mod oids;

mod signer;
pub use signer::{signer_from_cert_chain_and_private_key, RawSigner, RawSignerError};

mod signers;

mod signing_alg;
pub use signing_alg::{SigningAlg, UnknownAlgorithmError};

mod validator;
pub(crate) use validator::{validator_for_cert_alg, validator_for_rasn_algs};
pub use validator::{
    validator_for_signing_alg, RawSignatureValidationError, RawSignatureValidator,
};

mod validators;
