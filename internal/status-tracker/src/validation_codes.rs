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

//! Status codes attached to validation [`LogItem`]s.
//!
//! Codes are stable identifiers the surrounding workflow can branch on
//! without parsing the human-readable descriptions.
//!
//! [`LogItem`]: crate::LogItem

/// The certificate bytes could not be parsed in the declared format.
pub const CERTIFICATE_MALFORMED: &str = "certificate.malformed";

/// The certificate's validity window has not started yet.
pub const CERTIFICATE_NOT_YET_VALID: &str = "certificate.notYetValid";

/// The certificate's validity window has ended.
pub const CERTIFICATE_EXPIRED: &str = "certificate.expired";

/// The certificate expires within the configured warning window.
pub const CERTIFICATE_EXPIRING_SOON: &str = "certificate.expiringSoon";

/// The certificate's validity window covers the evaluation time.
pub const CERTIFICATE_VALIDITY_OK: &str = "certificate.validityOk";

/// The certificate's key usage does not permit the requested purpose.
pub const CERTIFICATE_KEY_USAGE_INVALID: &str = "certificate.keyUsage.invalid";

/// The certificate's key usage permits the requested purpose.
pub const CERTIFICATE_KEY_USAGE_OK: &str = "certificate.keyUsage.ok";

/// A revocation source reports the certificate as revoked.
pub const CERTIFICATE_REVOKED: &str = "certificate.revoked";

/// A revocation source reports the certificate as good.
pub const REVOCATION_GOOD: &str = "revocation.good";

/// The certificate's revocation status could not be determined.
pub const REVOCATION_INDETERMINATE: &str = "revocation.indeterminate";

/// The certificate names no revocation source at all.
pub const REVOCATION_SOURCE_MISSING: &str = "revocation.sourceMissing";

/// A signature link in the certificate chain failed to verify.
pub const CHAIN_SIGNATURE_INVALID: &str = "chain.signature.invalid";

/// No certificate in the provided set matches an issuer DN in the chain.
pub const CHAIN_ISSUER_MISSING: &str = "chain.issuerMissing";

/// The chain exceeded the configured depth limit.
pub const CHAIN_DEPTH_EXCEEDED: &str = "chain.depthExceeded";

/// An issuer certificate in the chain is outside its validity window.
pub const CHAIN_ISSUER_NOT_VALID: &str = "chain.issuerNotValid";

/// The chain is well formed but does not reach a configured trust anchor.
pub const CHAIN_UNTRUSTED_ROOT: &str = "chain.untrustedRoot";

/// The chain reached a configured trust anchor.
pub const CHAIN_TRUSTED_ROOT_REACHED: &str = "chain.trustedRootReached";

/// The document digest does not match the digest bound by the signature.
pub const SIGNATURE_DIGEST_MISMATCH: &str = "signature.digestMismatch";

/// The cryptographic signature value does not verify against the signer's
/// public key.
pub const SIGNATURE_MISMATCH: &str = "signature.mismatch";

/// The cryptographic signature value verified.
pub const SIGNATURE_VALIDATED: &str = "signature.validated";

/// A counter-signature's parent signature failed validation.
pub const SIGNATURE_PARENT_INVALID: &str = "signature.parent.invalid";

/// Counter-signature nesting exceeded the supported depth.
pub const SIGNATURE_PARENT_DEPTH_EXCEEDED: &str = "signature.parent.depthExceeded";

/// A required time stamp token is absent from the signature record.
pub const TIME_STAMP_MISSING: &str = "timeStamp.missing";

/// The time stamp token could not be decoded or its imprint does not bind
/// the signature value.
pub const TIME_STAMP_MISMATCH: &str = "timeStamp.mismatch";

/// The time stamp token was not issued by a configured trusted authority.
pub const TIME_STAMP_UNTRUSTED: &str = "timeStamp.untrusted";

/// The time stamp token's time falls outside the signer certificate's
/// validity window.
pub const TIME_STAMP_OUTSIDE_VALIDITY: &str = "timeStamp.outsideCertificateValidity";

/// The time stamp token verified against a configured trusted authority.
pub const TIME_STAMP_VALIDATED: &str = "timeStamp.validated";
