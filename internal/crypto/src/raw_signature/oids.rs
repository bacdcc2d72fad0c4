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

//! Object identifiers for the signature and hash algorithms this crate
//! dispatches on.
//!
//! Two renderings are kept: `der-parser` [`Oid`] constants for material
//! parsed with `x509-parser`, and plain arc slices for material parsed with
//! `rasn` (OCSP and CMS structures).

use rasn::types::ObjectIdentifier;
use x509_parser::der_parser::{oid, Oid};

pub(crate) const SHA256_WITH_RSAENCRYPTION_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .1 .11);
pub(crate) const SHA384_WITH_RSAENCRYPTION_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .1 .12);
pub(crate) const SHA512_WITH_RSAENCRYPTION_OID: Oid<'static> = oid!(1.2.840 .113549 .1 .1 .13);
pub(crate) const EC_PUBLICKEY_OID: Oid<'static> = oid!(1.2.840 .10045 .2 .1);
pub(crate) const ECDSA_WITH_SHA256_OID: Oid<'static> = oid!(1.2.840 .10045 .4 .3 .2);
pub(crate) const ECDSA_WITH_SHA384_OID: Oid<'static> = oid!(1.2.840 .10045 .4 .3 .3);
pub(crate) const ECDSA_WITH_SHA512_OID: Oid<'static> = oid!(1.2.840 .10045 .4 .3 .4);
pub(crate) const ED25519_OID: Oid<'static> = oid!(1.3.101 .112);
pub(crate) const PRIME256V1_OID: Oid<'static> = oid!(1.2.840 .10045 .3 .1 .7);
pub(crate) const SECP384R1_OID: Oid<'static> = oid!(1.3.132 .0 .34);

/// Arc-slice renderings for comparison against `rasn` object identifiers.
pub(crate) mod arcs {
    pub(crate) const SHA1: &[u32] = &[1, 3, 14, 3, 2, 26];
    pub(crate) const SHA256: &[u32] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
    pub(crate) const SHA384: &[u32] = &[2, 16, 840, 1, 101, 3, 4, 2, 2];
    pub(crate) const SHA512: &[u32] = &[2, 16, 840, 1, 101, 3, 4, 2, 3];
    pub(crate) const RSA: &[u32] = &[1, 2, 840, 113549, 1, 1, 1];
    pub(crate) const SHA256_WITH_RSAENCRYPTION: &[u32] = &[1, 2, 840, 113549, 1, 1, 11];
    pub(crate) const SHA384_WITH_RSAENCRYPTION: &[u32] = &[1, 2, 840, 113549, 1, 1, 12];
    pub(crate) const SHA512_WITH_RSAENCRYPTION: &[u32] = &[1, 2, 840, 113549, 1, 1, 13];
    pub(crate) const EC_PUBLICKEY: &[u32] = &[1, 2, 840, 10045, 2, 1];
    pub(crate) const ECDSA_WITH_SHA256: &[u32] = &[1, 2, 840, 10045, 4, 3, 2];
    pub(crate) const ECDSA_WITH_SHA384: &[u32] = &[1, 2, 840, 10045, 4, 3, 3];
    pub(crate) const ECDSA_WITH_SHA512: &[u32] = &[1, 2, 840, 10045, 4, 3, 4];
    pub(crate) const ED25519: &[u32] = &[1, 3, 101, 112];
    pub(crate) const SIGNED_DATA: &[u32] = &[1, 2, 840, 113549, 1, 7, 2];
    pub(crate) const TST_INFO: &[u32] = &[1, 2, 840, 113549, 1, 9, 16, 1, 4];
    pub(crate) const MESSAGE_DIGEST: &[u32] = &[1, 2, 840, 113549, 1, 9, 4];
}

/// Build a `rasn` [`ObjectIdentifier`] from a static arc slice.
pub(crate) fn rasn_oid(oid_arcs: &'static [u32]) -> Option<ObjectIdentifier> {
    rasn::types::Oid::new(oid_arcs).map(ObjectIdentifier::from)
}

/// Return `true` if `oid` denotes the same object identifier as `oid_arcs`.
pub(crate) fn rasn_oid_is(oid: &ObjectIdentifier, oid_arcs: &'static [u32]) -> bool {
    match rasn_oid(oid_arcs) {
        Some(expected) => *oid == expected,
        None => false,
    }
}
