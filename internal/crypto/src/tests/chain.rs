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

use veridoc_status_tracker::{validation_codes::*, StatusTracker, ValidationStatus};

use crate::{chain::ChainValidator, tests::test_utils::*, trust_anchor::TrustAnchorStore};

#[test]
fn chain_to_configured_anchor_is_valid() {
    let anchors = anchors_with_root();
    let clock = clock_at(2025, 6, 1);
    let validator = ChainValidator::new(&anchors, 10, clock.as_ref());

    let mut log = StatusTracker::default();
    let result = validator.build_and_validate(SIGNER_RSA_DER, &chain_pool(), &mut log);

    assert_eq!(result.status, ValidationStatus::Valid);
    assert!(result.trusted_root_reached);
    assert_eq!(result.path.len(), 3);
    assert!(result.path[0].subject.contains("signer_rsa"));
    assert!(result.path[2].subject.contains("Root CA"));
    assert!(log.has_status(CHAIN_TRUSTED_ROOT_REACHED));
}

#[test]
fn ec_leaf_chains_to_anchor() {
    let anchors = anchors_with_root();
    let clock = clock_at(2025, 6, 1);
    let validator = ChainValidator::new(&anchors, 10, clock.as_ref());

    let mut log = StatusTracker::default();
    let result = validator.build_and_validate(SIGNER_EC_DER, &chain_pool(), &mut log);

    assert_eq!(result.status, ValidationStatus::Valid);
    assert!(result.trusted_root_reached);
}

#[test]
fn well_formed_chain_without_anchor_is_warning_not_invalid() {
    let anchors = TrustAnchorStore::new();
    let clock = clock_at(2025, 6, 1);
    let validator = ChainValidator::new(&anchors, 10, clock.as_ref());

    let mut log = StatusTracker::default();
    let result = validator.build_and_validate(SIGNER_RSA_DER, &chain_pool(), &mut log);

    assert_eq!(result.status, ValidationStatus::Warning);
    assert!(!result.trusted_root_reached);
    assert_eq!(result.path.len(), 3);
    assert!(log.has_status(CHAIN_UNTRUSTED_ROOT));
}

#[test]
fn missing_issuer_link_is_invalid_with_partial_path() {
    let anchors = anchors_with_root();
    let clock = clock_at(2025, 6, 1);
    let validator = ChainValidator::new(&anchors, 10, clock.as_ref());

    // Only the root is provided; the issuing CA link is missing.
    let provided = vec![ROOT_DER.to_vec()];
    let mut log = StatusTracker::default();
    let result = validator.build_and_validate(SIGNER_RSA_DER, &provided, &mut log);

    assert_eq!(result.status, ValidationStatus::Invalid);
    assert!(!result.trusted_root_reached);
    assert_eq!(result.path.len(), 1);
    assert!(log.has_status(CHAIN_ISSUER_MISSING));
}

#[test]
fn depth_limit_stops_the_walk() {
    let anchors = anchors_with_root();
    let clock = clock_at(2025, 6, 1);
    let validator = ChainValidator::new(&anchors, 0, clock.as_ref());

    let mut log = StatusTracker::default();
    let result = validator.build_and_validate(SIGNER_RSA_DER, &chain_pool(), &mut log);

    assert_eq!(result.status, ValidationStatus::Invalid);
    assert!(log.has_status(CHAIN_DEPTH_EXCEEDED));
}

#[test]
fn tampered_signature_breaks_the_link() {
    let anchors = anchors_with_root();
    let clock = clock_at(2025, 6, 1);
    let validator = ChainValidator::new(&anchors, 10, clock.as_ref());

    let mut tampered = SIGNER_RSA_DER.to_vec();
    let last = tampered.len() - 1;
    tampered[last] ^= 0xFF;

    let mut log = StatusTracker::default();
    let result = validator.build_and_validate(&tampered, &chain_pool(), &mut log);

    assert_eq!(result.status, ValidationStatus::Invalid);
    assert!(!result.trusted_root_reached);
    assert!(log.has_status(CHAIN_SIGNATURE_INVALID));
}

#[test]
fn leaf_that_is_itself_an_anchor_is_trusted() {
    let anchors = anchors_with_root();
    let clock = clock_at(2025, 6, 1);
    let validator = ChainValidator::new(&anchors, 10, clock.as_ref());

    let mut log = StatusTracker::default();
    let result = validator.build_and_validate(ROOT_DER, &[], &mut log);

    assert_eq!(result.status, ValidationStatus::Valid);
    assert!(result.trusted_root_reached);
    assert_eq!(result.path.len(), 1);
}
