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

use std::{sync::atomic::Ordering, time::Duration};

use crate::{
    hash::sha256,
    tests::test_utils::*,
    time_stamp::{request_time_stamp, verify_time_stamp_reply, TimeStampError},
    trust_anchor::TrustAnchorStore,
};

#[test]
fn fixture_reply_verifies_against_trusted_tsa() {
    let mut tsas = TrustAnchorStore::new();
    tsas.add_anchors_from_pem(TSA_PEM).unwrap();

    let info = verify_time_stamp_reply(TS_REPLY, ED_SIGNATURE, &tsas).unwrap();

    assert_eq!(info.gen_time.format("%Y-%m-%d").to_string(), "2026-08-07");
    assert_eq!(
        info.signer_fingerprint,
        hex::encode_upper(sha256(TSA_DER))
    );
}

#[test]
fn reply_is_untrusted_without_configured_tsa() {
    let tsas = TrustAnchorStore::new();

    let err = verify_time_stamp_reply(TS_REPLY, ED_SIGNATURE, &tsas).unwrap_err();
    assert_eq!(err, TimeStampError::Untrusted);
}

#[test]
fn reply_does_not_bind_a_different_message() {
    let tsas = trusted_tsas();

    let err = verify_time_stamp_reply(TS_REPLY, b"some other message", &tsas).unwrap_err();
    assert_eq!(err, TimeStampError::ImprintMismatch);
}

#[test]
fn request_without_nonce_accepts_fixture_reply() {
    let transport = FakeTimestampTransport::with_reply(TS_REPLY);

    let reply = request_time_stamp(
        transport.as_ref(),
        "http://tsa.veridoc.test/",
        ED_SIGNATURE,
        Duration::from_secs(5),
        false,
    )
    .unwrap();

    assert_eq!(reply, TS_REPLY.to_vec());
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn missing_nonce_reflection_is_rejected() {
    // The fixture reply carries no nonce; a nonced request must not accept
    // it.
    let transport = FakeTimestampTransport::with_reply(TS_REPLY);

    let err = request_time_stamp(
        transport.as_ref(),
        "http://tsa.veridoc.test/",
        ED_SIGNATURE,
        Duration::from_secs(5),
        true,
    )
    .unwrap_err();

    assert_eq!(err, TimeStampError::NonceMismatch);
}

#[test]
fn transport_failure_is_retried_once_then_surfaced() {
    let transport = FakeTimestampTransport::unavailable();

    let err = request_time_stamp(
        transport.as_ref(),
        "http://tsa.veridoc.test/",
        ED_SIGNATURE,
        Duration::from_secs(5),
        false,
    )
    .unwrap_err();

    assert!(matches!(err, TimeStampError::Transport(_)));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn reply_that_stamps_a_different_message_fails_at_request_time() {
    let transport = FakeTimestampTransport::with_reply(TS_REPLY);

    let err = request_time_stamp(
        transport.as_ref(),
        "http://tsa.veridoc.test/",
        b"not the stamped message",
        Duration::from_secs(5),
        false,
    )
    .unwrap_err();

    assert_eq!(err, TimeStampError::ImprintMismatch);
}
