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

//! Shared fixtures and fakes.
//!
//! The PKI under `fixtures/` is generated by `fixtures/gen_fixtures.sh`:
//! a root CA and issuing CA valid 2024-01-01 through 2034-01-01, RSA and
//! EC signers expiring 2026-01-01, a long-lived Ed25519 signer with no
//! revocation sources, a revoked certificate with its CRL and OCSP
//! responses, and an RFC 3161 reply binding a deterministic Ed25519
//! signature over the sample document digest.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    certificate::{decode_certificate, Certificate},
    time::{ClockSource, FixedClock},
    transport::{RevocationTransport, TimestampTransport, TransportError},
    trust_anchor::TrustAnchorStore,
};

pub(crate) const ROOT_DER: &[u8] = include_bytes!("fixtures/root.der");
pub(crate) const ROOT_PEM: &[u8] = include_bytes!("fixtures/root.pem");
pub(crate) const ISSUING_DER: &[u8] = include_bytes!("fixtures/issuing.der");
pub(crate) const ISSUING_PEM: &[u8] = include_bytes!("fixtures/issuing.pem");
pub(crate) const SIGNER_RSA_DER: &[u8] = include_bytes!("fixtures/signer_rsa.der");
pub(crate) const SIGNER_RSA_PEM: &[u8] = include_bytes!("fixtures/signer_rsa.pem");
pub(crate) const SIGNER_RSA_KEY: &[u8] = include_bytes!("fixtures/signer_rsa.key");
pub(crate) const SIGNER_RSA_P12: &[u8] = include_bytes!("fixtures/signer_rsa.p12");
pub(crate) const SIGNER_EC_DER: &[u8] = include_bytes!("fixtures/signer_ec.der");
pub(crate) const SIGNER_EC_KEY: &[u8] = include_bytes!("fixtures/signer_ec.key");
pub(crate) const SIGNER_ED_DER: &[u8] = include_bytes!("fixtures/signer_ed.der");
pub(crate) const SIGNER_ED_PEM: &[u8] = include_bytes!("fixtures/signer_ed.pem");
pub(crate) const SIGNER_ED_KEY: &[u8] = include_bytes!("fixtures/signer_ed.key");
pub(crate) const REVOKED_DER: &[u8] = include_bytes!("fixtures/revoked.der");
pub(crate) const TSA_DER: &[u8] = include_bytes!("fixtures/tsa.der");
pub(crate) const TSA_PEM: &[u8] = include_bytes!("fixtures/tsa.pem");
pub(crate) const CRL_DER: &[u8] = include_bytes!("fixtures/issuing.crl");
pub(crate) const OCSP_GOOD: &[u8] = include_bytes!("fixtures/ocsp_good.der");
pub(crate) const OCSP_REVOKED: &[u8] = include_bytes!("fixtures/ocsp_revoked.der");
pub(crate) const DOCUMENT_DIGEST: &[u8] = include_bytes!("fixtures/digest.bin");
pub(crate) const ED_SIGNATURE: &[u8] = include_bytes!("fixtures/sig_ed.bin");
pub(crate) const TS_REPLY: &[u8] = include_bytes!("fixtures/ts_resp.tsr");

pub(crate) fn cert(der: &[u8]) -> Certificate {
    decode_certificate(der).unwrap()
}

pub(crate) fn clock_at(year: i32, month: u32, day: u32) -> Arc<FixedClock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
    ))
}

pub(crate) fn anchors_with_root() -> TrustAnchorStore {
    let mut anchors = TrustAnchorStore::new();
    anchors.add_anchor_der(ROOT_DER.to_vec());
    anchors
}

pub(crate) fn trusted_tsas() -> TrustAnchorStore {
    let mut tsas = TrustAnchorStore::new();
    tsas.add_anchor_der(TSA_DER.to_vec());
    tsas
}

pub(crate) fn chain_pool() -> Vec<Vec<u8>> {
    vec![ISSUING_DER.to_vec(), ROOT_DER.to_vec()]
}

/// A clock tests can move forward to age cache entries.
#[derive(Debug)]
pub(crate) struct SteppingClock(Mutex<DateTime<Utc>>);

impl SteppingClock {
    pub(crate) fn starting_at(at: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(at)))
    }

    pub(crate) fn advance_secs(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::seconds(secs);
    }
}

impl ClockSource for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Serves canned CRL and OCSP payloads, counting calls.
#[derive(Default)]
pub(crate) struct FakeRevocationTransport {
    pub(crate) crl: Option<Vec<u8>>,
    pub(crate) ocsp: Option<Vec<u8>>,
    pub(crate) crl_calls: AtomicUsize,
    pub(crate) ocsp_calls: AtomicUsize,
}

impl FakeRevocationTransport {
    pub(crate) fn with_crl(crl: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            crl: Some(crl.to_vec()),
            ..Self::default()
        })
    }

    pub(crate) fn with_crl_and_ocsp(crl: &[u8], ocsp: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            crl: Some(crl.to_vec()),
            ocsp: Some(ocsp.to_vec()),
            ..Self::default()
        })
    }

    pub(crate) fn unavailable() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl RevocationTransport for FakeRevocationTransport {
    fn fetch_crl(&self, _url: &str, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.crl_calls.fetch_add(1, Ordering::SeqCst);
        self.crl
            .clone()
            .ok_or_else(|| TransportError::Io("CRL endpoint unavailable".to_string()))
    }

    fn post_ocsp(
        &self,
        _url: &str,
        _request: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.ocsp_calls.fetch_add(1, Ordering::SeqCst);
        self.ocsp
            .clone()
            .ok_or_else(|| TransportError::Io("OCSP responder unavailable".to_string()))
    }
}

/// Serves a canned RFC 3161 reply, counting calls.
#[derive(Default)]
pub(crate) struct FakeTimestampTransport {
    pub(crate) reply: Option<Vec<u8>>,
    pub(crate) calls: AtomicUsize,
}

impl FakeTimestampTransport {
    pub(crate) fn with_reply(reply: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_vec()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn unavailable() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl TimestampTransport for FakeTimestampTransport {
    fn request_time_stamp(
        &self,
        _url: &str,
        _request: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .clone()
            .ok_or_else(|| TransportError::Io("TSA unavailable".to_string()))
    }
}
