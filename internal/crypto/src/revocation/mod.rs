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

//! Certificate revocation checking via CRL and OCSP.
//!
//! CRL and OCSP are independent checks; a `revoked` result from either is
//! authoritative regardless of the other's outcome. Transport failures and
//! unusable responses degrade to an indeterminate status, never to `good`:
//! absence of proof is not proof of validity.
//!
//! Results are cached per (certificate serial, source URL) with a TTL. The
//! cache is the only shared mutable state in this crate; entries are
//! idempotently overwritable, so last-writer-wins is safe, and a cache write
//! happens only after a fetch has fully completed.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::{
    certificate::Certificate,
    time::ClockSource,
    transport::{with_retry, RevocationTransport},
};

mod crl;
mod ocsp;

/// Live revocation status of a certificate, as reported by one source.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum RevocationStatus {
    /// The source affirms the certificate is not revoked.
    Good,

    /// The source reports the certificate as revoked.
    Revoked {
        /// When the certificate was revoked, if reported.
        at: Option<DateTime<Utc>>,

        /// The revocation reason, if reported.
        reason: Option<String>,
    },

    /// The status could not be determined.
    Indeterminate {
        /// Why no determination could be made.
        reason: String,
    },
}

impl RevocationStatus {
    /// Return `true` for a revoked status.
    pub fn is_revoked(&self) -> bool {
        matches!(self, Self::Revoked { .. })
    }

    /// Return `true` for a good status.
    pub fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }
}

/// The result of consulting one revocation source for one certificate.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RevocationOutcome {
    /// The reported status.
    pub status: RevocationStatus,

    /// The source URL consulted, when one was.
    pub source: Option<String>,

    /// When the source was consulted.
    pub checked_at: DateTime<Utc>,

    /// `true` if this outcome was served from the revocation cache.
    pub from_cache: bool,
}

/// A cached revocation determination, keyed by (serial, source URL).
///
/// Entries older than their TTL are stale and must be refreshed before
/// being trusted.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RevocationCacheEntry {
    /// Uppercase hex serial of the certificate checked.
    pub serial_hex: String,

    /// The source URL that produced this determination.
    pub source_url: String,

    /// The determination itself.
    pub status: RevocationStatus,

    /// When the source was last consulted.
    pub checked_at: DateTime<Utc>,

    /// Seconds this entry remains fresh after `checked_at`.
    pub ttl_secs: u64,
}

impl RevocationCacheEntry {
    /// Return `true` if this entry is still fresh at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now - self.checked_at;
        age >= chrono::Duration::zero() && age.num_seconds() as u64 <= self.ttl_secs
    }
}

/// Consults CRL and OCSP sources to determine a certificate's live status.
pub struct RevocationChecker {
    transport: Arc<dyn RevocationTransport>,
    clock: Arc<dyn ClockSource>,
    cache: DashMap<(String, String), RevocationCacheEntry>,
    ttl_secs: u64,
    timeout: Duration,
}

impl RevocationChecker {
    /// Create a checker over the given transport and clock.
    ///
    /// `ttl_secs` bounds how long determinations are cached;
    /// `timeout_secs` bounds each network call.
    pub fn new(
        transport: Arc<dyn RevocationTransport>,
        clock: Arc<dyn ClockSource>,
        ttl_secs: u64,
        timeout_secs: u64,
    ) -> Self {
        Self {
            transport,
            clock,
            cache: DashMap::new(),
            ttl_secs,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Check the certificate against its CRL distribution points.
    ///
    /// With no CRL URL configured this returns an indeterminate outcome with
    /// reason "no CRL available"; that is not an error. When `issuer` is
    /// supplied, the CRL's signature is verified against the issuer's public
    /// key before its entries are trusted.
    pub fn check_crl(
        &self,
        certificate: &Certificate,
        issuer: Option<&Certificate>,
    ) -> RevocationOutcome {
        let now = self.clock.now();

        if certificate.crl_urls.is_empty() {
            return RevocationOutcome {
                status: RevocationStatus::Indeterminate {
                    reason: "no CRL available".to_string(),
                },
                source: None,
                checked_at: now,
                from_cache: false,
            };
        }

        let serial_hex = certificate.serial_hex();
        let mut last_reason = String::new();

        for url in &certificate.crl_urls {
            if let Some(hit) = self.cached(&serial_hex, url) {
                return hit;
            }

            let fetched = with_retry("CRL fetch", || {
                self.transport.fetch_crl(url, self.timeout)
            });

            let crl_der = match fetched {
                Ok(bytes) => bytes,
                Err(err) => {
                    last_reason = format!("CRL fetch failed ({err})");
                    continue;
                }
            };

            match crl::status_for_certificate(&crl_der, certificate, issuer, now) {
                Ok(status) => {
                    self.store(&serial_hex, url, status.clone(), self.ttl_secs, now);
                    return RevocationOutcome {
                        status,
                        source: Some(url.clone()),
                        checked_at: now,
                        from_cache: false,
                    };
                }
                Err(err) => {
                    log::warn!("CRL from {url} unusable: {err}");
                    last_reason = format!("CRL unusable ({err})");
                }
            }
        }

        RevocationOutcome {
            status: RevocationStatus::Indeterminate {
                reason: last_reason,
            },
            source: None,
            checked_at: now,
            from_cache: false,
        }
    }

    /// Check the certificate against its OCSP responders.
    ///
    /// The issuer certificate is required to bind the request (issuer name
    /// and key hashes). A transport failure or unparsable response yields an
    /// indeterminate outcome, never `good`.
    pub fn check_ocsp(
        &self,
        certificate: &Certificate,
        issuer: &Certificate,
    ) -> RevocationOutcome {
        let now = self.clock.now();

        if certificate.ocsp_urls.is_empty() {
            return RevocationOutcome {
                status: RevocationStatus::Indeterminate {
                    reason: "no OCSP responder available".to_string(),
                },
                source: None,
                checked_at: now,
                from_cache: false,
            };
        }

        let serial_hex = certificate.serial_hex();

        let request = match ocsp::build_request(certificate, issuer) {
            Ok(request) => request,
            Err(err) => {
                return RevocationOutcome {
                    status: RevocationStatus::Indeterminate {
                        reason: format!("could not build OCSP request ({err})"),
                    },
                    source: None,
                    checked_at: now,
                    from_cache: false,
                };
            }
        };

        let mut last_reason = String::new();

        for url in &certificate.ocsp_urls {
            if let Some(hit) = self.cached(&serial_hex, url) {
                return hit;
            }

            let posted = with_retry("OCSP query", || {
                self.transport.post_ocsp(url, &request, self.timeout)
            });

            let response_der = match posted {
                Ok(bytes) => bytes,
                Err(err) => {
                    last_reason = format!("OCSP query failed ({err})");
                    continue;
                }
            };

            match ocsp::assess_response(&response_der, certificate, issuer, now) {
                Ok(assessment) => {
                    let ttl = match assessment.next_update {
                        Some(next_update) => {
                            let until = (next_update - now).num_seconds().max(0) as u64;
                            self.ttl_secs.min(until)
                        }
                        None => self.ttl_secs,
                    };

                    self.store(&serial_hex, url, assessment.status.clone(), ttl, now);
                    return RevocationOutcome {
                        status: assessment.status,
                        source: Some(url.clone()),
                        checked_at: now,
                        from_cache: false,
                    };
                }
                Err(err) => {
                    log::warn!("OCSP response from {url} unusable: {err}");
                    last_reason = format!("OCSP response unusable ({err})");
                }
            }
        }

        RevocationOutcome {
            status: RevocationStatus::Indeterminate {
                reason: last_reason,
            },
            source: None,
            checked_at: now,
            from_cache: false,
        }
    }

    /// Run every applicable revocation check for the certificate.
    pub fn check(
        &self,
        certificate: &Certificate,
        issuer: Option<&Certificate>,
    ) -> Vec<RevocationOutcome> {
        let mut outcomes = vec![self.check_crl(certificate, issuer)];

        if let Some(issuer) = issuer {
            if !certificate.ocsp_urls.is_empty() {
                outcomes.push(self.check_ocsp(certificate, issuer));
            }
        }

        outcomes
    }

    /// Combine outcomes fail-closed: any `revoked` is authoritative, then
    /// any `good`, then indeterminate.
    pub fn combined_status(outcomes: &[RevocationOutcome]) -> RevocationStatus {
        for outcome in outcomes {
            if outcome.status.is_revoked() {
                return outcome.status.clone();
            }
        }

        for outcome in outcomes {
            if outcome.status.is_good() {
                return outcome.status.clone();
            }
        }

        outcomes
            .iter()
            .map(|o| o.status.clone())
            .next()
            .unwrap_or(RevocationStatus::Indeterminate {
                reason: "no revocation source consulted".to_string(),
            })
    }

    /// Number of live cache entries.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn cached(&self, serial_hex: &str, url: &str) -> Option<RevocationOutcome> {
        let key = (serial_hex.to_string(), url.to_string());
        let entry = self.cache.get(&key)?;
        let now = self.clock.now();

        if !entry.is_fresh(now) {
            return None;
        }

        Some(RevocationOutcome {
            status: entry.status.clone(),
            source: Some(url.to_string()),
            checked_at: entry.checked_at,
            from_cache: true,
        })
    }

    fn store(
        &self,
        serial_hex: &str,
        url: &str,
        status: RevocationStatus,
        ttl_secs: u64,
        now: DateTime<Utc>,
    ) {
        self.cache.insert(
            (serial_hex.to_string(), url.to_string()),
            RevocationCacheEntry {
                serial_hex: serial_hex.to_string(),
                source_url: url.to_string(),
                status,
                checked_at: now,
                ttl_secs,
            },
        );
    }
}
