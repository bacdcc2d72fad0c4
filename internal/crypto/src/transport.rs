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

//! Outbound transport seams for CRL, OCSP, and time stamp requests.
//!
//! All network traffic in this crate goes through these traits. The default
//! [`HttpTransport`] uses blocking HTTP with a caller-supplied timeout;
//! transient failures are retried at most once by [`with_retry`].

use std::{io::Read, time::Duration};

use thiserror::Error;

const HTTP_CONTENT_TYPE_OCSP_REQUEST: &str = "application/ocsp-request";
const HTTP_CONTENT_TYPE_TS_REQUEST: &str = "application/timestamp-query";

// Cap on response body size; a CRL or OCSP response larger than this is
// treated as a transport failure.
const MAX_RESPONSE_BYTES: u64 = 10_000_000;

/// Describes errors that can occur when talking to an external service.
///
/// Transport failures are deliberately distinct from "certificate is
/// revoked": absence of proof is not proof of validity, and callers map
/// exhausted transports to an indeterminate verdict.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// The service responded with an unexpected HTTP status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The request could not be sent or the response could not be read.
    #[error("I/O error ({0})")]
    Io(String),

    /// The supplied URL could not be parsed.
    #[error("invalid URL ({0})")]
    InvalidUrl(String),
}

/// Fetches revocation data (CRLs and OCSP responses) for the revocation
/// checker.
pub trait RevocationTransport: Send + Sync {
    /// Download the CRL published at `url`.
    fn fetch_crl(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Submit a DER-encoded OCSP request to the responder at `url` and
    /// return the raw DER response.
    fn post_ocsp(
        &self,
        url: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

/// Submits RFC 3161 time stamp requests to a time-stamping authority.
pub trait TimestampTransport: Send + Sync {
    /// Submit a DER-encoded `TimeStampReq` to the TSA at `url` and return
    /// the raw DER `TimeStampResp`.
    fn request_time_stamp(
        &self,
        url: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

/// Run `op`, retrying exactly once if it fails with a transient transport
/// error. HTTP status errors below 500 are not retried.
pub(crate) fn with_retry<T>(
    what: &str,
    op: impl Fn() -> Result<T, TransportError>,
) -> Result<T, TransportError> {
    match op() {
        Ok(value) => Ok(value),
        Err(TransportError::InvalidUrl(e)) => Err(TransportError::InvalidUrl(e)),
        Err(TransportError::Status(code)) if code < 500 => Err(TransportError::Status(code)),
        Err(first) => {
            log::warn!("{what} failed ({first}); retrying once");
            op().map_err(|second| {
                log::warn!("{what} failed after retry ({second})");
                second
            })
        }
    }
}

/// Default [`RevocationTransport`] and [`TimestampTransport`] over blocking
/// HTTP.
#[derive(Debug, Default)]
pub struct HttpTransport;

impl HttpTransport {
    fn read_body(response: ureq::Response) -> Result<Vec<u8>, TransportError> {
        let len = response
            .header("Content-Length")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(20000);

        let mut body: Vec<u8> = Vec::with_capacity(len);
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| TransportError::Io(e.to_string()))?;

        Ok(body)
    }

    fn map_err(timeout: Duration, err: ureq::Error) -> TransportError {
        match err {
            ureq::Error::Status(code, _) => TransportError::Status(code),
            ureq::Error::Transport(t) => {
                if matches!(t.kind(), ureq::ErrorKind::Io) && t.to_string().contains("timed out") {
                    TransportError::Timeout(timeout.as_secs())
                } else {
                    TransportError::Io(t.to_string())
                }
            }
        }
    }

    fn check_url(url: &str) -> Result<(), TransportError> {
        url::Url::parse(url)
            .map(|_| ())
            .map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))
    }
}

impl RevocationTransport for HttpTransport {
    fn fetch_crl(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        Self::check_url(url)?;
        log::debug!("fetching CRL from {url}");

        let response = ureq::get(url)
            .timeout(timeout)
            .call()
            .map_err(|e| Self::map_err(timeout, e))?;

        Self::read_body(response)
    }

    fn post_ocsp(
        &self,
        url: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        Self::check_url(url)?;
        log::debug!("submitting OCSP request to {url}");

        let response = ureq::post(url)
            .timeout(timeout)
            .set("Content-Type", HTTP_CONTENT_TYPE_OCSP_REQUEST)
            .send_bytes(request)
            .map_err(|e| Self::map_err(timeout, e))?;

        Self::read_body(response)
    }
}

impl TimestampTransport for HttpTransport {
    fn request_time_stamp(
        &self,
        url: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        Self::check_url(url)?;
        log::debug!("requesting time stamp from {url}");

        let response = ureq::post(url)
            .timeout(timeout)
            .set("Content-Type", HTTP_CONTENT_TYPE_TS_REQUEST)
            .send_bytes(request)
            .map_err(|e| Self::map_err(timeout, e))?;

        Self::read_body(response)
    }
}
