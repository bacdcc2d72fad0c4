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

//! Functions for working with [RFC 3161] time stamp service providers.
//!
//! [RFC 3161]: https://www.ietf.org/rfc/rfc3161.txt

use std::time::Duration;

use rasn::types::Integer;
use thiserror::Error;

use crate::transport::{with_retry, TimestampTransport, TransportError};

pub(crate) mod rfc3161;

mod verify;
pub use verify::{verify_time_stamp_reply, TimeStampInfo};

/// Describes errors that can occur when requesting or verifying a time
/// stamp.
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum TimeStampError {
    /// The service answered but did not grant the request.
    #[error("time stamp service did not grant the request")]
    NotGranted,

    /// A time stamp structure could not be decoded.
    #[error("could not decode time stamp structure ({0})")]
    DecodeError(String),

    /// The token's message imprint does not bind the expected message.
    #[error("time stamp does not bind the expected message")]
    ImprintMismatch,

    /// The response does not reflect the nonce sent with the request.
    #[error("nonce in response does not match request")]
    NonceMismatch,

    /// The token's signature did not verify against its signer certificate.
    #[error("time stamp token signature did not verify")]
    SignatureInvalid,

    /// The token was not issued by a configured trusted authority.
    #[error("time stamp was not issued by a trusted authority")]
    Untrusted,

    /// The transport failed after its retry was exhausted.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An unexpected internal error occurred while requesting the time
    /// stamp.
    #[error("internal error ({0})")]
    InternalError(String),
}

/// Request an RFC 3161 time stamp over `message` from the TSA at `url`.
///
/// On success, returns the raw DER `TimeStampResp`, already checked to be
/// granted, to reflect the request nonce (when one was sent), and to carry
/// an imprint binding `message`.
pub fn request_time_stamp(
    transport: &dyn TimestampTransport,
    url: &str,
    message: &[u8],
    timeout: Duration,
    use_nonce: bool,
) -> Result<Vec<u8>, TimeStampError> {
    let nonce = if use_nonce {
        Some(Integer::from(rand::random::<u64>()))
    } else {
        None
    };

    let request = rfc3161::build_time_stamp_request(message, nonce.clone())?;

    let reply = with_retry("time stamp request", || {
        transport.request_time_stamp(url, &request, timeout)
    })?;

    let response = rfc3161::decode_reply(&reply)?;
    if !rfc3161::is_granted(&response) {
        return Err(TimeStampError::NotGranted);
    }

    let signed_data = rfc3161::signed_data_from_reply(&response)?;
    let tst_info = rfc3161::tst_info_from_signed_data(&signed_data)?;

    if let Some(nonce) = nonce {
        if tst_info.nonce != Some(nonce) {
            return Err(TimeStampError::NonceMismatch);
        }
    }

    if !rfc3161::imprint_matches(&tst_info.message_imprint, message) {
        return Err(TimeStampError::ImprintMismatch);
    }

    Ok(reply)
}
