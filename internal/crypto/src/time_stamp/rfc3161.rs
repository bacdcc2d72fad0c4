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

//! RFC 3161 request/response structures, declared with `rasn`.

use rasn::{
    prelude::*,
    types::{GeneralizedTime, Utf8String},
    AsnType, Decode, Encode,
};
use rasn_cms::SignedData;
use rasn_pkix::{AlgorithmIdentifier, Extensions, GeneralName};

use crate::{
    hash::{sha256, sha384, sha512},
    raw_signature::oids::{arcs, rasn_oid, rasn_oid_is},
    time_stamp::TimeStampError,
};

/// RFC 3161 MessageImprint.
#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq)]
pub struct MessageImprint {
    /// Hash algorithm used over the stamped message.
    pub hash_algorithm: AlgorithmIdentifier,

    /// Hash of the stamped message.
    pub hashed_message: OctetString,
}

/// RFC 3161 TimeStampReq.
#[derive(AsnType, Clone, Debug, Decode, Encode)]
pub struct TimeStampReq {
    /// Always v1.
    pub version: Integer,

    /// Imprint of the message to stamp.
    pub message_imprint: MessageImprint,

    /// TSA policy under which the token should be issued.
    pub req_policy: Option<ObjectIdentifier>,

    /// Nonce to be reflected in the response.
    pub nonce: Option<Integer>,

    /// Whether the TSA should include its certificate in the token.
    #[rasn(default)]
    pub cert_req: bool,

    /// Request extensions.
    #[rasn(tag(0))]
    pub extensions: Option<Extensions>,
}

/// RFC 3161 PKIStatusInfo.
#[derive(AsnType, Clone, Debug, Decode, Encode)]
pub struct PkiStatusInfo {
    /// PKIStatus; 0 (granted) and 1 (grantedWithMods) carry a token.
    pub status: Integer,

    /// Human-readable status detail.
    pub status_string: Option<SequenceOf<Utf8String>>,

    /// PKIFailureInfo bits.
    pub fail_info: Option<BitString>,
}

/// RFC 3161 TimeStampResp.
#[derive(AsnType, Clone, Debug, Decode, Encode)]
pub struct TimeStampResp {
    /// Grant or failure status.
    pub status: PkiStatusInfo,

    /// The token itself: a CMS ContentInfo holding SignedData.
    pub time_stamp_token: Option<rasn_cms::ContentInfo>,
}

/// RFC 3161 Accuracy.
#[derive(AsnType, Clone, Debug, Decode, Encode)]
pub struct Accuracy {
    /// Whole seconds of accuracy.
    pub seconds: Option<Integer>,

    /// Milliseconds of accuracy.
    #[rasn(tag(0))]
    pub millis: Option<Integer>,

    /// Microseconds of accuracy.
    #[rasn(tag(1))]
    pub micros: Option<Integer>,
}

/// RFC 3161 TSTInfo, the signed content of a time stamp token.
#[derive(AsnType, Clone, Debug, Decode, Encode)]
pub struct TstInfo {
    /// Always v1.
    pub version: Integer,

    /// Policy under which the token was issued.
    pub policy: ObjectIdentifier,

    /// Imprint of the stamped message.
    pub message_imprint: MessageImprint,

    /// Token serial number, unique per TSA.
    pub serial_number: Integer,

    /// The attested time.
    pub gen_time: GeneralizedTime,

    /// Accuracy of `gen_time`.
    pub accuracy: Option<Accuracy>,

    /// Whether tokens from this TSA are strictly ordered by `gen_time`.
    #[rasn(default)]
    pub ordering: bool,

    /// Reflected request nonce.
    pub nonce: Option<Integer>,

    /// Name of the issuing TSA.
    #[rasn(tag(explicit(0)))]
    pub tsa: Option<GeneralName>,

    /// Token extensions.
    #[rasn(tag(1))]
    pub extensions: Option<Extensions>,
}

/// Build a DER-encoded TimeStampReq with a SHA-256 imprint over `message`.
pub(crate) fn build_time_stamp_request(
    message: &[u8],
    nonce: Option<Integer>,
) -> Result<Vec<u8>, TimeStampError> {
    let sha256_oid = rasn_oid(arcs::SHA256)
        .ok_or_else(|| TimeStampError::InternalError("oid".to_string()))?;

    // Some TSAs expect the algorithm parameters to be NULL, not absent.
    let null_params =
        rasn::der::encode(&()).map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

    let message_imprint = MessageImprint {
        hash_algorithm: AlgorithmIdentifier {
            algorithm: sha256_oid,
            parameters: Some(Any::new(null_params)),
        },
        hashed_message: OctetString::from(sha256(message)),
    };

    let request = TimeStampReq {
        version: Integer::from(1u8),
        message_imprint,
        req_policy: None,
        nonce,
        cert_req: true,
        extensions: None,
    };

    rasn::der::encode(&request).map_err(|e| TimeStampError::DecodeError(e.to_string()))
}

/// Decode a DER-encoded TimeStampResp.
pub(crate) fn decode_reply(reply_der: &[u8]) -> Result<TimeStampResp, TimeStampError> {
    rasn::der::decode(reply_der).map_err(|e| TimeStampError::DecodeError(e.to_string()))
}

/// Return `true` if the response status grants a token.
pub(crate) fn is_granted(response: &TimeStampResp) -> bool {
    response.status.status == Integer::from(0u8) || response.status.status == Integer::from(1u8)
}

/// Extract the CMS SignedData from a granted response.
pub(crate) fn signed_data_from_reply(
    response: &TimeStampResp,
) -> Result<SignedData, TimeStampError> {
    let token = response
        .time_stamp_token
        .as_ref()
        .ok_or_else(|| TimeStampError::DecodeError("response carries no token".to_string()))?;

    if !rasn_oid_is(&token.content_type, arcs::SIGNED_DATA) {
        return Err(TimeStampError::DecodeError(
            "token content is not SignedData".to_string(),
        ));
    }

    rasn::der::decode(token.content.as_bytes())
        .map_err(|e| TimeStampError::DecodeError(e.to_string()))
}

/// Extract and decode the TSTInfo carried by a token's SignedData.
pub(crate) fn tst_info_from_signed_data(
    signed_data: &SignedData,
) -> Result<TstInfo, TimeStampError> {
    let eci = &signed_data.encap_content_info;

    if !rasn_oid_is(&eci.content_type, arcs::TST_INFO) {
        return Err(TimeStampError::DecodeError(
            "encapsulated content is not TSTInfo".to_string(),
        ));
    }

    let content = eci
        .content
        .as_ref()
        .ok_or_else(|| TimeStampError::DecodeError("token carries no content".to_string()))?;

    let octets: OctetString = rasn::der::decode(&content[..])
        .map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

    rasn::der::decode(&octets).map_err(|e| TimeStampError::DecodeError(e.to_string()))
}

/// The raw TSTInfo octets a token's signer attributes digest over.
pub(crate) fn econtent_octets(signed_data: &SignedData) -> Result<Vec<u8>, TimeStampError> {
    let content = signed_data
        .encap_content_info
        .content
        .as_ref()
        .ok_or_else(|| TimeStampError::DecodeError("token carries no content".to_string()))?;

    let octets: OctetString = rasn::der::decode(&content[..])
        .map_err(|e| TimeStampError::DecodeError(e.to_string()))?;

    Ok(octets.to_vec())
}

/// Return `true` if the imprint is a supported hash of `message`.
pub(crate) fn imprint_matches(imprint: &MessageImprint, message: &[u8]) -> bool {
    let alg = &imprint.hash_algorithm.algorithm;

    let digest = if rasn_oid_is(alg, arcs::SHA256) {
        sha256(message)
    } else if rasn_oid_is(alg, arcs::SHA384) {
        sha384(message)
    } else if rasn_oid_is(alg, arcs::SHA512) {
        sha512(message)
    } else {
        return false;
    };

    imprint.hashed_message.as_ref() == digest.as_slice()
}
