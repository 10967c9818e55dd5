//! Compact HS256 token codec: `base64url(header).base64url(claims).base64url(mac)`, unpadded.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;
// self
use crate::_prelude::*;

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";
const TYP: &str = "JWT";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
	alg: String,
	typ: String,
}

/// Codec failures. Everything except [`CodecError::Encode`] means the token must be rejected.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CodecError {
	/// Wrong number of segments or a segment is not base64url/JSON.
	#[error("Token is malformed.")]
	Malformed,
	/// Header names an algorithm or type other than HS256/JWT.
	#[error("Token header is unsupported.")]
	UnsupportedHeader,
	/// MAC does not match the signing input.
	#[error("Token signature does not verify.")]
	BadSignature,
	/// Claims could not be serialized or the key was refused.
	#[error("Token could not be encoded: {0}.")]
	Encode(String),
}

pub(crate) fn encode<T>(key: &[u8], claims: &T) -> Result<String, CodecError>
where
	T: Serialize,
{
	let header = Header { alg: ALG.into(), typ: TYP.into() };
	let header_json = serde_json::to_vec(&header).map_err(|e| CodecError::Encode(e.to_string()))?;
	let claims_json = serde_json::to_vec(claims).map_err(|e| CodecError::Encode(e.to_string()))?;
	let signing_input =
		format!("{}.{}", URL_SAFE_NO_PAD.encode(header_json), URL_SAFE_NO_PAD.encode(claims_json));
	let mut mac = HmacSha256::new_from_slice(key).map_err(|e| CodecError::Encode(e.to_string()))?;

	mac.update(signing_input.as_bytes());

	let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

	Ok(format!("{signing_input}.{signature}"))
}

pub(crate) fn decode<T>(key: &[u8], token: &str) -> Result<T, CodecError>
where
	T: DeserializeOwned,
{
	let mut parts = token.split('.');
	let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
		(parts.next(), parts.next(), parts.next(), parts.next())
	else {
		return Err(CodecError::Malformed);
	};
	let header: Header = decode_json(header_b64)?;

	if header.alg != ALG || !header.typ.eq_ignore_ascii_case(TYP) {
		return Err(CodecError::UnsupportedHeader);
	}

	let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| CodecError::Malformed)?;
	let mut mac = HmacSha256::new_from_slice(key).map_err(|_| CodecError::BadSignature)?;

	mac.update(header_b64.as_bytes());
	mac.update(b".");
	mac.update(claims_b64.as_bytes());
	mac.verify_slice(&signature).map_err(|_| CodecError::BadSignature)?;

	decode_json(claims_b64)
}

fn decode_json<T>(segment: &str) -> Result<T, CodecError>
where
	T: DeserializeOwned,
{
	let raw = URL_SAFE_NO_PAD.decode(segment).map_err(|_| CodecError::Malformed)?;

	serde_json::from_slice(&raw).map_err(|_| CodecError::Malformed)
}
