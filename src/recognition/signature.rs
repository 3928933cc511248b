// Request signing for the recognition service
//
// The service authenticates each upload with a Base64 HMAC-SHA1 over a
// newline-joined canonical string.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

pub const HTTP_METHOD: &str = "POST";
pub const HTTP_URI: &str = "/v1/identify";
pub const DATA_TYPE: &str = "audio";
pub const SIGNATURE_VERSION: &str = "1";

type HmacSha1 = Hmac<Sha1>;

/// Signing metadata sent alongside the sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub access_key: String,
    pub signature: String,
    pub timestamp: String,
}

/// Canonical string: method, uri, access key, data type, version and timestamp
pub fn string_to_sign(
    method: &str,
    uri: &str,
    access_key: &str,
    data_type: &str,
    signature_version: &str,
    timestamp: &str,
) -> String {
    [method, uri, access_key, data_type, signature_version, timestamp].join("\n")
}

/// Base64-encoded HMAC-SHA1 of `message` keyed by `secret`
pub fn sign(secret: &str, message: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Sign an identify request at `timestamp` (Unix seconds)
pub fn sign_request(access_key: &str, access_secret: &str, timestamp: i64) -> SignedRequest {
    let timestamp = timestamp.to_string();
    let message = string_to_sign(
        HTTP_METHOD,
        HTTP_URI,
        access_key,
        DATA_TYPE,
        SIGNATURE_VERSION,
        &timestamp,
    );

    SignedRequest {
        access_key: access_key.to_string(),
        signature: sign(access_secret, &message),
        timestamp,
    }
}
