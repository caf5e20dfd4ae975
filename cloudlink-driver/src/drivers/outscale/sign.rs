//! OSC4-HMAC-SHA256 signing
//!
//! Same construction as AWS Signature V4 with an `OSC4` key prefix and an
//! `osc4_request` scope terminator.

use chrono::{DateTime, Utc};

use crate::drivers::common::{hmac_sha256, sha256_hex};

use super::{OSC_API_PATH, OSC_SERVICE, OutscaleNodeDriver};

pub(crate) const ALGORITHM: &str = "OSC4-HMAC-SHA256";
pub(crate) const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host;x-osc-date";

/// Headers to attach to a signed request.
#[derive(Debug, Clone)]
pub(crate) struct SignedRequest {
    pub osc_date: String,
    pub authorization: String,
}

impl OutscaleNodeDriver {
    /// Sign a `POST {OSC_API_PATH}/{action}` request carrying `payload`.
    pub(crate) fn sign(&self, action: &str, payload: &str, now: DateTime<Utc>) -> SignedRequest {
        let osc_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        // 1. Canonical request
        let canonical_uri = format!("{OSC_API_PATH}/{action}");
        let canonical_query_string = "";
        let canonical_headers = format!(
            "content-type:{CONTENT_TYPE}\nhost:{}\nx-osc-date:{osc_date}\n",
            self.host
        );
        let hashed_payload = sha256_hex(payload.as_bytes());
        let canonical_request = format!(
            "POST\n{canonical_uri}\n{canonical_query_string}\n{canonical_headers}\n{SIGNED_HEADERS}\n{hashed_payload}"
        );

        // 2. String to sign
        let credential_scope = format!("{date}/{}/{OSC_SERVICE}/osc4_request", self.region);
        let string_to_sign = format!(
            "{ALGORITHM}\n{osc_date}\n{credential_scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );

        // 3. Signing key and signature
        let k_date = hmac_sha256(format!("OSC4{}", self.secret_key).as_bytes(), date.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, OSC_SERVICE.as_bytes());
        let k_signing = hmac_sha256(&k_service, b"osc4_request");
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

        // 4. Authorization header
        let authorization = format!(
            "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            self.access_key
        );

        SignedRequest {
            osc_date,
            authorization,
        }
    }
}
