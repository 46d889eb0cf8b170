// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::http::ApiRequest;

use super::locale::marketplace_domain;

/// Seconds before the recorded expiry at which a token counts as expired
const EXPIRY_MARGIN_SECS: f64 = 60.0;

fn default_locale() -> String {
    "us".to_string()
}

/// Bearer credentials as stored by the vendor SDK's file authenticator.
///
/// Keys this tool does not use (device info, cookies, signing keys) are kept
/// in `extra` so rewriting the file never loses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) at which the access token expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default = "default_locale")]
    pub locale_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_bytes: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Credentials {
    /// Whether the access token is missing or (nearly) expired at `now`
    pub fn is_expired(&self, now: f64) -> bool {
        match (&self.access_token, self.expires) {
            (Some(_), Some(expires)) => expires - EXPIRY_MARGIN_SECS <= now,
            _ => true,
        }
    }

    /// Marketplace top level domain for this account, e.g. `co.uk`
    pub fn domain(&self) -> Result<&'static str, AuthError> {
        marketplace_domain(&self.locale_code)
    }

    /// Attach the bearer headers the vendor API expects
    pub fn authorize(&self, request: ApiRequest) -> ApiRequest {
        let request = request.header("client-id", "0");
        match &self.access_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }
}

/// Read credentials from a JSON file
pub fn load_credentials(path: &Path) -> Result<Credentials, AuthError> {
    let content = std::fs::read_to_string(path).map_err(|e| AuthError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| AuthError::ParseFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write credentials back as unencrypted JSON
pub fn save_credentials(path: &Path, credentials: &Credentials) -> Result<(), AuthError> {
    let json = serde_json::to_string_pretty(credentials)?;
    std::fs::write(path, json).map_err(|e| AuthError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use url::Url;

    const SDK_FILE: &str = r#"{
        "access_token": "Atna|token",
        "refresh_token": "Atnr|refresh",
        "expires": 1700000000.5,
        "locale_code": "uk",
        "adp_token": "{enc:...}",
        "device_info": {"device_serial_number": "ABC"}
    }"#;

    #[test]
    fn parses_sdk_credential_file() {
        let creds: Credentials = serde_json::from_str(SDK_FILE).unwrap();

        assert_eq!(creds.access_token.as_deref(), Some("Atna|token"));
        assert_eq!(creds.refresh_token.as_deref(), Some("Atnr|refresh"));
        assert_eq!(creds.domain().unwrap(), "co.uk");
        assert!(creds.extra.contains_key("adp_token"));
        assert!(creds.activation_bytes.is_none());
    }

    #[test]
    fn save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, SDK_FILE).unwrap();

        let creds = load_credentials(&path).unwrap();
        save_credentials(&path, &creds).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["adp_token"], "{enc:...}");
        assert_eq!(raw["device_info"]["device_serial_number"], "ABC");
        assert_eq!(raw["locale_code"], "uk");
    }

    #[test]
    fn expiry_respects_margin() {
        let creds: Credentials = serde_json::from_str(SDK_FILE).unwrap();

        assert!(!creds.is_expired(1_699_990_000.0));
        assert!(creds.is_expired(1_699_999_990.0));
        assert!(creds.is_expired(1_800_000_000.0));
    }

    #[test]
    fn missing_token_counts_as_expired() {
        let creds: Credentials = serde_json::from_str(r#"{"refresh_token": "r"}"#).unwrap();
        assert!(creds.is_expired(0.0));
        assert_eq!(creds.locale_code, "us");
    }

    #[test]
    fn authorize_adds_bearer_headers() {
        let creds: Credentials = serde_json::from_str(SDK_FILE).unwrap();
        let request = creds.authorize(ApiRequest::new(
            Url::parse("https://api.audible.co.uk/1.0/library").unwrap(),
        ));

        assert!(
            request
                .headers
                .contains(&("Authorization".to_string(), "Bearer Atna|token".to_string()))
        );
        assert!(
            request
                .headers
                .contains(&("client-id".to_string(), "0".to_string()))
        );
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let result = load_credentials(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(AuthError::ReadFailed { .. })));
    }
}
