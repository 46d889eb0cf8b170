// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;

use crate::error::AuthError;
use crate::http::HttpClient;

use super::credentials::{Credentials, load_credentials, save_credentials};

const APP_NAME: &str = "Audible";
const APP_VERSION: &str = "3.56.2";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: f64,
}

fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Exchange the refresh token for a new access token
pub async fn refresh_access_token<C: HttpClient>(
    client: &C,
    credentials: &mut Credentials,
) -> Result<(), AuthError> {
    let refresh_token = credentials
        .refresh_token
        .clone()
        .ok_or(AuthError::MissingRefreshToken)?;
    let url = format!("https://api.amazon.{}/auth/token", credentials.domain()?);

    let form = [
        ("app_name", APP_NAME),
        ("app_version", APP_VERSION),
        ("source_token", refresh_token.as_str()),
        ("requested_token_type", "access_token"),
        ("source_token_type", "refresh_token"),
    ];

    let response = client
        .post_form(&url, &form)
        .await
        .map_err(|e| AuthError::RefreshFailed { source: e })?;

    if response.status >= 400 {
        return Err(AuthError::RefreshRejected {
            status: response.status,
        });
    }

    let token: TokenResponse = serde_json::from_slice(&response.body)
        .map_err(|e| AuthError::RefreshResponse(e.to_string()))?;

    credentials.access_token = Some(token.access_token);
    credentials.expires = Some(now_secs() + token.expires_in);
    Ok(())
}

/// Load credentials, refresh them if they expired, and write them back.
///
/// Returns the credentials and whether a refresh happened.
pub async fn authenticate<C: HttpClient>(
    client: &C,
    path: &Path,
) -> Result<(Credentials, bool), AuthError> {
    let mut credentials = load_credentials(path)?;

    let refreshed = if credentials.is_expired(now_secs()) {
        tracing::info!("access token expired, refreshing");
        refresh_access_token(client, &mut credentials).await?;
        true
    } else {
        false
    };

    save_credentials(path, &credentials)?;
    Ok((credentials, refreshed))
}
