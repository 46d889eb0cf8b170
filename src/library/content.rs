// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use url::Url;

use crate::auth::Credentials;
use crate::error::LibraryError;
use crate::http::{ApiRequest, HttpClient};

/// Endpoint that answers with a redirect to the encrypted audio file
pub const CONTENT_URL: &str = "https://cde-ta-g7g.amazon.com/FionaCDEServiceEngine/FSDownloadContent";

const DEFAULT_CDN_HOST: &str = "cds.audible.com";

/// Point a CDN link at the account's marketplace
pub fn localize_link(link: &str, domain: &str) -> String {
    link.replace(DEFAULT_CDN_HOST, &format!("cds.audible.{}", domain))
}

/// Ask the content service where `asin` in `codec` can be downloaded
pub async fn download_link<C: HttpClient>(
    client: &C,
    credentials: &Credentials,
    asin: &str,
    codec: &str,
) -> Result<String, LibraryError> {
    let domain = credentials.domain()?;
    let url = Url::parse_with_params(
        CONTENT_URL,
        &[
            ("type", "AUDI"),
            ("currentTransportMethod", "WIFI"),
            ("key", asin),
            ("codec", codec),
        ],
    )?;

    let request = credentials.authorize(ApiRequest::new(url.clone()));
    let response = client
        .get_location(&request)
        .await
        .map_err(|e| LibraryError::RequestFailed {
            url: url.to_string(),
            source: e,
        })?;

    match response.location {
        Some(location) => Ok(localize_link(&location, domain)),
        None => Err(LibraryError::MissingLocation {
            asin: asin.to_string(),
            status: response.status,
        }),
    }
}
