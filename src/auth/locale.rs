// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::AuthError;

/// Marketplace locale codes and their top level domains
const MARKETPLACES: &[(&str, &str)] = &[
    ("us", "com"),
    ("uk", "co.uk"),
    ("de", "de"),
    ("fr", "fr"),
    ("ca", "ca"),
    ("it", "it"),
    ("au", "com.au"),
    ("in", "in"),
    ("jp", "co.jp"),
    ("es", "es"),
    ("br", "com.br"),
];

/// Map a locale code from the credential file to its marketplace domain
pub fn marketplace_domain(locale_code: &str) -> Result<&'static str, AuthError> {
    let code = locale_code.trim().to_lowercase();
    MARKETPLACES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, domain)| *domain)
        .ok_or_else(|| AuthError::UnknownLocale(locale_code.to_string()))
}
