// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::CodecError;

use super::parse::Audiobook;

/// Encodings we accept, best first
pub const PREFERRED_CODECS: &[&str] = &[
    "LC_128_44100_stereo",
    "LC_64_44100_stereo",
    "LC_64_22050_stereo",
    "LC_32_22050_stereo",
];

/// Pick the best preferred codec the title is offered in
pub fn select_codec(book: &Audiobook) -> Result<&'static str, CodecError> {
    PREFERRED_CODECS
        .iter()
        .copied()
        .find(|preferred| {
            book.available_codecs
                .iter()
                .any(|offered| offered.enhanced_codec == *preferred)
        })
        .ok_or_else(|| CodecError::NoAcceptableCodec {
            asin: book.asin.clone(),
            title: book.title.clone(),
        })
}
