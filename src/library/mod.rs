mod codec;
mod content;
mod fetch;
mod parse;

pub use codec::{PREFERRED_CODECS, select_codec};
pub use content::{CONTENT_URL, download_link, localize_link};
pub use fetch::{DEFAULT_PAGE_SIZE, fetch_library, library_url};
pub use parse::{Audiobook, AvailableCodec, parse_library_page};
