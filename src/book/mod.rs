mod download;
mod filename;

pub use download::{DownloadOutcome, download_book};
pub use filename::{clean_stem, derived_path, download_filename, parse_content_disposition};
