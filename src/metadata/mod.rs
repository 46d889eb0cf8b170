mod sidecar;

pub use sidecar::{BookSidecar, read_book_sidecar, sidecar_path, write_book_sidecar};
