mod credentials;
mod locale;
mod refresh;

pub use credentials::{Credentials, load_credentials, save_credentials};
pub use locale::marketplace_domain;
pub use refresh::{authenticate, refresh_access_token};
