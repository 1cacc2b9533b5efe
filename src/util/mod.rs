//! Small shared utilities: lenient date parsing and URL validation.

pub mod date;
mod url;

pub use url::{validate_http_url, UrlValidationError};
