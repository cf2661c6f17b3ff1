//! Built-in input sources.

mod cookie;
mod current;
mod environment;
mod generator;
pub mod hmac_token;
mod json_body;
mod headers;
mod path_query;
pub mod signed_claim;

pub use cookie::{CookieSource, parse_cookie_header};
pub use current::CurrentSource;
pub use environment::EnvironmentSource;
pub use generator::GeneratorSource;
pub use headers::HeadersSource;
pub use hmac_token::{HmacSettings, HmacTokenSource};
pub use json_body::JsonBodySource;
pub use path_query::PathAndQuerySource;
pub use signed_claim::{ClaimSettings, ClaimSigner, SignedClaimSource};

use serde_json::Value;

use crate::value::lookup;

/// Accessor segment selecting a whole document.
pub const WHOLE_DOCUMENT: &str = "*";

/// Follow `path` into `root`; a lone `*` selects `root` itself.
pub(crate) fn select(root: &Value, path: &[String]) -> Option<Value> {
    match path {
        [only] if only == WHOLE_DOCUMENT => Some(root.clone()),
        _ => lookup(root, path).cloned(),
    }
}
