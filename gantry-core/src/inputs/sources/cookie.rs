use serde_json::Value;

use super::select;
use crate::error::{Exception, Result};
use crate::inputs::{InputSource, Inputs, Reference, Scope};

/// Segment marking that the cookie value is JSON to be navigated further.
const JSON_MARKER: &str = "json";

/// `cookie.<name>` and `cookie.<name>.json.<path>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CookieSource;

impl InputSource for CookieSource {
    fn kinds(&self) -> &[&'static str] {
        &["cookie"]
    }

    fn get(&self, reference: &Reference, _: &Inputs, scope: Scope<'_>) -> Result<Option<Value>> {
        let Some(header) = scope.request.and_then(|r| r.header("cookie")) else {
            return Ok(None);
        };
        let Some((name, rest)) = reference.path.split_first() else {
            return Ok(None);
        };
        let Some(value) = parse_cookie_header(header)
            .into_iter()
            .find_map(|(n, v)| (n == *name).then_some(v))
        else {
            return Ok(None);
        };

        match rest.split_first() {
            None => Ok(Some(Value::String(value))),
            Some((marker, path)) if marker == JSON_MARKER => {
                let parsed: Value = serde_json::from_str(&value).map_err(|e| {
                    Exception::user(format!("cookie [{name}] is not valid JSON")).wrap(e)
                })?;
                if path.is_empty() {
                    Ok(Some(parsed))
                } else {
                    Ok(select(&parsed, path))
                }
            }
            Some(_) => Ok(None),
        }
    }
}

/// Split a `Cookie` header into percent-decoded name/value pairs.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let value = value.trim().trim_matches('"');
            let decoded = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            Some((name.trim().to_string(), decoded))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{HttpMethod, Request};
    use serde_json::json;

    fn request() -> Request {
        Request::new(HttpMethod::Get, "/").with_header(
            "Cookie",
            "theme=dark; user=%7B%22access_token%22%3A%22abc%22%2C%22profile%22%3A%7B%22id%22%3A5%7D%7D",
        )
    }

    #[test]
    fn parses_header() {
        let pairs = parse_cookie_header("a=1; b=x%20y;c");
        assert_eq!(
            pairs,
            vec![("a".into(), "1".into()), ("b".into(), "x y".into())]
        );
    }

    #[test]
    fn reads_plain_and_json_cookies() {
        let request = request();
        let inputs = Inputs::default();
        let scope = Scope::request(&request);
        assert_eq!(inputs.resolve("cookie.theme", scope).unwrap(), Some(json!("dark")));
        assert_eq!(
            inputs.resolve("cookie.user.json.access_token", scope).unwrap(),
            Some(json!("abc"))
        );
        assert_eq!(
            inputs.resolve("cookie.user.json.profile.id", scope).unwrap(),
            Some(json!(5))
        );
        assert_eq!(inputs.resolve("cookie.missing", scope).unwrap(), None);
        assert!(inputs.resolve("cookie.theme.json.x", scope).is_err());
    }
}
