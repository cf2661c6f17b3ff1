//! API-shape definition: paths, methods and candidate execution points.

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Exception, Result};
use crate::request::HttpMethod;

/// Capture name for the remainder of an `x-all-subpaths` path.
pub const SUBPATH_PARAMETER: &str = "subpath";

/// Guard deciding whether a candidate point serves a request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    /// `true` always matches, `false` never does.
    Literal(bool),
    /// Template expression tested for truthiness.
    Expression(String),
}

/// A candidate mapping from a path and method to a pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiPoint {
    /// Selector guarding this point.
    pub selector: Selector,
    /// Pipeline executed when selected.
    #[serde(rename = "exec-pipe-id")]
    pub pipeline_id: String,
    /// Whether the endpoint is an event stream.
    #[serde(rename = "eventSource", default)]
    pub event_source: bool,
}

/// The `x-backend-engine` extension of an operation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineBinding {
    /// Candidate points, in evaluation order.
    #[serde(default)]
    pub points: Vec<ApiPoint>,
}

/// One operation (method) of a path.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiMethod {
    /// Engine binding; operations without one have no candidates.
    #[serde(rename = "x-backend-engine", default)]
    pub engine: Option<EngineBinding>,
}

impl ApiMethod {
    /// Candidate points in declared order.
    pub fn points(&self) -> &[ApiPoint] {
        self.engine
            .as_ref()
            .map(|e| e.points.as_slice())
            .unwrap_or_default()
    }
}

/// One declared path. Unknown OpenAPI keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiPath {
    /// Capture the rest of the URL as the `subpath` parameter.
    #[serde(rename = "x-all-subpaths", default)]
    pub all_subpaths: bool,
    #[serde(default)]
    get: Option<ApiMethod>,
    #[serde(default)]
    post: Option<ApiMethod>,
    #[serde(default)]
    put: Option<ApiMethod>,
    #[serde(default)]
    patch: Option<ApiMethod>,
    #[serde(default)]
    delete: Option<ApiMethod>,
}

impl ApiPath {
    /// The operation declared for `method`.
    pub fn method(&self, method: HttpMethod) -> Option<&ApiMethod> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options | HttpMethod::Head => None,
        }
    }

    fn methods(&self) -> impl Iterator<Item = &ApiMethod> {
        [&self.get, &self.post, &self.put, &self.patch, &self.delete]
            .into_iter()
            .flatten()
    }
}

#[derive(Deserialize)]
struct RawApiDefinition {
    #[serde(default)]
    paths: IndexMap<String, ApiPath>,
}

#[derive(Debug, Clone)]
struct PathMatcher {
    template: String,
    pattern: Regex,
}

/// The parsed API-shape definition with compiled path matchers.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawApiDefinition")]
pub struct ApiDefinition {
    paths: IndexMap<String, ApiPath>,
    matchers: Vec<PathMatcher>,
}

impl TryFrom<RawApiDefinition> for ApiDefinition {
    type Error = Exception;

    fn try_from(raw: RawApiDefinition) -> Result<Self> {
        let matchers = raw
            .paths
            .iter()
            .map(|(template, path)| {
                Ok(PathMatcher {
                    template: template.clone(),
                    pattern: compile_template(template, path.all_subpaths)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            paths: raw.paths,
            matchers,
        })
    }
}

impl ApiDefinition {
    /// Parse from YAML or JSON text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        super::parse_document(text, "api definition")
    }

    /// Load from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        super::load_document(path)
    }

    /// Match a concrete URL path against the declared templates.
    ///
    /// Templates are tried in declaration order. Returns the template and
    /// the captured (percent-decoded) path parameters.
    ///
    /// # Example
    ///
    /// ```
    /// use gantry_core::definition::ApiDefinition;
    ///
    /// let api = ApiDefinition::from_yaml(r#"
    /// paths:
    ///   /users/{id}:
    ///     get: {}
    /// "#).unwrap();
    /// let (template, params) = api.match_path("/users/42/").unwrap();
    /// assert_eq!(template, "/users/{id}");
    /// assert_eq!(params["id"], "42");
    /// ```
    pub fn match_path(&self, url_path: &str) -> Result<(&str, HashMap<String, String>)> {
        for matcher in &self.matchers {
            let Some(captures) = matcher.pattern.captures(url_path) else {
                continue;
            };
            let parameters = matcher
                .pattern
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    let raw = captures.name(name)?.as_str();
                    let value = urlencoding::decode(raw)
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| raw.to_string());
                    Some((name.to_string(), value))
                })
                .collect();
            return Ok((matcher.template.as_str(), parameters));
        }
        Err(Exception::not_found(format!("no path matches [{url_path}]")))
    }

    /// Find the operation for a path template and method.
    pub fn route_request(&self, template: &str, method: HttpMethod) -> Result<&ApiMethod> {
        let path = self
            .paths
            .get(template)
            .ok_or_else(|| Exception::not_found(format!("path [{template}] not declared")))?;
        path.method(method).ok_or_else(|| {
            Exception::not_found(format!("method [{method}] not declared for [{template}]"))
        })
    }

    /// Declared path templates in order.
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    /// Every candidate point of every operation.
    pub fn points(&self) -> impl Iterator<Item = &ApiPoint> {
        self.paths
            .values()
            .flat_map(|p| p.methods())
            .flat_map(|m| m.points())
    }
}

fn compile_template(template: &str, all_subpaths: bool) -> Result<Regex> {
    let mut pattern = String::from("^");
    for (index, segment) in template.split('/').enumerate() {
        if index > 0 {
            pattern.push('/');
        }
        match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) if is_parameter_name(name) => {
                pattern.push_str(&format!("(?P<{name}>[^/]+)"));
            }
            Some(name) => {
                return Err(Exception::ep_definition(format!(
                    "invalid path parameter [{name}] in [{template}]"
                )));
            }
            None => pattern.push_str(&regex::escape(segment)),
        }
    }
    if all_subpaths {
        pattern.push_str(&format!("(?P<{SUBPATH_PARAMETER}>.*)"));
    }
    pattern.push_str("/?$");
    Regex::new(&pattern).map_err(|e| {
        Exception::ep_definition(format!("invalid path template [{template}]")).wrap(e)
    })
}

fn is_parameter_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
