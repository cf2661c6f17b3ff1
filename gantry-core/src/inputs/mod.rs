//! The input expression evaluator.
//!
//! [`Inputs`] resolves `type.path` references against a fixed, ordered list
//! of [`InputSource`]s and expands `{...}` markers inside arbitrary JSON
//! template trees.
//!
//! Expansion rules:
//!
//! - A string that is exactly one marker becomes the referenced value,
//!   keeping its type. Strings, arrays and objects obtained this way are
//!   expanded again, so a value may point at another value.
//! - A string mixing markers and text has every resolved marker substituted
//!   as text, then is expanded again while something was substituted.
//!   Unresolved markers stay verbatim.
//! - Arrays and objects are expanded element-wise. An absent whole-marker
//!   value drops the object field and becomes `null` inside an array.
//! - Other scalars pass through unchanged.
//!
//! Indirection is bounded by [`MAX_EXPANSION_DEPTH`].

mod parser;
pub mod sources;

pub use parser::{Marker, Reference, ReferenceParser};

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::error::{Exception, Result};
use crate::request::Request;
use crate::response::Response;
use crate::testing::{ClockProvider, EnvProvider, RealClock, RealEnv, RealUuid, UuidProvider};
use crate::value::to_text;
use sources::{
    ClaimSettings, CookieSource, CurrentSource, EnvironmentSource, GeneratorSource,
    HeadersSource, HmacSettings, HmacTokenSource, JsonBodySource, PathAndQuerySource,
    SignedClaimSource,
};

/// Maximum number of nested indirections during one expansion.
pub const MAX_EXPANSION_DEPTH: usize = 16;

/// What a resolver can see: the request and the response built so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
    /// The request being served, if any.
    pub request: Option<&'a Request>,
    /// The in-flight response, if any.
    pub response: Option<&'a Response>,
}

impl<'a> Scope<'a> {
    /// Nothing in scope (configuration-time expansion).
    pub fn empty() -> Self {
        Self::default()
    }

    /// A request without a response yet.
    pub fn request(request: &'a Request) -> Self {
        Self {
            request: Some(request),
            response: None,
        }
    }

    /// A request and its in-flight response.
    pub fn new(request: &'a Request, response: &'a Response) -> Self {
        Self {
            request: Some(request),
            response: Some(response),
        }
    }
}

/// A resolver for one or more reference types.
pub trait InputSource: Send + Sync {
    /// Reference types this source answers for.
    fn kinds(&self) -> &[&'static str];

    /// Resolve `reference`. `Ok(None)` means the value is absent, which is
    /// not an error.
    fn get(&self, reference: &Reference, inputs: &Inputs, scope: Scope<'_>)
    -> Result<Option<Value>>;
}

/// Dependencies of the built-in resolvers.
pub struct InputsConfig {
    /// Process environment.
    pub env: Arc<dyn EnvProvider>,
    /// Development-only fallback for missing environment variables.
    pub env_dev: HashMap<String, String>,
    /// Identifier generator.
    pub uuid: Arc<dyn UuidProvider>,
    /// Clock for credential expiry.
    pub clock: Arc<dyn ClockProvider>,
    /// Signed-claim verification settings.
    pub claims: ClaimSettings,
    /// HMAC token settings.
    pub hmac: HmacSettings,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            env: Arc::new(RealEnv),
            env_dev: HashMap::new(),
            uuid: Arc::new(RealUuid),
            clock: Arc::new(RealClock),
            claims: ClaimSettings::default(),
            hmac: HmacSettings::default(),
        }
    }
}

impl InputsConfig {
    /// Use a different environment provider.
    pub fn with_env(mut self, env: Arc<dyn EnvProvider>) -> Self {
        self.env = env;
        self
    }

    /// Set the development fallback table.
    pub fn with_env_dev(mut self, env_dev: HashMap<String, String>) -> Self {
        self.env_dev = env_dev;
        self
    }

    /// Use a different identifier generator.
    pub fn with_uuid(mut self, uuid: Arc<dyn UuidProvider>) -> Self {
        self.uuid = uuid;
        self
    }

    /// Use a different clock.
    pub fn with_clock(mut self, clock: Arc<dyn ClockProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// Set signed-claim settings.
    pub fn with_claims(mut self, claims: ClaimSettings) -> Self {
        self.claims = claims;
        self
    }

    /// Set HMAC token settings.
    pub fn with_hmac(mut self, hmac: HmacSettings) -> Self {
        self.hmac = hmac;
        self
    }
}

/// The expression evaluator.
#[derive(Clone)]
pub struct Inputs {
    sources: Vec<Arc<dyn InputSource>>,
}

impl Default for Inputs {
    fn default() -> Self {
        Self::new(InputsConfig::default())
    }
}

impl std::fmt::Debug for Inputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<&str> = self
            .sources
            .iter()
            .flat_map(|s| s.kinds().iter().copied())
            .collect();
        f.debug_struct("Inputs").field("kinds", &kinds).finish()
    }
}

impl Inputs {
    /// Build the evaluator with every built-in resolver, in lookup order:
    /// path/query, body, environment, current, cookie, headers, generator,
    /// signed claim, HMAC token.
    pub fn new(config: InputsConfig) -> Self {
        Self::with_sources(vec![
            Arc::new(PathAndQuerySource),
            Arc::new(JsonBodySource),
            Arc::new(EnvironmentSource::new(config.env, config.env_dev)),
            Arc::new(CurrentSource),
            Arc::new(CookieSource),
            Arc::new(HeadersSource),
            Arc::new(GeneratorSource::new(config.uuid)),
            Arc::new(SignedClaimSource::new(config.claims, config.clock)),
            Arc::new(HmacTokenSource::new(config.hmac)),
        ])
    }

    /// Build the evaluator from an explicit resolver list.
    pub fn with_sources(sources: Vec<Arc<dyn InputSource>>) -> Self {
        Self { sources }
    }

    /// Append a resolver; it is consulted after the existing ones.
    pub fn register(&mut self, source: Arc<dyn InputSource>) {
        self.sources.push(source);
    }

    /// Resolve a reference expression such as `env.HOME`.
    pub fn resolve(&self, expression: &str, scope: Scope<'_>) -> Result<Option<Value>> {
        let reference = ReferenceParser::parse(expression)?;
        self.resolve_reference(&reference, scope)
    }

    /// Resolve an already parsed reference.
    pub fn resolve_reference(&self, reference: &Reference, scope: Scope<'_>) -> Result<Option<Value>> {
        let source = self
            .sources
            .iter()
            .find(|s| s.kinds().contains(&reference.kind.as_str()))
            .ok_or_else(|| {
                Exception::config(format!(
                    "unknown type [{}] in [{}]",
                    reference.kind, reference.raw
                ))
            })?;
        let value = source.get(reference, self, scope)?;
        trace!(reference = %reference.raw, resolved = value.is_some(), "resolved reference");
        Ok(value)
    }

    /// Expand every marker in a template tree.
    ///
    /// Returns `None` when the template is a single marker whose value is
    /// absent.
    ///
    /// # Example
    ///
    /// ```
    /// use gantry_core::inputs::{Inputs, InputsConfig, Scope};
    /// use gantry_core::testing::MockEnv;
    /// use serde_json::json;
    /// use std::sync::Arc;
    ///
    /// let env = MockEnv::new().with_var("TEST_ENV", "smurfs");
    /// let inputs = Inputs::new(InputsConfig::default().with_env(Arc::new(env)));
    ///
    /// let expanded = inputs.expand(&json!({"greeting": "hello {env.TEST_ENV}"}), Scope::empty());
    /// assert_eq!(expanded.unwrap(), Some(json!({"greeting": "hello smurfs"})));
    /// ```
    pub fn expand(&self, template: &Value, scope: Scope<'_>) -> Result<Option<Value>> {
        self.expand_at(template, scope, 0)
    }

    /// Expand a template tree, mapping an absent result to `null`.
    pub fn expand_args(&self, template: &Value, scope: Scope<'_>) -> Result<Value> {
        Ok(self.expand(template, scope)?.unwrap_or(Value::Null))
    }

    /// Expand a single template string.
    pub fn expand_str(&self, template: &str, scope: Scope<'_>) -> Result<Option<Value>> {
        self.expand_string(template, scope, 0)
    }

    fn expand_at(&self, template: &Value, scope: Scope<'_>, depth: usize) -> Result<Option<Value>> {
        match template {
            Value::String(text) => self.expand_string(text, scope, depth),
            Value::Array(items) => {
                let expanded = items
                    .iter()
                    .map(|item| Ok(self.expand_at(item, scope, depth)?.unwrap_or(Value::Null)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Value::Array(expanded)))
            }
            Value::Object(fields) => {
                let mut expanded = Map::with_capacity(fields.len());
                for (key, value) in fields {
                    if let Some(value) = self.expand_at(value, scope, depth)? {
                        expanded.insert(key.clone(), value);
                    }
                }
                Ok(Some(Value::Object(expanded)))
            }
            scalar => Ok(Some(scalar.clone())),
        }
    }

    fn expand_string(&self, text: &str, scope: Scope<'_>, depth: usize) -> Result<Option<Value>> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(Exception::ep_definition(format!(
                "template expansion too deep while expanding [{text}]"
            )));
        }
        let markers = ReferenceParser::markers(text);
        if markers.is_empty() {
            return Ok(Some(Value::String(text.to_string())));
        }

        if let Some(expression) = ReferenceParser::whole_marker(text) {
            return match self.resolve(expression, scope)? {
                None => Ok(None),
                Some(nested @ (Value::String(_) | Value::Array(_) | Value::Object(_))) => {
                    self.expand_at(&nested, scope, depth + 1)
                }
                Some(scalar) => Ok(Some(scalar)),
            };
        }

        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        let mut substituted = false;
        for marker in &markers {
            output.push_str(&text[last..marker.span.start]);
            match self.resolve(marker.expression, scope)? {
                Some(value) => {
                    output.push_str(&to_text(&value));
                    substituted = true;
                }
                None => output.push_str(&text[marker.span.clone()]),
            }
            last = marker.span.end;
        }
        output.push_str(&text[last..]);

        if substituted {
            self.expand_string(&output, scope, depth + 1)
        } else {
            Ok(Some(Value::String(output)))
        }
    }
}
