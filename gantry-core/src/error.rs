//! Exception taxonomy for Gantry.
//!
//! Every failure raised while routing or executing a request is an
//! [`Exception`]: a status-coded error carrying an ordered list of messages.
//! Only the entries flagged public are ever serialized back to the caller;
//! the others are kept for logs. System-class kinds (HTTP 500) always expose
//! the same generic message and attach the specific cause as a detail.

use serde_json::{Value, json};
use std::fmt::Write;
use uuid::Uuid;

/// Generic public message carried by every system-class exception.
pub const SYSTEM_ERROR_MESSAGE: &str = "Sorry, system error";

/// Boxed error stored as the wrapped cause of an exception.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of an [`Exception`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// Caller-caused failure (bad input). Messages are public.
    User,
    /// A credential is valid but expired and must be refreshed.
    Unauthorized,
    /// Access denied.
    Forbidden,
    /// Unknown path, method or endpoint.
    NotFound,
    /// SQL layer failure not mapped to a declared constraint message.
    Sql,
    /// Invalid configuration or unparseable template reference.
    Config,
    /// Invalid pipeline or API definition.
    EpDefinition,
    /// Command I/O failure (outbound calls and the like).
    Command,
    /// Anything else.
    Unknown,
}

impl ExceptionKind {
    /// Stable error code (e.g. "E403").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::User => "E400",
            Self::Unauthorized => "E401",
            Self::Forbidden => "E403",
            Self::NotFound => "E404",
            Self::Unknown => "E500",
            Self::Sql => "E501",
            Self::Config => "E502",
            Self::EpDefinition => "E503",
            Self::Command => "E504",
        }
    }

    /// HTTP status the kind maps to.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::User => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Sql | Self::Config | Self::EpDefinition | Self::Command | Self::Unknown => 500,
        }
    }

    /// Check if this is a system-class (500) kind.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.http_status() >= 500
    }

    /// Type name used when an exception is wrapped by another.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::User => "UserException",
            Self::Unauthorized => "OAuthRefreshTokenException",
            Self::Forbidden => "ForbiddenException",
            Self::NotFound => "NotFoundException",
            Self::Sql => "SqlException",
            Self::Config => "ConfigException",
            Self::EpDefinition => "EpDefinitionException",
            Self::Command => "CommandException",
            Self::Unknown => "SystemException",
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            Self::User => "Bad Request",
            Self::Unauthorized => "token needs refresh",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            _ => SYSTEM_ERROR_MESSAGE,
        }
    }
}

/// One message attached to an exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    /// The message text.
    pub message: String,
    /// Whether the message may be returned to the caller.
    pub public: bool,
    /// Whether this is the kind's default message.
    pub default: bool,
}

impl ErrorEntry {
    fn public(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            public: true,
            default: false,
        }
    }

    fn detail(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            public: false,
            default: false,
        }
    }

    fn default_for(kind: ExceptionKind) -> Self {
        Self {
            message: kind.default_message().to_string(),
            public: true,
            default: true,
        }
    }
}

/// A classified, partially public error.
///
/// Built once at the point of failure through the kind constructors and the
/// consuming `with_*`/[`wrap`](Exception::wrap) builders; there is no way to
/// mutate an exception after it has been handed to a caller.
///
/// # Example
///
/// ```
/// use gantry_core::error::{Exception, ExceptionKind};
///
/// let err = Exception::sql("connection [main] not declared");
/// assert_eq!(err.kind(), ExceptionKind::Sql);
/// assert_eq!(err.http_status(), 500);
/// assert_eq!(err.public_messages(), vec!["Sorry, system error"]);
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{}", self.render())]
pub struct Exception {
    kind: ExceptionKind,
    id: Uuid,
    errors: Vec<ErrorEntry>,
    #[source]
    source: Option<BoxError>,
}

impl Exception {
    fn build(kind: ExceptionKind, errors: Vec<ErrorEntry>) -> Self {
        Self {
            kind,
            id: Uuid::new_v4(),
            errors,
            source: None,
        }
    }

    /// Caller-caused failure whose message is returned verbatim.
    pub fn user(message: impl Into<String>) -> Self {
        Self::build(ExceptionKind::User, vec![ErrorEntry::public(message)])
    }

    /// Expired credential; the public message asks for a refresh.
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::build(
            ExceptionKind::Unauthorized,
            vec![
                ErrorEntry::default_for(ExceptionKind::Unauthorized),
                ErrorEntry::detail(detail),
            ],
        )
    }

    /// Access denied. The detail is kept private.
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::build(
            ExceptionKind::Forbidden,
            vec![
                ErrorEntry::detail(detail),
                ErrorEntry::default_for(ExceptionKind::Forbidden),
            ],
        )
    }

    /// Unknown resource. The detail is kept private.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::build(
            ExceptionKind::NotFound,
            vec![
                ErrorEntry::detail(detail),
                ErrorEntry::default_for(ExceptionKind::NotFound),
            ],
        )
    }

    /// System-class failure of the given kind.
    ///
    /// Non-system kinds are accepted too, in which case the kind's own
    /// default message is used.
    pub fn system(kind: ExceptionKind, detail: impl Into<String>) -> Self {
        Self::build(
            kind,
            vec![ErrorEntry::default_for(kind), ErrorEntry::detail(detail)],
        )
    }

    /// SQL failure.
    pub fn sql(detail: impl Into<String>) -> Self {
        Self::system(ExceptionKind::Sql, detail)
    }

    /// Configuration failure.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::system(ExceptionKind::Config, detail)
    }

    /// Pipeline or API definition failure.
    pub fn ep_definition(detail: impl Into<String>) -> Self {
        Self::system(ExceptionKind::EpDefinition, detail)
    }

    /// Command I/O failure.
    pub fn command(detail: impl Into<String>) -> Self {
        Self::system(ExceptionKind::Command, detail)
    }

    /// Unclassified failure.
    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::system(ExceptionKind::Unknown, detail)
    }

    /// Add a public message.
    #[must_use]
    pub fn with_public(mut self, message: impl Into<String>) -> Self {
        self.errors.push(ErrorEntry::public(message));
        self
    }

    /// Add a private detail.
    #[must_use]
    pub fn with_detail(mut self, message: impl Into<String>) -> Self {
        self.errors.push(ErrorEntry::detail(message));
        self
    }

    /// Wrap a previous error.
    ///
    /// The wrapped error's type and message are appended as a private detail
    /// and the error itself becomes this exception's source.
    #[must_use]
    pub fn wrap<E>(mut self, previous: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let type_name = short_type_name::<E>();
        self.errors
            .push(ErrorEntry::detail(format!("{type_name}: {previous}")));
        self.source = Some(Box::new(previous));
        self
    }

    /// Wrap another exception, keeping its kind name and all its messages
    /// as private details.
    #[must_use]
    pub fn wrap_exception(mut self, previous: Exception) -> Self {
        let name = previous.kind.name();
        for entry in &previous.errors {
            self.errors
                .push(ErrorEntry::detail(format!("{name}: {}", entry.message)));
        }
        self.source = Some(Box::new(previous));
        self
    }

    /// The exception kind.
    #[must_use]
    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    /// Unique identifier, reported to the caller and logged.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// HTTP status.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    /// All messages in insertion order.
    #[must_use]
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// Messages that may be returned to the caller.
    #[must_use]
    pub fn public_messages(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.public)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Messages that must stay in logs.
    #[must_use]
    pub fn details(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| !e.public)
            .map(|e| e.message.as_str())
            .collect()
    }

    fn render(&self) -> String {
        let mut text = format!("{}: {}", self.code(), self.kind.name());
        for entry in self.errors.iter().filter(|e| !e.default) {
            let _ = write!(text, "; {}", entry.message);
        }
        text
    }

    /// Serialize to the caller-facing shape `{id, errors: [{message}]}`.
    #[must_use]
    pub fn to_public_json(&self) -> Value {
        let errors: Vec<Value> = self
            .public_messages()
            .into_iter()
            .map(|message| json!({ "message": message }))
            .collect();
        json!({
            "id": self.id.to_string(),
            "errors": errors,
        })
    }
}

fn short_type_name<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Result type alias using [`Exception`].
pub type Result<T> = std::result::Result<T, Exception>;

/// Extension trait for turning foreign errors into exceptions.
pub trait ResultExt<T> {
    /// Wrap the error into the exception built by `make`.
    fn or_exception<F>(self, make: F) -> Result<T>
    where
        F: FnOnce() -> Exception;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn or_exception<F>(self, make: F) -> Result<T>
    where
        F: FnOnce() -> Exception,
    {
        self.map_err(|e| make().wrap(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_and_status() {
        assert_eq!(Exception::user("bad").code(), "E400");
        assert_eq!(Exception::forbidden("no").http_status(), 403);
        assert_eq!(Exception::not_found("x").http_status(), 404);
        assert_eq!(Exception::unauthorized("expired").http_status(), 401);
        assert_eq!(Exception::sql("x").code(), "E501");
        assert_eq!(Exception::config("x").code(), "E502");
        assert_eq!(Exception::ep_definition("x").code(), "E503");
        assert_eq!(Exception::command("x").code(), "E504");
        assert!(ExceptionKind::Command.is_system());
        assert!(!ExceptionKind::Forbidden.is_system());
    }

    #[test]
    fn user_message_is_public() {
        let err = Exception::user("no such user");
        assert_eq!(err.public_messages(), vec!["no such user"]);
        assert!(err.details().is_empty());
    }

    #[test]
    fn system_detail_is_private() {
        let err = Exception::sql("connection refused on db01");
        assert_eq!(err.public_messages(), vec![SYSTEM_ERROR_MESSAGE]);
        assert_eq!(err.details(), vec!["connection refused on db01"]);

        let body = err.to_public_json();
        let text = body.to_string();
        assert!(!text.contains("db01"));
        assert_eq!(body["errors"][0]["message"], SYSTEM_ERROR_MESSAGE);
        assert_eq!(body["id"], err.id().to_string());
    }

    #[test]
    fn forbidden_keeps_reason_private_unless_asked() {
        let err = Exception::forbidden("invalid jwt token");
        assert_eq!(err.public_messages(), vec!["Forbidden"]);

        let err = Exception::forbidden("scope [read] lacks [write]").with_public("insufficient scope");
        assert_eq!(err.public_messages(), vec!["Forbidden", "insufficient scope"]);
    }

    #[test]
    fn wrap_appends_type_and_message() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let err = Exception::config("cannot read api.yaml").wrap(io);
        let details = err.details();
        assert_eq!(details.len(), 2);
        assert_eq!(details[1], "Error: missing file");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn wrap_exception_keeps_messages_private() {
        let inner = Exception::user("bad input");
        let err = Exception::command("step failed").wrap_exception(inner);
        assert_eq!(err.public_messages(), vec![SYSTEM_ERROR_MESSAGE]);
        assert!(err.details().contains(&"UserException: bad input"));
    }

    #[test]
    fn display_skips_default_messages() {
        let err = Exception::not_found("no route [GET /x]");
        assert_eq!(err.to_string(), "E404: NotFoundException; no route [GET /x]");
    }

    #[test]
    fn source_follows_wrapped_cause() {
        use std::error::Error;

        let err = Exception::user("bad");
        assert!(err.source().is_none());

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = Exception::sql("write failed").wrap(io);
        assert_eq!(err.source().map(|e| e.to_string()), Some("disk gone".to_string()));
        assert_eq!(err.to_string(), "E501: SqlException; write failed; Error: disk gone");
    }

    #[test]
    fn result_ext_wraps() {
        let parsed: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err = parsed
            .or_exception(|| Exception::user("invalid JSON body"))
            .unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::User);
        assert_eq!(err.details().len(), 1);
    }
}
