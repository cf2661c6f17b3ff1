use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use gantry_core::error::{Exception, Result};
use gantry_core::inputs::{Inputs, Scope};

use crate::command::{Command, CommandFuture, CommandReturn, parse_args};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationArgs {
    action: String,
    #[serde(default)]
    public_action: Option<String>,
}

/// `authorization-control`: require an action in the caller's scope.
///
/// The scope comes from the signed claim when one is present, otherwise
/// from the HMAC token. It may be an array of strings or a space-separated
/// string.
pub struct AuthorizationCommand<'a> {
    inputs: &'a Inputs,
    scope: Scope<'a>,
}

impl<'a> AuthorizationCommand<'a> {
    /// Create the command for the request in `scope`.
    pub fn new(inputs: &'a Inputs, scope: Scope<'a>) -> Self {
        Self { inputs, scope }
    }

    fn granted_scope(&self) -> Result<Vec<String>> {
        let claim = self.inputs.resolve("jwt.scope", self.scope)?;
        let scope = match claim {
            Some(value) if !value.is_null() => Some(value),
            _ => self.inputs.resolve("hmac.scope", self.scope)?,
        };
        Ok(match scope {
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        })
    }

    fn check(&self, args: &AuthorizationArgs) -> Result<()> {
        let granted = self.granted_scope()?;
        let allowed = granted.iter().any(|s| *s == args.action)
            || args
                .public_action
                .as_ref()
                .is_some_and(|public| granted.iter().any(|s| s == public));
        debug!(action = %args.action, allowed, "authorization check");
        if allowed {
            Ok(())
        } else {
            Err(Exception::forbidden(format!("action [{}] not in scope", args.action))
                .with_public("insufficient scope"))
        }
    }
}

impl Command for AuthorizationCommand<'_> {
    fn name(&self) -> &'static str {
        "authorization-control"
    }

    fn run<'r>(&'r self, args: Value) -> CommandFuture<'r> {
        Box::pin(async move {
            let args: AuthorizationArgs = parse_args(self.name(), args)?;
            self.check(&args)?;
            Ok(CommandReturn::with_data(Value::Object(Default::default())))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::ExceptionKind;
    use gantry_core::inputs::InputsConfig;
    use gantry_core::inputs::sources::{ClaimSettings, ClaimSigner, HmacSettings, hmac_token};
    use gantry_core::request::{HttpMethod, Request};
    use serde_json::json;

    const SECRET: &[u8] = b"hmac-secret";

    fn inputs() -> Inputs {
        let signer = ClaimSigner::from_bytes(&[9; 32]);
        Inputs::new(
            InputsConfig::default()
                .with_claims(ClaimSettings {
                    verifying_key: Some(signer.verifying_key()),
                    ..ClaimSettings::default()
                })
                .with_hmac(HmacSettings {
                    secret: Some(SECRET.to_vec()),
                    ..HmacSettings::default()
                }),
        )
    }

    fn bearer(claims: Value) -> Request {
        let token = ClaimSigner::from_bytes(&[9; 32]).sign(&claims);
        Request::new(HttpMethod::Get, "/").with_header("authorization", format!("Bearer {token}"))
    }

    async fn run(request: &Request, args: Value) -> Result<CommandReturn> {
        let inputs = inputs();
        AuthorizationCommand::new(&inputs, Scope::request(request))
            .run(args)
            .await
    }

    #[tokio::test]
    async fn claim_scope_grants_action() {
        let request = bearer(json!({"scope": ["orders:read", "orders:write"]}));
        assert!(run(&request, json!({"action": "orders:write"})).await.is_ok());
    }

    #[tokio::test]
    async fn missing_action_is_forbidden() {
        let request = bearer(json!({"scope": "orders:read"}));
        let err = run(&request, json!({"action": "orders:write"})).await.unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::Forbidden);
        assert!(err.public_messages().contains(&"insufficient scope"));
    }

    #[tokio::test]
    async fn public_action_opens_resource() {
        let request = bearer(json!({"scope": "public"}));
        let args = json!({"action": "orders:read", "publicAction": "public"});
        assert!(run(&request, args).await.is_ok());
    }

    #[tokio::test]
    async fn falls_back_to_hmac_scope() {
        let token = hmac_token::sign(&json!({"scope": "reports:read"}), SECRET).unwrap();
        let request = Request::new(HttpMethod::Get, "/").with_header("x-hmac-token", token);
        assert!(run(&request, json!({"action": "reports:read"})).await.is_ok());
    }

    #[tokio::test]
    async fn anonymous_is_forbidden() {
        let request = Request::new(HttpMethod::Get, "/");
        let err = run(&request, json!({"action": "x"})).await.unwrap_err();
        assert_eq!(err.http_status(), 403);
    }
}
