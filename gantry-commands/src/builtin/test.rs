use serde_json::Value;

use crate::command::{Command, CommandFuture, CommandReturn, parse_args};

/// `test`: returns its arguments verbatim as a [`CommandReturn`].
pub struct TestCommand;

impl Command for TestCommand {
    fn name(&self) -> &'static str {
        "test"
    }

    fn run<'a>(&'a self, args: Value) -> CommandFuture<'a> {
        Box::pin(async move {
            if args.is_null() {
                return Ok(CommandReturn::empty());
            }
            parse_args(self.name(), args)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn returns_literal() {
        let result = TestCommand
            .run(json!({"data": 1, "headers": {"x-a": "b"}, "redirect": {"url": "/next"}}))
            .await
            .unwrap();
        assert_eq!(result.data, Some(json!(1)));
        assert_eq!(result.redirect.unwrap().url, "/next");
        assert_eq!(TestCommand.run(Value::Null).await.unwrap(), CommandReturn::empty());
    }

    #[tokio::test]
    async fn rejects_malformed_literal() {
        assert!(TestCommand.run(json!({"cookies": "nope"})).await.is_err());
    }
}
