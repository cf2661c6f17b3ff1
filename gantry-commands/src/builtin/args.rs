use serde_json::Value;

use crate::command::{Command, CommandFuture, CommandReturn};

/// `args`: hands its expanded arguments back as `data`.
pub struct ArgsCommand;

impl Command for ArgsCommand {
    fn name(&self) -> &'static str {
        "args"
    }

    fn run<'a>(&'a self, args: Value) -> CommandFuture<'a> {
        Box::pin(async move { Ok(CommandReturn::with_data(args)) })
    }
}
