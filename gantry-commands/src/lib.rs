//! Gantry Commands
//!
//! The units of work behind pipeline steps.
//!
//! A step names a command `type`; the [`CommandFactory`] turns it into a
//! [`Command`] bound to the request's [`CommandConfig`], and the command
//! returns a [`CommandReturn`] describing what should change on the
//! response. Custom step types plug in through [`CommandProvider`].
//!
//! The [`sql`] module holds the database contract used by `sql-query`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builtin;
pub mod command;
pub mod factory;
pub mod sql;

pub use command::{Command, CommandConfig, CommandFuture, CommandReturn, parse_args};
pub use factory::{CommandFactory, CommandProvider};
