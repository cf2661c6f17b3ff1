//! Commands shipped with the engine.

mod api_call;
mod args;
mod authorization;
mod redirection;
mod scrape;
mod sql_query;
mod test;

pub use api_call::ApiCallCommand;
pub use args::ArgsCommand;
pub use authorization::AuthorizationCommand;
pub use redirection::RedirectionCommand;
pub use scrape::ScrapeCommand;
pub use sql_query::SqlQueryCommand;
pub use test::TestCommand;
