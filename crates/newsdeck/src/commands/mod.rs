//! Command handlers, one module per subcommand.

pub mod config_cmd;
pub mod feed;
pub mod item;
pub mod search;
pub mod thread;
pub mod user;
pub mod watch;

use newsdeck_core::NewsClient;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a data command to its handler.
pub async fn dispatch(cmd: Command, client: &NewsClient, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Item(args) => item::handle(client, args, global).await,
        Command::Feed(args) => feed::handle(client, args, global).await,
        Command::Thread(args) => thread::handle(client, args, global).await,
        Command::User(args) => user::handle(client, args, global).await,
        Command::Search(args) => search::handle(client, args, global).await,
        Command::Watch(args) => watch::handle(client, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need a client".into(),
        )),
    }
}
