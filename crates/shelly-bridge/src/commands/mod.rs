//! Command handlers, one module per command group.

pub mod config_cmd;
pub mod device;
pub mod discover;
pub mod run;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a parsed command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Discover(args) => discover::handle(&args, global).await,
        Command::Status(args) => device::status(&args, global).await,
        Command::On(args) => device::on(&args, global).await,
        Command::Off(args) => device::off(&args, global).await,
        Command::Toggle(args) => device::toggle(&args, global).await,
        Command::Color(args) => device::color(&args, global).await,
        Command::Effect(args) => device::effect(&args, global).await,
        Command::Transition(args) => device::transition(&args, global).await,
        Command::Reboot(args) => device::reboot(&args, global).await,
        Command::Info(args) => device::info(&args, global).await,
        Command::Run(args) => run::handle(&args, global).await,
        Command::Config(args) => config_cmd::handle(&args, global),
        Command::Completions(_) => unreachable!("handled before dispatch"),
    }
}
