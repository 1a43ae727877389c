use ward_config::WardenConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to its handler and return the process exit code.
pub async fn dispatch(
    command: &Commands,
    flags: &GlobalFlags,
    config: &WardenConfig,
) -> anyhow::Result<i32> {
    match command {
        Commands::Auth(args) => commands::auth::handle(args, flags, config).await,
        Commands::Profile(args) => commands::profile::handle(args, flags, config).await,
        Commands::Rls(args) => commands::rls::handle(args, flags, config).await,
        Commands::Run(args) => commands::run::handle(args, flags, config).await,
        Commands::Schema => unreachable!("schema is pre-dispatched in main"),
    }
}
