use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Sign in with the demo account, report the session and sign out.
    Auth(CredentialArgs),
    /// Check that the signed-in user has a profile and an organization row.
    Profile(CredentialArgs),
    /// Diagnose row-level security on a table.
    Rls(RlsArgs),
    /// Run the checks listed in a TOML plan file.
    Run(RunArgs),
    /// Print the JSON Schema of the rendered report.
    Schema,
}

/// User credentials; default to the `demo` config section.
#[derive(Clone, Debug, Args)]
pub struct CredentialArgs {
    /// Account identifier (defaults to demo.email)
    #[arg(long)]
    pub email: Option<String>,

    /// Account secret (defaults to demo.password)
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct RlsArgs {
    /// Table to inspect
    pub table: String,

    /// Only run the elevated checks; skip the user sign-in
    #[arg(long)]
    pub elevated_only: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    /// Path to the plan file
    pub plan: PathBuf,

    /// Skip the user sign-in; user-scoped checks are reported as not run
    #[arg(long)]
    pub anonymous: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}
