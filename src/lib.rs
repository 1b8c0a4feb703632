//! Moves Crossplane claims between namespaces.
//!
//! The library is split along the boundary to the control plane: `ports`
//! holds the traits, `adapters` the implementations (live cluster, cassette
//! record/replay, in-memory), and `resource` plus `migrate` hold the logic
//! that only ever talks to the traits.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod logging;
pub mod migrate;
pub mod ports;
pub mod resource;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// Installs logging, reads [`config::Settings`] from the environment and
/// dispatches the command.
///
/// # Errors
///
/// Returns an error string when argument parsing, configuration, or command
/// execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    logging::init(cli.debug);
    let settings = config::Settings::from_env().map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command, &settings)
}
