//! Command dispatch and handlers.

pub mod migrate;

use tracing::info;

use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::config::{Mode, Settings};
use crate::context::ServiceContext;
use crate::migrate::{MigrationError, MigrationRequest};

/// Dispatch a parsed command to its handler.
///
/// `settings.mode` decides whether the ports talk to the cluster, record
/// every interaction into per-port cassettes, or replay a cassette.
///
/// # Errors
///
/// Returns the full error chain as a string if the command fails.
pub fn dispatch(command: &Command, settings: &Settings) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;
    runtime.block_on(dispatch_async(command, settings))
}

async fn dispatch_async(command: &Command, settings: &Settings) -> Result<(), String> {
    match &settings.mode {
        Mode::Live => {
            let ctx = ServiceContext::live().await?;
            dispatch_with_context(command, &ctx, settings).await
        }
        Mode::Replay(path) => {
            let ctx = ServiceContext::replaying(path)?;
            dispatch_with_context(command, &ctx, settings).await
        }
        Mode::Record(dir) => {
            let (ctx, session) = ServiceContext::recording_at(dir).await?;
            let result = dispatch_with_context(command, &ctx, settings).await;
            // Drop context first to release the recorders.
            drop(ctx);
            finish_recording(session)?;
            result
        }
    }
}

/// Dispatch a command with the given service context.
async fn dispatch_with_context(
    command: &Command,
    ctx: &ServiceContext,
    settings: &Settings,
) -> Result<(), String> {
    match command {
        Command::Migrate { claim, name, namespace, dest_namespace } => {
            let request = MigrationRequest {
                claim: claim.clone(),
                name: name.clone(),
                source_namespace: namespace.clone(),
                destination_namespace: dest_namespace.clone(),
            };
            migrate::run(ctx, &request, settings.backoff).await.map_err(report)
        }
    }
}

/// Renders the error chain, followed by what the failed run left behind.
fn report(err: MigrationError) -> String {
    let residue = err.residue();
    format!("{:#}\n{residue}", anyhow::Error::new(err))
}

/// Finish a recording session and log the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    info!(dir = %output_dir.display(), "recording saved");
    Ok(())
}
