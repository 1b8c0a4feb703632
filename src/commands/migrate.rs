//! `claim migrate`.

use crate::context::ServiceContext;
use crate::migrate::{MigrationError, MigrationRequest, Migrator};
use crate::resource::{Backoff, DiscoveryCache, Gateway, TypeResolver};

/// Runs one migration with the given ports.
///
/// # Errors
///
/// Returns the migration failure, tagged with the step that produced it.
pub async fn run(
    ctx: &ServiceContext,
    request: &MigrationRequest,
    backoff: Backoff,
) -> Result<(), MigrationError> {
    let cache = DiscoveryCache::new();
    let migrator = Migrator::new(
        Gateway::new(ctx.store.as_ref()),
        TypeResolver::new(ctx.discovery.as_ref(), &cache),
        backoff,
    );
    let report = migrator.run(request).await?;
    match &report.composite {
        Some(composite) => println!(
            "migrated {} to namespace {} (composite {})",
            report.source, report.destination.namespace, composite.name
        ),
        None => {
            println!("migrated {} to namespace {}", report.source, report.destination.namespace);
        }
    }
    Ok(())
}
