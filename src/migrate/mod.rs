//! Moving a claim to another namespace.
//!
//! [`Migrator::run`] walks a fixed sequence of steps. Steps up to and
//! including the destination-absence check only read; the first write is the
//! creation of the destination claim. Nothing is rolled back: a failure is
//! reported with the step it happened in, and [`MigrationError::residue`]
//! tells what was left behind.

pub mod error;
pub mod token;

pub use error::{MigrateError, MigrationError, MigrationStep, Residue};
pub use token::{parse_claim_token, TokenError};

use serde_json::Value;
use tracing::{info, warn};

use crate::resource::claim;
use crate::resource::{
    mutate_with_retry, retry_on_conflict, Backoff, Gateway, GatewayError, Lookup,
    ResourceReference, RetryError, TypeResolver, TypedResourceDescriptor,
};

/// What to migrate, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    /// `TYPE[.VERSION][.GROUP][/NAME]` token.
    pub claim: String,
    /// Instance name when not part of `claim`.
    pub name: Option<String>,
    /// Namespace the claim lives in now.
    pub source_namespace: String,
    /// Namespace the claim moves to.
    pub destination_namespace: String,
}

/// Outcome of a completed migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// The retired claim.
    pub source: ResourceReference,
    /// The newly created claim.
    pub destination: ResourceReference,
    /// The composite rebound to the new claim; `None` for an unbound claim.
    pub composite: Option<ResourceReference>,
}

/// Runs migrations against one gateway and type resolver.
pub struct Migrator<'a> {
    gateway: Gateway<'a>,
    resolver: TypeResolver<'a>,
    backoff: Backoff,
}

impl<'a> Migrator<'a> {
    /// Creates a migrator; `backoff` bounds both conflict-retried mutations.
    #[must_use]
    pub fn new(gateway: Gateway<'a>, resolver: TypeResolver<'a>, backoff: Backoff) -> Self {
        Self { gateway, resolver, backoff }
    }

    /// Moves the requested claim to the destination namespace.
    ///
    /// # Errors
    ///
    /// Returns a [`MigrationError`] naming the step that failed. Before
    /// [`MigrationStep::CreatingDestination`] completes nothing has been written.
    pub async fn run(&self, request: &MigrationRequest) -> Result<MigrationReport, MigrationError> {
        let log = Transition { request };
        let result = self.steps(&log).await;
        match &result {
            Ok(report) => {
                log.enter(MigrationStep::Done);
                info!(destination = %report.destination, "migration complete");
            }
            Err(err) => warn!(step = %err.step, residue = %err.residue(), "migration aborted"),
        }
        result
    }

    async fn steps(&self, log: &Transition<'_>) -> Result<MigrationReport, MigrationError> {
        let request = log.request;

        log.enter(MigrationStep::ValidatingDestination);
        self.validate_destination(&request.destination_namespace)
            .await
            .map_err(|e| MigrationError::new(MigrationStep::ValidatingDestination, e))?;

        log.enter(MigrationStep::ResolvingType);
        let (descriptor, name) = self
            .resolve(request)
            .await
            .map_err(|e| MigrationError::new(MigrationStep::ResolvingType, e))?;
        if descriptor.has_irregular_plural() {
            warn!(
                kind = %descriptor.kind,
                served = %descriptor.plural,
                "server plural differs from the endpoint derived from the kind"
            );
        }
        let source = descriptor.reference(name, request.source_namespace.as_str());
        let destination = source.in_namespace(request.destination_namespace.as_str());

        log.enter(MigrationStep::CheckingSource);
        let original = match self.gateway.get(&source).await {
            Ok(Lookup::Found(document)) => document,
            Ok(Lookup::Missing) => {
                return Err(MigrationError::new(
                    MigrationStep::CheckingSource,
                    MigrateError::SourceNotFound(source),
                ))
            }
            Err(err) => {
                return Err(MigrationError::new(
                    MigrationStep::CheckingSource,
                    MigrateError::Store(err),
                ))
            }
        };

        log.enter(MigrationStep::CheckingDestinationAbsence);
        match self.gateway.exists(&destination).await {
            Ok(false) => {}
            Ok(true) => {
                return Err(MigrationError::new(
                    MigrationStep::CheckingDestinationAbsence,
                    MigrateError::DestinationAlreadyExists(destination),
                ))
            }
            Err(err) => {
                return Err(MigrationError::new(
                    MigrationStep::CheckingDestinationAbsence,
                    MigrateError::Store(err),
                ))
            }
        }

        log.enter(MigrationStep::CreatingDestination);
        let copy = claim::copy_into_namespace(&original, &destination.namespace);
        let created = self
            .gateway
            .create(&destination, copy)
            .await
            .map_err(|e| {
                MigrationError::new(
                    MigrationStep::CreatingDestination,
                    MigrateError::CreateFailed(e),
                )
            })?;

        log.enter(MigrationStep::RepairingComposite);
        let composite = self
            .repair_composite(&created, &destination)
            .await
            .map_err(|e| MigrationError::new(MigrationStep::RepairingComposite, e))?;

        log.enter(MigrationStep::RetiringSource);
        self.retire_source(&source)
            .await
            .map_err(|e| MigrationError::new(MigrationStep::RetiringSource, e))?;

        Ok(MigrationReport { source, destination, composite })
    }

    async fn validate_destination(&self, namespace: &str) -> Result<(), MigrateError> {
        let reference = ResourceReference::namespace_object(namespace);
        match self.gateway.exists(&reference).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MigrateError::PreconditionFailed(namespace.to_owned())),
            Err(err) => Err(MigrateError::Store(err)),
        }
    }

    async fn resolve<'r>(
        &self,
        request: &'r MigrationRequest,
    ) -> Result<(TypedResourceDescriptor, &'r str), MigrateError> {
        let (token, name) = parse_claim_token(&request.claim, request.name.as_deref())?;
        let descriptor = self.resolver.resolve(token).await?;
        if !descriptor.is_namespaced() {
            return Err(MigrateError::NotNamespaced { kind: descriptor.kind });
        }
        Ok((descriptor, name))
    }

    /// Points the composite named by the new claim's back-reference at it.
    async fn repair_composite(
        &self,
        created: &Value,
        destination: &ResourceReference,
    ) -> Result<Option<ResourceReference>, MigrateError> {
        let Some(composite) = claim::resource_reference(created) else {
            warn!(
                claim = %destination,
                "claim is not bound to a composite, skipping composite update"
            );
            return Ok(None);
        };
        mutate_with_retry(self.gateway, &self.backoff, &composite, |current| {
            claim::bind_composite(current, destination)
        })
        .await
        .map_err(|err| match err {
            RetryError::Aborted(source) => {
                MigrateError::CompositeUpdateFailed { composite: composite.clone(), source }
            }
            exhausted => {
                MigrateError::RetryExhausted { target: composite.clone(), source: exhausted }
            }
        })?;
        info!(composite = %composite, "composite now references the new claim");
        Ok(Some(composite))
    }

    /// Severs the source from its composite, then deletes it.
    async fn retire_source(&self, source: &ResourceReference) -> Result<(), MigrateError> {
        let retirement_error = |err: RetryError<GatewayError>| match err {
            RetryError::Aborted(inner) => MigrateError::SourceRetirementFailed(inner),
            exhausted => MigrateError::RetryExhausted { target: source.clone(), source: exhausted },
        };

        mutate_with_retry(self.gateway, &self.backoff, source, claim::sever_claim)
            .await
            .map_err(retirement_error)?;

        let gateway = self.gateway;
        let deleted = retry_on_conflict(&self.backoff, move || delete_if_present(gateway, source))
            .await
            .map_err(retirement_error)?;

        if deleted {
            info!(claim = %source, "source claim deleted");
        } else {
            warn!(claim = %source, "source claim disappeared before it could be deleted");
        }
        Ok(())
    }
}

/// Re-reads `reference` and deletes it; `false` when it was already gone.
async fn delete_if_present(
    gateway: Gateway<'_>,
    reference: &ResourceReference,
) -> Result<bool, GatewayError> {
    if !gateway.exists(reference).await? {
        return Ok(false);
    }
    match gateway.delete(reference).await {
        Ok(()) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err),
    }
}

/// Logs step transitions with the request's coordinates.
struct Transition<'r> {
    request: &'r MigrationRequest,
}

impl Transition<'_> {
    fn enter(&self, step: MigrationStep) {
        info!(
            step = %step,
            resource = %self.request.claim,
            name = self.request.name.as_deref().unwrap_or_default(),
            source_namespace = %self.request.source_namespace,
            destination_namespace = %self.request.destination_namespace,
            "migration step"
        );
    }
}
