//! Failure taxonomy of a migration run.

use std::fmt;

use thiserror::Error;

use super::token::TokenError;
use crate::resource::{GatewayError, ResolveError, ResourceReference, RetryError};

/// Why a migration stopped.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The destination namespace does not exist.
    #[error("cannot create new claim, namespace {0} does not exist")]
    PreconditionFailed(String),
    /// The claim argument is malformed.
    #[error("invalid resource and name")]
    InvalidInput(#[from] TokenError),
    /// The type token did not resolve, or discovery failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The type is cluster-scoped.
    #[error("{kind} resource is not namespaced")]
    NotNamespaced {
        /// Resolved kind.
        kind: String,
    },
    /// The source claim does not exist.
    #[error("source claim {0} not found")]
    SourceNotFound(ResourceReference),
    /// A claim of the same name already exists in the destination namespace.
    #[error(
        "cannot create new claim: claim {} in namespace {} already exists",
        .0.name,
        .0.namespace
    )]
    DestinationAlreadyExists(ResourceReference),
    /// Creating the destination claim failed.
    #[error("cannot create destination claim")]
    CreateFailed(#[source] GatewayError),
    /// Rebinding the composite failed for a reason other than conflicts.
    #[error("unable to update composite {composite}")]
    CompositeUpdateFailed {
        /// Composite being rebound.
        composite: ResourceReference,
        /// Underlying failure.
        #[source]
        source: GatewayError,
    },
    /// Severing or deleting the source claim failed for a reason other than conflicts.
    #[error("unable to delete source claim")]
    SourceRetirementFailed(#[source] GatewayError),
    /// Conflicting writers outlasted the retry budget.
    #[error("gave up on {target}")]
    RetryExhausted {
        /// Instance that kept conflicting.
        target: ResourceReference,
        /// Exhausted retry loop.
        #[source]
        source: RetryError<GatewayError>,
    },
    /// A read failed for a reason other than "not found".
    #[error("cannot get requested resource")]
    Store(#[source] GatewayError),
}

/// Step of the migration state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MigrationStep {
    /// Destination namespace lookup.
    ValidatingDestination,
    /// Token parsing and discovery.
    ResolvingType,
    /// Source claim lookup.
    CheckingSource,
    /// Destination claim lookup.
    CheckingDestinationAbsence,
    /// Destination claim creation.
    CreatingDestination,
    /// Composite rebinding.
    RepairingComposite,
    /// Source severance and deletion.
    RetiringSource,
    /// All mutations committed.
    Done,
}

impl MigrationStep {
    /// Steps in execution order.
    pub const ALL: [Self; 8] = [
        Self::ValidatingDestination,
        Self::ResolvingType,
        Self::CheckingSource,
        Self::CheckingDestinationAbsence,
        Self::CreatingDestination,
        Self::RepairingComposite,
        Self::RetiringSource,
        Self::Done,
    ];

    /// Short name used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidatingDestination => "validating destination",
            Self::ResolvingType => "resolving type",
            Self::CheckingSource => "checking source",
            Self::CheckingDestinationAbsence => "checking destination absence",
            Self::CreatingDestination => "creating destination",
            Self::RepairingComposite => "repairing composite",
            Self::RetiringSource => "retiring source",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an aborted migration left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residue {
    /// Nothing was written; rerunning is safe.
    Untouched,
    /// The destination claim exists but the composite still names the source namespace.
    DestinationCreated,
    /// Destination and composite are bound; the source claim still exists.
    SourceInert,
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Untouched => "no changes were made",
            Self::DestinationCreated => {
                "the destination claim exists but its composite still points at the \
                 source namespace"
            }
            Self::SourceInert => {
                "the destination claim is bound but the source claim still exists and \
                 must be deleted"
            }
        })
    }
}

/// A [`MigrateError`] tagged with the step that produced it.
#[derive(Debug, Error)]
#[error("migration aborted while {step}")]
pub struct MigrationError {
    /// Step that failed.
    pub step: MigrationStep,
    /// Failure.
    #[source]
    pub kind: MigrateError,
}

impl MigrationError {
    pub(crate) fn new(step: MigrationStep, kind: impl Into<MigrateError>) -> Self {
        Self { step, kind: kind.into() }
    }

    /// The state the cluster was left in.
    #[must_use]
    pub fn residue(&self) -> Residue {
        match self.step {
            MigrationStep::RepairingComposite => Residue::DestinationCreated,
            MigrationStep::RetiringSource | MigrationStep::Done => Residue::SourceInert,
            _ => Residue::Untouched,
        }
    }
}
