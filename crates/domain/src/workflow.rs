//! Per-service description of a workflow, consumed by the saga runtime.

use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};
use store::StoredEntity;

use crate::error::DomainError;
use crate::pipeline::{Pipeline, Variant};

/// Everything the generic workflow needs to know about one service:
/// how to build the initial variant, which operations to run, and which
/// events to emit.
pub trait WorkflowDefinition: Send + Sync + 'static {
    /// Inbound payload.
    type Command: DeserializeOwned + Debug + Send + Sync + 'static;

    /// The variant entity run through the pipeline.
    type Entity: Variant + StoredEntity;

    /// Success or failure event returned to the caller. The success event is
    /// also the published payload.
    type Event: Serialize + Clone + Debug + Send + Sync + 'static;

    /// Workflow name for logs and metrics.
    const NAME: &'static str;

    /// Topic the success event is published to.
    const DEFAULT_TOPIC: &'static str;

    /// Builds the initial, unvalidated variant straight from the command.
    fn start(&self, command: Self::Command) -> Self::Entity;

    /// The ordered operations for this domain.
    fn pipeline(&self) -> &Pipeline<Self::Entity>;

    /// Converts a terminal variant into its event.
    ///
    /// Fails with [`DomainError::UnexpectedState`] for intermediate variants.
    fn to_event(&self, entity: &Self::Entity) -> Result<Self::Event, DomainError>;

    /// Builds the failure event for a fault caught at the workflow boundary.
    fn failure_event(&self, reason: String) -> Self::Event;
}

/// Shorthand for the unexpected-state error of a variant.
pub(crate) fn unexpected_state<V: Variant>(entity: &V) -> DomainError {
    DomainError::UnexpectedState {
        entity: V::ENTITY,
        state: entity.state(),
    }
}
