//! Generic workflow: run the pipeline, persist, then publish.

use std::time::Instant;

use common::{EntityId, MessageId};
use domain::{DomainError, FailureKind, Phase, Variant, WorkflowDefinition};
use store::Repository;

use crate::error::WorkflowFault;
use crate::sender::EventSender;

/// Result of one workflow execution.
///
/// Every outcome carries the event returned to the caller; faults never
/// escape the workflow.
#[derive(Debug)]
pub enum WorkflowOutcome<E> {
    /// Terminal success: the entity was saved and the event published.
    Succeeded {
        event: E,
        entity_id: EntityId,
        message_id: MessageId,
    },
    /// A modeled failure variant. Nothing was saved or published.
    Rejected {
        event: E,
        kind: FailureKind,
        reason: String,
    },
    /// An unexpected fault, converted into a failure event.
    Faulted { event: E, fault: WorkflowFault },
}

impl<E> WorkflowOutcome<E> {
    /// Returns the event for the caller.
    pub fn event(&self) -> &E {
        match self {
            WorkflowOutcome::Succeeded { event, .. }
            | WorkflowOutcome::Rejected { event, .. }
            | WorkflowOutcome::Faulted { event, .. } => event,
        }
    }

    /// Consumes the outcome, returning the event.
    pub fn into_event(self) -> E {
        match self {
            WorkflowOutcome::Succeeded { event, .. }
            | WorkflowOutcome::Rejected { event, .. }
            | WorkflowOutcome::Faulted { event, .. } => event,
        }
    }

    /// Returns true for terminal success.
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowOutcome::Succeeded { .. })
    }

    /// Returns the outcome name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowOutcome::Succeeded { .. } => "succeeded",
            WorkflowOutcome::Rejected { .. } => "rejected",
            WorkflowOutcome::Faulted { .. } => "faulted",
        }
    }
}

/// Runs one service's pipeline and handles its side effects.
///
/// Persistence happens before publish, and publish is only attempted for a
/// saved success variant.
pub struct Workflow<D, R, S> {
    definition: D,
    repository: R,
    sender: S,
    topic: String,
}

impl<D, R, S> Workflow<D, R, S>
where
    D: WorkflowDefinition,
    R: Repository<D::Entity>,
    S: EventSender,
{
    /// Creates a workflow publishing to the definition's default topic.
    pub fn new(definition: D, repository: R, sender: S) -> Self {
        Self {
            definition,
            repository,
            sender,
            topic: D::DEFAULT_TOPIC.to_string(),
        }
    }

    /// Overrides the outbound topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn definition(&self) -> &D {
        &self.definition
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Executes the workflow and returns only the event.
    pub async fn execute(&self, command: D::Command) -> D::Event {
        self.run(command).await.into_event()
    }

    /// Executes the workflow.
    #[tracing::instrument(skip(self, command), fields(workflow = D::NAME, topic = %self.topic))]
    pub async fn run(&self, command: D::Command) -> WorkflowOutcome<D::Event> {
        metrics::counter!("workflow_executions_total", "workflow" => D::NAME).increment(1);
        let started = Instant::now();

        let outcome = match self.try_run(command).await {
            Ok(outcome) => outcome,
            Err(fault) => {
                tracing::error!(
                    error = %fault,
                    class = fault.class().as_str(),
                    "workflow faulted"
                );
                WorkflowOutcome::Faulted {
                    event: self
                        .definition
                        .failure_event(format!("Unexpected error: {fault}")),
                    fault,
                }
            }
        };

        let counter = match &outcome {
            WorkflowOutcome::Succeeded { .. } => "workflow_succeeded_total",
            WorkflowOutcome::Rejected { .. } => "workflow_rejected_total",
            WorkflowOutcome::Faulted { .. } => "workflow_faulted_total",
        };
        metrics::counter!(counter, "workflow" => D::NAME).increment(1);
        metrics::histogram!("workflow_duration_seconds", "workflow" => D::NAME)
            .record(started.elapsed().as_secs_f64());

        outcome
    }

    async fn try_run(
        &self,
        command: D::Command,
    ) -> Result<WorkflowOutcome<D::Event>, WorkflowFault> {
        let initial = self.definition.start(command);
        let entity = self.definition.pipeline().run(initial)?;

        match entity.phase() {
            Phase::Succeeded => {
                let event = self.definition.to_event(&entity)?;
                let entity_id = self.repository.save(&entity).await?;
                let payload = serde_json::to_value(&event)?;
                let message_id = self.sender.send(&self.topic, payload).await?;

                tracing::info!(%entity_id, %message_id, state = entity.state(), "workflow succeeded");
                Ok(WorkflowOutcome::Succeeded {
                    event,
                    entity_id,
                    message_id,
                })
            }
            Phase::Failed(kind) => {
                let event = self.definition.to_event(&entity)?;
                let reason = entity.failure_reason().unwrap_or_default().to_string();

                tracing::info!(kind = kind.as_str(), %reason, "workflow rejected");
                Ok(WorkflowOutcome::Rejected {
                    event,
                    kind,
                    reason,
                })
            }
            Phase::Intermediate => Err(DomainError::UnexpectedState {
                entity: <D::Entity as Variant>::ENTITY,
                state: entity.state(),
            }
            .into()),
        }
    }
}
