//! Idempotent message consumer.
//!
//! ```text
//! Received ──► DedupSkip ──────────────► Completed
//!     │
//!     └──► Processing ──► Completed
//!                     ├─► Abandoned     (retry)
//!                     └─► DeadLettered  (inspect)
//! ```
//!
//! A subscription is consumed one message at a time. The dedup check and
//! the ledger write for a message never interleave with another message's,
//! at the cost of throughput.
//!
//! Delivery is at-least-once. The ledger entry is written after the entity
//! was saved and the event published; if that write fails the message is
//! abandoned and its redelivery repeats both side effects.

use common::MessageId;
use domain::{DomainError, FailureKind, WorkflowDefinition};
use futures_util::StreamExt;
use store::{DedupLedger, LedgerEntry, Repository};
use tokio::sync::watch;

use crate::broker::{Delivery, DeliveryStream};
use crate::error::{FaultClass, WorkflowFault};
use crate::sender::EventSender;
use crate::workflow::{Workflow, WorkflowOutcome};

/// Deliveries allowed before an unclassified fault is dead-lettered.
pub const DEFAULT_MAX_DELIVERY_ATTEMPTS: u32 = 3;

/// Per-subscription consumer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Name written to the dedup ledger.
    pub processor_name: String,
    pub max_delivery_attempts: u32,
}

impl ConsumerConfig {
    pub fn new(processor_name: impl Into<String>) -> Self {
        Self {
            processor_name: processor_name.into(),
            max_delivery_attempts: DEFAULT_MAX_DELIVERY_ATTEMPTS,
        }
    }

    pub fn with_max_delivery_attempts(mut self, attempts: u32) -> Self {
        self.max_delivery_attempts = attempts;
        self
    }
}

/// Reason code attached to a dead-lettered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLetterReason {
    DeserializationFailed,
    ValidationFailed,
    BusinessRuleViolation,
    MaxDeliveryAttemptsExceeded,
}

impl DeadLetterReason {
    /// Returns the reason code sent to the broker.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadLetterReason::DeserializationFailed => "DeserializationFailed",
            DeadLetterReason::ValidationFailed => "ValidationFailed",
            DeadLetterReason::BusinessRuleViolation => "BusinessRuleViolation",
            DeadLetterReason::MaxDeliveryAttemptsExceeded => "MaxDeliveryAttemptsExceeded",
        }
    }
}

impl From<FailureKind> for DeadLetterReason {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Structural => DeadLetterReason::ValidationFailed,
            FailureKind::BusinessRule => DeadLetterReason::BusinessRuleViolation,
        }
    }
}

/// What happened to a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Processed and acknowledged.
    Completed,
    /// Already in the ledger; acknowledged without reprocessing.
    DedupSkip,
    /// Returned to the broker for redelivery.
    Abandoned { reason: String },
    /// Removed from the normal flow.
    DeadLettered {
        reason: DeadLetterReason,
        description: String,
    },
}

impl Disposition {
    /// Returns the disposition name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Completed => "completed",
            Disposition::DedupSkip => "dedup_skip",
            Disposition::Abandoned { .. } => "abandoned",
            Disposition::DeadLettered { .. } => "dead_lettered",
        }
    }
}

/// Consumes one subscription, running a workflow once per message ID.
pub struct IdempotentConsumer<D, R, S, L> {
    workflow: Workflow<D, R, S>,
    ledger: L,
    config: ConsumerConfig,
}

impl<D, R, S, L> IdempotentConsumer<D, R, S, L>
where
    D: WorkflowDefinition,
    R: Repository<D::Entity>,
    S: EventSender,
    L: DedupLedger,
{
    pub fn new(workflow: Workflow<D, R, S>, ledger: L, config: ConsumerConfig) -> Self {
        Self {
            workflow,
            ledger,
            config,
        }
    }

    pub fn workflow(&self) -> &Workflow<D, R, S> {
        &self.workflow
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Decides the disposition of one message without settling it.
    #[tracing::instrument(
        skip(self, message_id, body),
        fields(processor = %self.config.processor_name, message_id = %message_id)
    )]
    pub async fn process(
        &self,
        message_id: &MessageId,
        body: &[u8],
        delivery_count: u32,
    ) -> Disposition {
        match self.ledger.exists(message_id).await {
            Ok(true) => {
                tracing::info!("message already processed");
                return Disposition::DedupSkip;
            }
            Ok(false) => {}
            Err(e) => {
                return Disposition::Abandoned {
                    reason: format!("Dedup check failed: {e}"),
                };
            }
        }

        let command: D::Command = match serde_json::from_slice(body) {
            Ok(command) => command,
            Err(e) => {
                return Disposition::DeadLettered {
                    reason: DeadLetterReason::DeserializationFailed,
                    description: e.to_string(),
                };
            }
        };

        match self.workflow.run(command).await {
            WorkflowOutcome::Succeeded { .. } => {
                let entry = LedgerEntry::now(message_id.clone(), &self.config.processor_name);
                match self.ledger.record(entry).await {
                    Ok(()) => Disposition::Completed,
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "ledger write failed after save and publish; redelivery will repeat them"
                        );
                        Disposition::Abandoned {
                            reason: format!("Ledger write failed: {e}"),
                        }
                    }
                }
            }
            WorkflowOutcome::Rejected { kind, reason, .. } => Disposition::DeadLettered {
                reason: kind.into(),
                description: reason,
            },
            WorkflowOutcome::Faulted { fault, .. } => self.classify(fault, delivery_count),
        }
    }

    fn classify(&self, fault: WorkflowFault, delivery_count: u32) -> Disposition {
        match fault.class() {
            FaultClass::NonRetriable => {
                let reason = match &fault {
                    WorkflowFault::Domain(DomainError::BusinessRule(_)) => {
                        DeadLetterReason::BusinessRuleViolation
                    }
                    _ => DeadLetterReason::ValidationFailed,
                };
                Disposition::DeadLettered {
                    reason,
                    description: fault.to_string(),
                }
            }
            FaultClass::Transient => Disposition::Abandoned {
                reason: fault.to_string(),
            },
            FaultClass::Unclassified if delivery_count >= self.config.max_delivery_attempts => {
                Disposition::DeadLettered {
                    reason: DeadLetterReason::MaxDeliveryAttemptsExceeded,
                    description: format!("{fault} (delivery {delivery_count})"),
                }
            }
            FaultClass::Unclassified => Disposition::Abandoned {
                reason: fault.to_string(),
            },
        }
    }

    /// Processes and settles one delivery.
    pub async fn handle(&self, delivery: Delivery) -> Disposition {
        let disposition = self
            .process(&delivery.message_id, &delivery.body, delivery.delivery_count)
            .await;

        let message_id = delivery.message_id.clone();
        let delivery_count = delivery.delivery_count;
        let settled = match &disposition {
            Disposition::Completed | Disposition::DedupSkip => delivery.complete().await,
            Disposition::Abandoned { reason } => {
                tracing::warn!(%message_id, delivery_count, %reason, "message abandoned");
                delivery.abandon().await
            }
            Disposition::DeadLettered {
                reason,
                description,
            } => {
                tracing::warn!(
                    %message_id,
                    delivery_count,
                    reason = reason.as_str(),
                    %description,
                    "message dead-lettered"
                );
                delivery.dead_letter(reason.as_str(), description).await
            }
        };

        if let Err(e) = settled {
            tracing::error!(%message_id, error = %e, "failed to settle message");
        }

        metrics::counter!(
            "consumer_messages_total",
            "processor" => self.config.processor_name.clone(),
            "disposition" => disposition.as_str()
        )
        .increment(1);

        disposition
    }

    /// Receive loop. Handles one delivery at a time until the stream ends or
    /// `shutdown` turns true; a message already being handled is settled
    /// before the loop returns.
    pub async fn run(&self, mut deliveries: DeliveryStream, mut shutdown: watch::Receiver<bool>) {
        let processor = self.config.processor_name.as_str();
        tracing::info!(processor, "consumer started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                next = deliveries.next() => match next {
                    Some(Ok(delivery)) => {
                        self.handle(delivery).await;
                    }
                    Some(Err(e)) => {
                        tracing::error!(processor, error = %e, "failed to receive message");
                    }
                    None => break,
                },
            }
        }

        tracing::info!(processor, "consumer stopped");
    }
}
