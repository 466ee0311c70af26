//! Saga error types and the fault taxonomy used for message disposition.

use common::MessageId;
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Errors raised by a message broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker could not be reached.
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    /// A settlement referred to a message the broker does not hold in flight.
    #[error("Unknown message: {0}")]
    UnknownMessage(MessageId),

    /// The subscription was closed.
    #[error("Subscription closed: {0}")]
    Closed(String),

    /// A payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BrokerError {
    /// Returns true if retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BrokerError::Unavailable(_))
    }
}

/// A fault raised while executing a workflow, as opposed to a modeled
/// failure variant.
#[derive(Debug, Error)]
pub enum WorkflowFault {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How the consumer should treat a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// The payload itself is at fault; retrying cannot help.
    NonRetriable,
    /// Infrastructure was unreachable; retry later.
    Transient,
    /// Anything else; retried until the delivery-count threshold.
    Unclassified,
}

impl FaultClass {
    /// Returns the class name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultClass::NonRetriable => "non_retriable",
            FaultClass::Transient => "transient",
            FaultClass::Unclassified => "unclassified",
        }
    }
}

impl WorkflowFault {
    /// Maps the fault onto the disposition taxonomy.
    pub fn class(&self) -> FaultClass {
        match self {
            WorkflowFault::Domain(e) if e.is_payload_fault() => FaultClass::NonRetriable,
            WorkflowFault::Store(e) if e.is_transient() => FaultClass::Transient,
            WorkflowFault::Broker(e) if e.is_transient() => FaultClass::Transient,
            _ => FaultClass::Unclassified,
        }
    }
}

/// Convenience type alias for broker results.
pub type Result<T> = std::result::Result<T, BrokerError>;
