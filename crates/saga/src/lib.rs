//! Choreography runtime for the order saga.
//!
//! Services never call each other. Each one runs a [`Workflow`] and
//! publishes its success event; the next service consumes that topic
//! through an [`IdempotentConsumer`]:
//!
//! ```text
//! POST /orders ─► place_order ─► order-topic ─► issue_invoice ─► billing-topic ─► start_delivery ─► delivery-topic
//! ```

pub mod broker;
pub mod consumer;
pub mod error;
pub mod sender;
pub mod workflow;

pub use broker::{
    DeadLetter, Delivery, DeliverySettlement, DeliveryStream, InMemoryBroker, MessageBroker,
};
pub use consumer::{
    ConsumerConfig, DEFAULT_MAX_DELIVERY_ATTEMPTS, DeadLetterReason, Disposition,
    IdempotentConsumer,
};
pub use error::{BrokerError, FaultClass, WorkflowFault};
pub use sender::{BrokerEventSender, EventSender};
pub use workflow::{Workflow, WorkflowOutcome};
