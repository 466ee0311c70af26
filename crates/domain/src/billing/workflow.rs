use std::sync::Arc;

use super::{
    CalculateInvoice, Invoice, InvoiceEvent, InvoiceFailedEvent, InvoiceIssuedEvent, IssueInvoice,
    OrderPlacedMessage, ValidateTax,
};
use crate::clock::{Clock, SystemClock};
use crate::error::DomainError;
use crate::pipeline::Pipeline;
use crate::workflow::{WorkflowDefinition, unexpected_state};

/// Invoice issuance: calculate, check the tax rate, issue.
pub struct InvoiceIssuance {
    pipeline: Pipeline<Invoice>,
    clock: Arc<dyn Clock>,
}

impl InvoiceIssuance {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_calculation(CalculateInvoice::default(), clock)
    }

    /// Builds the workflow around a custom calculation step.
    pub fn with_calculation(calculate: CalculateInvoice, clock: Arc<dyn Clock>) -> Self {
        let pipeline = Pipeline::new()
            .then(calculate)
            .then(ValidateTax)
            .then(IssueInvoice::new(clock.clone()));

        Self { pipeline, clock }
    }
}

impl Default for InvoiceIssuance {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl WorkflowDefinition for InvoiceIssuance {
    type Command = OrderPlacedMessage;
    type Entity = Invoice;
    type Event = InvoiceEvent;

    const NAME: &'static str = "issue_invoice";
    const DEFAULT_TOPIC: &'static str = "billing-topic";

    fn start(&self, message: OrderPlacedMessage) -> Invoice {
        Invoice::Unprocessed(message.into())
    }

    fn pipeline(&self) -> &Pipeline<Invoice> {
        &self.pipeline
    }

    fn to_event(&self, invoice: &Invoice) -> Result<InvoiceEvent, DomainError> {
        match invoice {
            Invoice::Issued(issued) => Ok(InvoiceEvent::Issued(InvoiceIssuedEvent::from(issued))),
            Invoice::Invalid(invalid) => Ok(self.failure_event(invalid.reason.clone())),
            Invoice::Failed(failed) => Ok(self.failure_event(failed.reason.clone())),
            other => Err(unexpected_state(other)),
        }
    }

    fn failure_event(&self, reason: String) -> InvoiceEvent {
        InvoiceEvent::Failed(InvoiceFailedEvent {
            reason,
            failed_at: self.clock.now(),
        })
    }
}
