use std::sync::Arc;

use super::{
    AssignDelivery, Delivery, DeliveryEvent, DeliveryFailedEvent, DeliveryStartedEvent,
    InvoiceIssuedMessage, OptimizeRoute, StartDelivery,
};
use crate::clock::{Clock, SystemClock};
use crate::error::DomainError;
use crate::pipeline::Pipeline;
use crate::random::{RandomSource, ThreadRandom};
use crate::workflow::{WorkflowDefinition, unexpected_state};

/// Delivery dispatch: assign, optimize, start.
pub struct DeliveryDispatch {
    pipeline: Pipeline<Delivery>,
    clock: Arc<dyn Clock>,
}

impl DeliveryDispatch {
    pub fn new(random: Arc<dyn RandomSource>, clock: Arc<dyn Clock>) -> Self {
        let pipeline = Pipeline::new()
            .then(AssignDelivery::new(random.clone()))
            .then(OptimizeRoute::new(random))
            .then(StartDelivery::new(clock.clone()));

        Self { pipeline, clock }
    }
}

impl Default for DeliveryDispatch {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom), Arc::new(SystemClock))
    }
}

impl WorkflowDefinition for DeliveryDispatch {
    type Command = InvoiceIssuedMessage;
    type Entity = Delivery;
    type Event = DeliveryEvent;

    const NAME: &'static str = "start_delivery";
    const DEFAULT_TOPIC: &'static str = "delivery-topic";

    fn start(&self, message: InvoiceIssuedMessage) -> Delivery {
        Delivery::Requested(message.into())
    }

    fn pipeline(&self) -> &Pipeline<Delivery> {
        &self.pipeline
    }

    fn to_event(&self, delivery: &Delivery) -> Result<DeliveryEvent, DomainError> {
        match delivery {
            Delivery::Started(started) => {
                Ok(DeliveryEvent::Started(DeliveryStartedEvent::from(started)))
            }
            Delivery::Failed(failed) => Ok(self.failure_event(failed.reason.clone())),
            other => Err(unexpected_state(other)),
        }
    }

    fn failure_event(&self, reason: String) -> DeliveryEvent {
        DeliveryEvent::Failed(DeliveryFailedEvent {
            reason,
            failed_at: self.clock.now(),
        })
    }
}
