use std::sync::Arc;

use super::{
    EnrichOrder, InvalidOrder, Order, OrderEvent, OrderFailedEvent, OrderPlacedEvent, PlaceOrder,
    PlaceOrderCommand, ValidateOrder,
};
use crate::clock::{Clock, SystemClock};
use crate::error::DomainError;
use crate::pipeline::Pipeline;
use crate::random::{RandomSource, ThreadRandom};
use crate::workflow::{WorkflowDefinition, unexpected_state};

/// Order placement: validate, enrich, place.
pub struct OrderPlacement {
    pipeline: Pipeline<Order>,
    clock: Arc<dyn Clock>,
}

impl OrderPlacement {
    /// Creates the workflow with injected randomness and time.
    pub fn new(random: Arc<dyn RandomSource>, clock: Arc<dyn Clock>) -> Self {
        let pipeline = Pipeline::new()
            .then(ValidateOrder)
            .then(EnrichOrder::new(random, clock.clone()))
            .then(PlaceOrder::new(clock.clone()));

        Self { pipeline, clock }
    }
}

impl Default for OrderPlacement {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom), Arc::new(SystemClock))
    }
}

impl WorkflowDefinition for OrderPlacement {
    type Command = PlaceOrderCommand;
    type Entity = Order;
    type Event = OrderEvent;

    const NAME: &'static str = "place_order";
    const DEFAULT_TOPIC: &'static str = "order-topic";

    fn start(&self, command: PlaceOrderCommand) -> Order {
        Order::Unvalidated(command.into())
    }

    fn pipeline(&self) -> &Pipeline<Order> {
        &self.pipeline
    }

    fn to_event(&self, order: &Order) -> Result<OrderEvent, DomainError> {
        match order {
            Order::Placed(placed) => Ok(OrderEvent::Placed(OrderPlacedEvent::from(placed))),
            Order::Invalid(InvalidOrder { reason }) => Ok(self.failure_event(reason.clone())),
            other => Err(unexpected_state(other)),
        }
    }

    fn failure_event(&self, reason: String) -> OrderEvent {
        OrderEvent::Failed(OrderFailedEvent {
            reason,
            failed_at: self.clock.now(),
        })
    }
}
