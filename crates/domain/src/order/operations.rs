//! Order pipeline steps.

use std::sync::Arc;

use chrono::Duration;

use super::{
    CustomerPhone, DeliveryAddress, EnrichedOrder, InvalidOrder, Order, OrderAmount, OrderDetails,
    PlacedOrder, RestaurantId, UnvalidatedOrder,
};
use crate::clock::Clock;
use crate::error::DomainError;
use crate::pipeline::Operation;
use crate::random::RandomSource;
use crate::validation::Validator;

/// Earliest and latest delivery estimate, in minutes after enrichment.
const DELIVERY_ESTIMATE_MINUTES: (u32, u32) = (30, 60);

/// A step over [`Order`] variants.
///
/// Each hook defaults to returning its input, so a step only overrides the
/// states it handles.
pub trait OrderOperation: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_unvalidated(&self, order: UnvalidatedOrder) -> Result<Order, DomainError> {
        Ok(Order::Unvalidated(order))
    }

    fn on_validated(&self, order: OrderDetails) -> Result<Order, DomainError> {
        Ok(Order::Validated(order))
    }

    fn on_enriched(&self, order: EnrichedOrder) -> Result<Order, DomainError> {
        Ok(Order::Enriched(order))
    }

    fn on_placed(&self, order: PlacedOrder) -> Result<Order, DomainError> {
        Ok(Order::Placed(order))
    }

    fn on_invalid(&self, order: InvalidOrder) -> Result<Order, DomainError> {
        Ok(Order::Invalid(order))
    }
}

impl<T: OrderOperation> Operation<Order> for T {
    fn name(&self) -> &'static str {
        OrderOperation::name(self)
    }

    fn transform(&self, order: Order) -> Result<Order, DomainError> {
        match order {
            Order::Unvalidated(order) => self.on_unvalidated(order),
            Order::Validated(order) => self.on_validated(order),
            Order::Enriched(order) => self.on_enriched(order),
            Order::Placed(order) => self.on_placed(order),
            Order::Invalid(order) => self.on_invalid(order),
        }
    }
}

/// Builds every value object and reports all rejected fields together.
#[derive(Debug, Default)]
pub struct ValidateOrder;

impl OrderOperation for ValidateOrder {
    fn name(&self) -> &'static str {
        "ValidateOrder"
    }

    fn on_unvalidated(&self, order: UnvalidatedOrder) -> Result<Order, DomainError> {
        let mut validator = Validator::new();

        let restaurant = validator.check(RestaurantId::parse(&order.restaurant_id));
        let phone = validator.check(CustomerPhone::parse(&order.customer_phone));
        let address = validator.check(DeliveryAddress::parse(&order.delivery_address));
        let amount = validator.check(OrderAmount::new(order.order_amount));

        Ok(match (restaurant, phone, address, amount) {
            (Some(restaurant), Some(phone), Some(address), Some(amount)) => {
                Order::Validated(OrderDetails {
                    restaurant,
                    phone,
                    address,
                    amount,
                })
            }
            _ => Order::Invalid(InvalidOrder {
                reason: validator.reason(),
            }),
        })
    }
}

/// Assigns the order reference and an estimated delivery time.
pub struct EnrichOrder {
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
}

impl EnrichOrder {
    pub fn new(random: Arc<dyn RandomSource>, clock: Arc<dyn Clock>) -> Self {
        Self { random, clock }
    }
}

impl OrderOperation for EnrichOrder {
    fn name(&self) -> &'static str {
        "EnrichOrder"
    }

    fn on_validated(&self, details: OrderDetails) -> Result<Order, DomainError> {
        let now = self.clock.now();
        let (earliest, latest) = DELIVERY_ESTIMATE_MINUTES;
        let minutes = self.random.next_in_range(earliest, latest);
        let suffix = self.random.next_in_range(0, u32::MAX);

        Ok(Order::Enriched(EnrichedOrder {
            details,
            order_reference: format!("ORD-{}-{:08X}", now.format("%Y%m%d"), suffix),
            order_date: now,
            estimated_delivery_at: now + Duration::minutes(i64::from(minutes)),
        }))
    }
}

/// Stamps the enriched order as placed.
pub struct PlaceOrder {
    clock: Arc<dyn Clock>,
}

impl PlaceOrder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl OrderOperation for PlaceOrder {
    fn name(&self) -> &'static str {
        "PlaceOrder"
    }

    fn on_enriched(&self, order: EnrichedOrder) -> Result<Order, DomainError> {
        Ok(Order::Placed(PlacedOrder {
            details: order.details,
            order_reference: order.order_reference,
            estimated_delivery_at: order.estimated_delivery_at,
            placed_at: self.clock.now(),
        }))
    }
}
