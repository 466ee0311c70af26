//! Delivery pipeline steps.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::{
    AVERAGE_SPEED_KMH, AssignedDelivery, Delivery, DeliveryDestination, DeliveryRoute, DriverId,
    FailedDelivery, InvoiceReference, InvoiceTotal, OptimizedDelivery, RequestedDelivery,
    RouteEstimate, StartedDelivery,
};
use crate::clock::Clock;
use crate::error::DomainError;
use crate::pipeline::Operation;
use crate::random::RandomSource;
use crate::validation::Validator;

/// Distance estimate bounds, in hundredths of a kilometre (2.00 to 17.00 km).
const DISTANCE_HUNDREDTHS: (u32, u32) = (200, 1700);

/// A step over [`Delivery`] variants. Hooks default to pass-through.
pub trait DeliveryOperation: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_requested(&self, delivery: RequestedDelivery) -> Result<Delivery, DomainError> {
        Ok(Delivery::Requested(delivery))
    }

    fn on_assigned(&self, delivery: AssignedDelivery) -> Result<Delivery, DomainError> {
        Ok(Delivery::Assigned(delivery))
    }

    fn on_optimized(&self, delivery: OptimizedDelivery) -> Result<Delivery, DomainError> {
        Ok(Delivery::Optimized(delivery))
    }

    fn on_started(&self, delivery: StartedDelivery) -> Result<Delivery, DomainError> {
        Ok(Delivery::Started(delivery))
    }

    fn on_failed(&self, delivery: FailedDelivery) -> Result<Delivery, DomainError> {
        Ok(Delivery::Failed(delivery))
    }
}

impl<T: DeliveryOperation> Operation<Delivery> for T {
    fn name(&self) -> &'static str {
        DeliveryOperation::name(self)
    }

    fn transform(&self, delivery: Delivery) -> Result<Delivery, DomainError> {
        match delivery {
            Delivery::Requested(delivery) => self.on_requested(delivery),
            Delivery::Assigned(delivery) => self.on_assigned(delivery),
            Delivery::Optimized(delivery) => self.on_optimized(delivery),
            Delivery::Started(delivery) => self.on_started(delivery),
            Delivery::Failed(delivery) => self.on_failed(delivery),
        }
    }
}

/// Validates the request, then assigns a driver and a route.
pub struct AssignDelivery {
    random: Arc<dyn RandomSource>,
}

impl AssignDelivery {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }
}

impl DeliveryOperation for AssignDelivery {
    fn name(&self) -> &'static str {
        "AssignDelivery"
    }

    fn on_requested(&self, delivery: RequestedDelivery) -> Result<Delivery, DomainError> {
        let mut validator = Validator::new();

        let restaurant_id = validator.check(InvoiceReference::restaurant_id(&delivery.restaurant_id));
        let customer_phone = validator.check(InvoiceReference::customer_phone(&delivery.customer_phone));
        let destination = validator.check(DeliveryDestination::parse(&delivery.delivery_address));
        let invoice_total = validator.check(InvoiceTotal::new(delivery.invoice_total));

        let (Some(restaurant_id), Some(customer_phone), Some(destination), Some(invoice_total)) =
            (restaurant_id, customer_phone, destination, invoice_total)
        else {
            return Ok(Delivery::Failed(FailedDelivery {
                reason: validator.reason(),
            }));
        };

        let driver = DriverId::random(self.random.as_ref());
        let route = DeliveryRoute::direct_to(&destination);

        Ok(Delivery::Assigned(AssignedDelivery {
            invoice: InvoiceReference {
                restaurant_id,
                customer_phone,
            },
            destination,
            invoice_total,
            driver,
            route,
        }))
    }
}

/// Estimates distance and travel time for the assigned route.
pub struct OptimizeRoute {
    random: Arc<dyn RandomSource>,
}

impl OptimizeRoute {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }
}

impl DeliveryOperation for OptimizeRoute {
    fn name(&self) -> &'static str {
        "OptimizeRoute"
    }

    fn on_assigned(&self, assignment: AssignedDelivery) -> Result<Delivery, DomainError> {
        let (low, high) = DISTANCE_HUNDREDTHS;
        let hundredths = self.random.next_in_range(low, high);

        let estimate = RouteEstimate {
            distance_km: Decimal::new(i64::from(hundredths), 2),
            duration_minutes: (hundredths * 60).div_ceil(AVERAGE_SPEED_KMH * 100),
        };

        Ok(Delivery::Optimized(OptimizedDelivery {
            assignment,
            estimate,
        }))
    }
}

/// Marks the optimized delivery as started.
pub struct StartDelivery {
    clock: Arc<dyn Clock>,
}

impl StartDelivery {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl DeliveryOperation for StartDelivery {
    fn name(&self) -> &'static str {
        "StartDelivery"
    }

    fn on_optimized(&self, delivery: OptimizedDelivery) -> Result<Delivery, DomainError> {
        Ok(Delivery::Started(StartedDelivery {
            assignment: delivery.assignment,
            estimate: delivery.estimate,
            started_at: self.clock.now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::random::FixedRandom;

    fn requested(restaurant: &str, phone: &str, address: &str, total: Decimal) -> Delivery {
        Delivery::Requested(RequestedDelivery {
            restaurant_id: restaurant.into(),
            customer_phone: phone.into(),
            delivery_address: address.into(),
            invoice_total: total,
        })
    }

    #[test]
    fn test_assign_uses_injected_driver() {
        let assign = AssignDelivery::new(Arc::new(FixedRandom(4242)));
        let delivery = requested("REST-0001", "5551234567", "42 Elm Street", dec!(110.00));

        let Delivery::Assigned(assigned) = assign.transform(delivery).unwrap() else {
            panic!("expected assigned delivery");
        };
        assert_eq!(assigned.driver.as_str(), "DRV-4242");
        assert_eq!(assigned.route.as_str(), "Route to: 42 Elm Street");
        assert_eq!(assigned.invoice.to_string(), "REST-0001/5551234567");
    }

    #[test]
    fn test_assign_reports_every_invalid_field() {
        let assign = AssignDelivery::new(Arc::new(FixedRandom(4242)));
        let delivery = requested(" ", "", "short", dec!(0));

        let Delivery::Failed(failed) = assign.transform(delivery).unwrap() else {
            panic!("expected failed delivery");
        };
        assert_eq!(
            failed.reason,
            "Invalid invoice reference: Restaurant ID cannot be empty.; \
             Invalid invoice reference: Customer phone cannot be empty.; \
             Invalid delivery destination: Address must be at least 10 characters.; \
             Invalid invoice total: Total must be greater than 0."
        );
    }

    #[test]
    fn test_optimize_estimates_distance_and_duration() {
        let assign = AssignDelivery::new(Arc::new(FixedRandom(1000)));
        let delivery = requested("REST-0001", "5551234567", "42 Elm Street", dec!(110.00));
        let assigned = assign.transform(delivery).unwrap();

        let optimize = OptimizeRoute::new(Arc::new(FixedRandom(1250)));
        let Delivery::Optimized(optimized) = optimize.transform(assigned).unwrap() else {
            panic!("expected optimized delivery");
        };
        assert_eq!(optimized.estimate.distance_km, dec!(12.50));
        assert_eq!(optimized.estimate.duration_minutes, 25);
    }

    #[test]
    fn test_duration_rounds_up_to_whole_minutes() {
        let assign = AssignDelivery::new(Arc::new(FixedRandom(1000)));
        let delivery = requested("REST-0001", "5551234567", "42 Elm Street", dec!(110.00));
        let assigned = assign.transform(delivery).unwrap();

        let optimize = OptimizeRoute::new(Arc::new(FixedRandom(201)));
        let Delivery::Optimized(optimized) = optimize.transform(assigned).unwrap() else {
            panic!("expected optimized delivery");
        };
        assert_eq!(optimized.estimate.distance_km, dec!(2.01));
        assert_eq!(optimized.estimate.duration_minutes, 5);
    }
}
