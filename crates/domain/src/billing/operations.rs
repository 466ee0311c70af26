//! Billing pipeline steps.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};

use super::{
    CustomerRef, FailedInvoice, InvalidInvoice, Invoice, InvoiceAmount, InvoiceDetails,
    InvoiceError, IssuedInvoice, MAX_TAX_RATE, RestaurantRef, TAX_RATE, TaxAmount, TotalAmount,
    UnprocessedInvoice,
};
use crate::clock::Clock;
use crate::error::DomainError;
use crate::pipeline::Operation;
use crate::validation::Validator;

/// A step over [`Invoice`] variants. Hooks default to pass-through.
pub trait InvoiceOperation: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_unprocessed(&self, invoice: UnprocessedInvoice) -> Result<Invoice, DomainError> {
        Ok(Invoice::Unprocessed(invoice))
    }

    fn on_calculated(&self, invoice: InvoiceDetails) -> Result<Invoice, DomainError> {
        Ok(Invoice::Calculated(invoice))
    }

    fn on_validated(&self, invoice: InvoiceDetails) -> Result<Invoice, DomainError> {
        Ok(Invoice::Validated(invoice))
    }

    fn on_issued(&self, invoice: IssuedInvoice) -> Result<Invoice, DomainError> {
        Ok(Invoice::Issued(invoice))
    }

    fn on_invalid(&self, invoice: InvalidInvoice) -> Result<Invoice, DomainError> {
        Ok(Invoice::Invalid(invoice))
    }

    fn on_failed(&self, invoice: FailedInvoice) -> Result<Invoice, DomainError> {
        Ok(Invoice::Failed(invoice))
    }
}

impl<T: InvoiceOperation> Operation<Invoice> for T {
    fn name(&self) -> &'static str {
        InvoiceOperation::name(self)
    }

    fn transform(&self, invoice: Invoice) -> Result<Invoice, DomainError> {
        match invoice {
            Invoice::Unprocessed(invoice) => self.on_unprocessed(invoice),
            Invoice::Calculated(invoice) => self.on_calculated(invoice),
            Invoice::Validated(invoice) => self.on_validated(invoice),
            Invoice::Issued(invoice) => self.on_issued(invoice),
            Invoice::Invalid(invoice) => self.on_invalid(invoice),
            Invoice::Failed(invoice) => self.on_failed(invoice),
        }
    }
}

/// Validates the order reference and amount, then computes tax and total.
#[derive(Debug, Clone, Copy)]
pub struct CalculateInvoice {
    tax_rate: Decimal,
}

impl CalculateInvoice {
    /// Uses a custom tax rate instead of [`TAX_RATE`].
    pub fn with_rate(tax_rate: Decimal) -> Self {
        Self { tax_rate }
    }
}

impl Default for CalculateInvoice {
    fn default() -> Self {
        Self::with_rate(TAX_RATE)
    }
}

impl InvoiceOperation for CalculateInvoice {
    fn name(&self) -> &'static str {
        "CalculateInvoice"
    }

    fn on_unprocessed(&self, invoice: UnprocessedInvoice) -> Result<Invoice, DomainError> {
        let mut validator = Validator::new();

        let restaurant = validator.check(RestaurantRef::parse(&invoice.restaurant_id));
        let customer = validator.check(CustomerRef::parse(&invoice.customer_phone));
        let amount = validator.check(InvoiceAmount::new(invoice.order_amount));

        let (Some(restaurant), Some(customer), Some(amount)) = (restaurant, customer, amount)
        else {
            return Ok(Invoice::Invalid(InvalidInvoice {
                reason: validator.reason(),
            }));
        };

        let overflow = || InvoiceError::AmountOverflow(amount.value());
        let tax = amount
            .value()
            .checked_mul(self.tax_rate)
            .ok_or_else(overflow)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let tax = TaxAmount::new(tax)?;
        let total = amount
            .value()
            .checked_add(tax.value())
            .ok_or_else(overflow)?;
        let total = TotalAmount::new(total)?;

        Ok(Invoice::Calculated(InvoiceDetails {
            restaurant,
            customer,
            delivery_address: invoice.delivery_address,
            amount,
            tax,
            total,
        }))
    }
}

/// Rule gate: the effective tax rate must lie within `[0, MAX_TAX_RATE]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidateTax;

impl InvoiceOperation for ValidateTax {
    fn name(&self) -> &'static str {
        "ValidateTax"
    }

    fn on_calculated(&self, invoice: InvoiceDetails) -> Result<Invoice, DomainError> {
        let rate = invoice.tax.value() / invoice.amount.value();

        if rate < Decimal::ZERO || rate > MAX_TAX_RATE {
            return Ok(Invoice::Failed(FailedInvoice {
                reason: format!(
                    "Invalid tax rate: {:.2}%. Expected between 0% and 30%.",
                    rate * Decimal::ONE_HUNDRED
                ),
            }));
        }

        Ok(Invoice::Validated(invoice))
    }
}

/// Stamps the validated invoice as issued.
pub struct IssueInvoice {
    clock: Arc<dyn Clock>,
}

impl IssueInvoice {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl InvoiceOperation for IssueInvoice {
    fn name(&self) -> &'static str {
        "IssueInvoice"
    }

    fn on_validated(&self, details: InvoiceDetails) -> Result<Invoice, DomainError> {
        Ok(Invoice::Issued(IssuedInvoice {
            details,
            issued_at: self.clock.now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn unprocessed(restaurant: &str, phone: &str, amount: Decimal) -> Invoice {
        Invoice::Unprocessed(UnprocessedInvoice {
            restaurant_id: restaurant.into(),
            customer_phone: phone.into(),
            delivery_address: "12 Main Street".into(),
            order_amount: amount,
        })
    }

    #[test]
    fn test_calculates_ten_percent_tax() {
        let invoice = unprocessed("REST-0001", "5551234567", dec!(100.00));

        let Invoice::Calculated(details) = CalculateInvoice::default().transform(invoice).unwrap()
        else {
            panic!("expected calculated invoice");
        };
        assert_eq!(details.tax.value(), dec!(10.00));
        assert_eq!(details.total.value(), dec!(110.00));
        assert_eq!(details.delivery_address, "12 Main Street");
    }

    #[test]
    fn test_tax_is_rounded_to_cents() {
        let invoice = unprocessed("REST-0001", "5551234567", dec!(0.05));

        let Invoice::Calculated(details) = CalculateInvoice::default().transform(invoice).unwrap()
        else {
            panic!("expected calculated invoice");
        };
        assert_eq!(details.tax.value(), dec!(0.01));
        assert_eq!(details.total.value(), dec!(0.06));
    }

    #[test]
    fn test_calculate_reports_every_invalid_field() {
        let invoice = unprocessed("", "", dec!(-5.00));

        let Invoice::Invalid(invalid) = CalculateInvoice::default().transform(invoice).unwrap()
        else {
            panic!("expected invalid invoice");
        };
        assert_eq!(
            invalid.reason,
            "Invalid order reference: Restaurant ID cannot be empty.; \
             Invalid order reference: Customer phone cannot be empty.; \
             Invalid invoice amount: Amount must be greater than 0."
        );
    }

    #[test]
    fn test_negative_rate_faults_instead_of_failing() {
        let invoice = unprocessed("REST-0001", "5551234567", dec!(100));

        let err = CalculateInvoice::with_rate(dec!(-0.10))
            .transform(invoice)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation("Invalid tax amount: Tax must be 0 or greater.".into())
        );
    }

    #[test]
    fn test_amount_too_large_to_tax_faults() {
        let invoice = unprocessed("REST-0001", "5551234567", Decimal::MAX);

        let err = CalculateInvoice::default().transform(invoice).unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation(
                "Invalid total amount: Amount 79228162514264337593543950335 is too large to invoice."
                    .into()
            )
        );
        assert!(err.is_payload_fault());
    }

    #[test]
    fn test_tax_gate_accepts_standard_rate() {
        let invoice = unprocessed("REST-0001", "5551234567", dec!(100.00));
        let calculated = CalculateInvoice::default().transform(invoice).unwrap();

        assert!(matches!(
            ValidateTax.transform(calculated).unwrap(),
            Invoice::Validated(_)
        ));
    }

    #[test]
    fn test_tax_gate_rejects_rate_above_band() {
        let invoice = unprocessed("REST-0001", "5551234567", dec!(100.00));
        let calculated = CalculateInvoice::with_rate(dec!(0.35))
            .transform(invoice)
            .unwrap();

        let Invoice::Failed(failed) = ValidateTax.transform(calculated).unwrap() else {
            panic!("expected failed invoice");
        };
        assert_eq!(
            failed.reason,
            "Invalid tax rate: 35.00%. Expected between 0% and 30%."
        );
    }

    #[test]
    fn test_issue_ignores_calculated_invoices() {
        let invoice = unprocessed("REST-0001", "5551234567", dec!(100.00));
        let calculated = CalculateInvoice::default().transform(invoice).unwrap();
        let issue = IssueInvoice::new(Arc::new(crate::clock::SystemClock));

        assert_eq!(issue.transform(calculated.clone()).unwrap(), calculated);
    }
}
