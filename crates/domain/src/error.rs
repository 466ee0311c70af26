//! Domain error types.

use thiserror::Error;

/// Faults raised while running a pipeline.
///
/// These are distinct from the modeled failure variants (`Invalid`,
/// `Failed`): a failure variant is a normal pipeline outcome, a
/// `DomainError` means an operation could not produce a variant at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A value object rejected a value outside the validation step.
    #[error("{0}")]
    Validation(String),

    /// A business rule rejected the entity outside the rule gate.
    #[error("{0}")]
    BusinessRule(String),

    /// An operation moved the entity to an earlier state.
    #[error("Operation {operation} moved entity backward from {from} to {to}")]
    BackwardTransition {
        operation: &'static str,
        from: &'static str,
        to: &'static str,
    },

    /// The pipeline finished on a non-terminal variant.
    #[error("{entity} ended in unexpected state: {state}")]
    UnexpectedState {
        entity: &'static str,
        state: &'static str,
    },
}

impl DomainError {
    /// Returns true for faults caused by the payload itself, which a retry
    /// cannot fix.
    pub fn is_payload_fault(&self) -> bool {
        matches!(
            self,
            DomainError::Validation(_) | DomainError::BusinessRule(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_faults() {
        assert!(DomainError::Validation("bad".into()).is_payload_fault());
        assert!(DomainError::BusinessRule("bad".into()).is_payload_fault());
        assert!(
            !DomainError::UnexpectedState {
                entity: "Order",
                state: "Validated"
            }
            .is_payload_fault()
        );
    }

    #[test]
    fn test_unexpected_state_message() {
        let err = DomainError::UnexpectedState {
            entity: "Invoice",
            state: "Calculated",
        };
        assert_eq!(err.to_string(), "Invoice ended in unexpected state: Calculated");
    }
}
