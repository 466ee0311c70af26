//! Variant engine: entities as closed sets of states, operations over them,
//! and the ordered pipeline that runs an entity through its operations.

use std::fmt::Debug;

use crate::error::DomainError;

/// Why a terminal failure variant was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Field-level validation rejected one or more inputs.
    Structural,
    /// A derived value broke a business rule.
    BusinessRule,
}

impl FailureKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Structural => "structural",
            FailureKind::BusinessRule => "business_rule",
        }
    }
}

/// Where a variant sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Still flowing through the pipeline.
    Intermediate,
    /// Terminal success, ready to be persisted and published.
    Succeeded,
    /// Terminal failure, a dead end for the message.
    Failed(FailureKind),
}

impl Phase {
    /// Returns true for terminal success and terminal failure.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Phase::Intermediate)
    }
}

/// A tagged union over the lifecycle states of one business object.
///
/// `rank` orders the states: an operation may only keep or raise it.
/// Failure variants share the highest rank, since any state can fail.
pub trait Variant: Clone + Debug + Send + Sync + 'static {
    /// Entity name used in logs and errors, e.g. `"Order"`.
    const ENTITY: &'static str;

    /// Name of the current state, e.g. `"Validated"`.
    fn state(&self) -> &'static str;

    /// Position of the current state in the lifecycle.
    fn rank(&self) -> u8;

    /// Lifecycle phase of the current state.
    fn phase(&self) -> Phase;

    /// Aggregated reason carried by a failure variant.
    fn failure_reason(&self) -> Option<&str>;
}

/// A single named pipeline step mapping one variant to another.
///
/// Implementations return their input unchanged for variants they do not
/// handle. Domains implement this through their own per-variant operation
/// traits, whose `match` covers every state.
pub trait Operation<V: Variant>: Send + Sync {
    /// Step name for logs.
    fn name(&self) -> &'static str;

    /// Transforms the entity.
    fn transform(&self, entity: V) -> Result<V, DomainError>;
}

/// Ordered list of operations for one domain.
pub struct Pipeline<V: Variant> {
    steps: Vec<Box<dyn Operation<V>>>,
}

impl<V: Variant> Pipeline<V> {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a step.
    pub fn then(mut self, operation: impl Operation<V> + 'static) -> Self {
        self.steps.push(Box::new(operation));
        self
    }

    /// Returns the step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the pipeline has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the entity through every step in order.
    ///
    /// Stops early once a failure variant is reached. Returns an error if a
    /// step faults or moves the entity backward.
    pub fn run(&self, initial: V) -> Result<V, DomainError> {
        let mut current = initial;
        tracing::debug!(entity = V::ENTITY, state = current.state(), "Pipeline started");

        for step in &self.steps {
            if let Phase::Failed(kind) = current.phase() {
                tracing::info!(
                    entity = V::ENTITY,
                    state = current.state(),
                    kind = kind.as_str(),
                    reason = current.failure_reason().unwrap_or_default(),
                    "Pipeline stopped on failure"
                );
                metrics::counter!(
                    "pipeline_failures_total",
                    "entity" => V::ENTITY,
                    "kind" => kind.as_str()
                )
                .increment(1);
                return Ok(current);
            }

            let from = current.state();
            let from_rank = current.rank();
            let next = step.transform(current)?;

            if next.rank() < from_rank {
                return Err(DomainError::BackwardTransition {
                    operation: step.name(),
                    from,
                    to: next.state(),
                });
            }

            tracing::info!(
                entity = V::ENTITY,
                operation = step.name(),
                state = next.state(),
                "Pipeline step completed"
            );
            current = next;
        }

        if let Phase::Failed(kind) = current.phase() {
            metrics::counter!(
                "pipeline_failures_total",
                "entity" => V::ENTITY,
                "kind" => kind.as_str()
            )
            .increment(1);
        }

        Ok(current)
    }
}

impl<V: Variant> Default for Pipeline<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ticket {
        Draft(u32),
        Priced(u32),
        Issued(u32),
        Rejected(String),
    }

    impl Variant for Ticket {
        const ENTITY: &'static str = "Ticket";

        fn state(&self) -> &'static str {
            match self {
                Ticket::Draft(_) => "Draft",
                Ticket::Priced(_) => "Priced",
                Ticket::Issued(_) => "Issued",
                Ticket::Rejected(_) => "Rejected",
            }
        }

        fn rank(&self) -> u8 {
            match self {
                Ticket::Draft(_) => 0,
                Ticket::Priced(_) => 1,
                Ticket::Issued(_) => 2,
                Ticket::Rejected(_) => u8::MAX,
            }
        }

        fn phase(&self) -> Phase {
            match self {
                Ticket::Draft(_) | Ticket::Priced(_) => Phase::Intermediate,
                Ticket::Issued(_) => Phase::Succeeded,
                Ticket::Rejected(_) => Phase::Failed(FailureKind::Structural),
            }
        }

        fn failure_reason(&self) -> Option<&str> {
            match self {
                Ticket::Rejected(reason) => Some(reason),
                _ => None,
            }
        }
    }

    struct Price;

    impl Operation<Ticket> for Price {
        fn name(&self) -> &'static str {
            "Price"
        }

        fn transform(&self, entity: Ticket) -> Result<Ticket, DomainError> {
            Ok(match entity {
                Ticket::Draft(0) => Ticket::Rejected("Seat cannot be 0".into()),
                Ticket::Draft(seat) => Ticket::Priced(seat),
                other => other,
            })
        }
    }

    struct Issue;

    impl Operation<Ticket> for Issue {
        fn name(&self) -> &'static str {
            "Issue"
        }

        fn transform(&self, entity: Ticket) -> Result<Ticket, DomainError> {
            Ok(match entity {
                Ticket::Priced(seat) => Ticket::Issued(seat),
                other => other,
            })
        }
    }

    struct Rewind;

    impl Operation<Ticket> for Rewind {
        fn name(&self) -> &'static str {
            "Rewind"
        }

        fn transform(&self, entity: Ticket) -> Result<Ticket, DomainError> {
            Ok(match entity {
                Ticket::Issued(seat) => Ticket::Draft(seat),
                other => other,
            })
        }
    }

    /// Panics if called; used to prove the pipeline stops after a failure.
    struct Unreachable;

    impl Operation<Ticket> for Unreachable {
        fn name(&self) -> &'static str {
            "Unreachable"
        }

        fn transform(&self, _entity: Ticket) -> Result<Ticket, DomainError> {
            panic!("step after failure must not run");
        }
    }

    #[test]
    fn test_runs_steps_in_order() {
        let pipeline = Pipeline::new().then(Price).then(Issue);

        assert_eq!(pipeline.step_names(), vec!["Price", "Issue"]);
        assert_eq!(pipeline.run(Ticket::Draft(7)).unwrap(), Ticket::Issued(7));
    }

    #[test]
    fn test_unhandled_variants_pass_through() {
        let pipeline = Pipeline::new().then(Issue);
        assert_eq!(pipeline.run(Ticket::Draft(3)).unwrap(), Ticket::Draft(3));
    }

    #[test]
    fn test_stops_after_failure_variant() {
        let pipeline = Pipeline::new().then(Price).then(Unreachable);

        let result = pipeline.run(Ticket::Draft(0)).unwrap();
        assert_eq!(result, Ticket::Rejected("Seat cannot be 0".into()));
    }

    #[test]
    fn test_backward_transition_is_rejected() {
        let pipeline = Pipeline::new().then(Price).then(Issue).then(Rewind);

        let err = pipeline.run(Ticket::Draft(1)).unwrap_err();
        assert_eq!(
            err,
            DomainError::BackwardTransition {
                operation: "Rewind",
                from: "Issued",
                to: "Draft",
            }
        );
    }

    #[test]
    fn test_empty_pipeline_returns_input() {
        let pipeline: Pipeline<Ticket> = Pipeline::default();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.run(Ticket::Priced(2)).unwrap(), Ticket::Priced(2));
    }

    #[test]
    fn test_phase_is_terminal() {
        assert!(!Phase::Intermediate.is_terminal());
        assert!(Phase::Succeeded.is_terminal());
        assert!(Phase::Failed(FailureKind::BusinessRule).is_terminal());
    }
}
