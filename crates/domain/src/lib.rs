//! Domain layer for the order saga.
//!
//! This crate provides:
//! - the variant engine: [`Variant`], [`Operation`] and [`Pipeline`]
//! - error-collecting validation for the first pipeline step
//! - injectable randomness and time
//! - the order, billing and delivery domains, each exposing a
//!   [`WorkflowDefinition`] the saga runtime executes

pub mod billing;
pub mod clock;
pub mod delivery;
pub mod error;
pub mod order;
pub mod pipeline;
pub mod random;
pub mod validation;
pub mod workflow;

pub use billing::InvoiceIssuance;
pub use clock::{Clock, FixedClock, SystemClock};
pub use delivery::DeliveryDispatch;
pub use error::DomainError;
pub use order::OrderPlacement;
pub use pipeline::{FailureKind, Operation, Phase, Pipeline, Variant};
pub use random::{FixedRandom, RandomSource, SeededRandom, ThreadRandom};
pub use validation::Validator;
pub use workflow::WorkflowDefinition;
