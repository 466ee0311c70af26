//! Shared identifiers used across the saga services.

mod types;

pub use types::{EntityId, MessageId};
