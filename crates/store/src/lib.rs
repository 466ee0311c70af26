//! Persistence contracts for the saga services.
//!
//! Two stores back every service instance:
//! - a [`Repository`] holding only terminal entity variants
//! - a [`DedupLedger`] recording which broker messages were already processed
//!
//! Both have in-memory implementations (with fault injection for tests) and
//! PostgreSQL implementations.

pub mod entity;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use common::{EntityId, MessageId};
pub use entity::{LedgerEntry, StoredEntity};
pub use error::{Result, StoreError};
pub use memory::{InMemoryLedger, InMemoryRepository};
pub use postgres::{PostgresLedger, PostgresRepository, run_migrations};
pub use repository::{DedupLedger, Repository, ensure_terminal};
