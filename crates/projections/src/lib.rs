//! Repositories, read models and projections for the query side.
//!
//! - [`Repository`] stores materialized entities, in memory or in PostgreSQL
//! - [`Projection`] folds recorded events into a read model
//! - [`ProjectionProcessor`] feeds events from the store to projections
//! - [`OrderSummaryProjection`] maintains the [`OrderSummary`] read model

pub mod error;
pub mod order_summary;
pub mod postgres;
pub mod processor;
pub mod projection;
pub mod repository;

pub use error::{ProjectionError, Result};
pub use order_summary::{OrderSummary, OrderSummaryProjection};
pub use postgres::PostgresRepository;
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use repository::{Entity, InMemoryRepository, Repository};
