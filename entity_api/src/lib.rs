//! Typed CRUD operations over the chronicle tables.
//!
//! Each module maps to one table. Read operations return detached copies of
//! rows; every mutation goes back through the functions here so state
//! transitions stay in one place. Mutators used by the apply engine are
//! generic over [`sea_orm::ConnectionTrait`] so they compose into a single
//! transaction.

pub use entity::{annotations, conversations, cron_jobs, versions, Id};

pub mod annotation;
pub mod conversation;
pub mod cron_job;
pub mod error;
pub mod version;
