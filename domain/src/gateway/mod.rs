//! Clients for external services the domain layer talks to.

pub mod trainer;
