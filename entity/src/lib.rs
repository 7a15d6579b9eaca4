use uuid::Uuid;

// Tables
pub mod annotations;
pub mod conversations;
pub mod cron_jobs;
pub mod versions;

// Closed enums and JSON-typed column payloads
pub mod annotation;
pub mod content;
pub mod payload;
pub mod version;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
