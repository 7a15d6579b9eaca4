//! Business logic for the chronicle correction engine.
//!
//! The modules here orchestrate the entity layer: merging pending
//! annotations into previews, applying them as immutable versions, detecting
//! orphans, and exporting applied corrections to the trainer service.

pub use entity::annotation::{AnnotationKind, AnnotationState};
pub use entity::content::{MemoryItem, Segment, SegmentType, VersionContent};
pub use entity::payload::AnnotationPayload;
pub use entity::version::{VersionKind, VersionSource};
pub use entity::{annotations, conversations, cron_jobs, versions, Id};

pub mod annotation;
pub mod apply;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod orphan;
pub mod preview;
pub mod scheduler;
pub mod training;
pub mod version;
