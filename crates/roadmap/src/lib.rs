//! Roadmap domain model and generation pipeline
//!
//! Two generation phases run on top of the key pool:
//! 1. one structure call that produces the roadmap skeleton as strict
//!    JSON (a parse failure here is fatal), and
//! 2. one content call per chapter, batched through the orchestrator,
//!    where an individual failure leaves that chapter without content
//!    instead of aborting the course.
//!
//! The dispatcher is a trait seam (`TaskRunner`) so the orchestrator and
//! pipeline are testable without a live endpoint; `GeminiRunner` is the
//! production implementation wiring the pool and the HTTP client
//! together.

pub mod batch;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod runner;

pub use batch::{BatchOptions, run_batches};
pub use error::{Error, Result};
pub use model::{
    Chapter, ChapterBody, ChapterContent, CodeSample, DetailedCourse, Difficulty, Resource,
    Roadmap, Section,
};
pub use pipeline::Generator;
pub use runner::{GeminiRunner, TaskRunner};
