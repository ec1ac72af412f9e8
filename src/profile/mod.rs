//! Read-only views derived from the profile partitions.

pub mod completion;

pub use completion::{completion, CompletionReport, Section, SectionCompletion, SectionStatus};
