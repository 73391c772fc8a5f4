//! Layered generation runs
//!
//! The [`Orchestrator`] schedules a batch of artifacts, then processes layers
//! strictly in sequence. Every artifact in a layer is dispatched concurrently
//! and all outcomes are collected before the next layer starts; whether a
//! failure stops the run is the caller's [`FailurePolicy`].

mod orchestrator;
mod prompter;
mod report;

pub use orchestrator::{FailurePolicy, Orchestrator};
pub use prompter::{BasicPrompter, GenerationContext, Prompter};
pub use report::{ArtifactOutcome, ArtifactStatus, LayerTiming, RunReport, RunSummary};
