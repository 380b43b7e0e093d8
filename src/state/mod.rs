//! State module for the crawl step state machine
//!
//! # Components
//!
//! - `StepState`: The states one crawl step moves through
//!   (`Start -> ConfigResolved -> {Skipped* | Processed} -> Done`)
//! - `SkipReason`: Why a step ended without processing its URL

mod step_state;

// Re-export main types
pub use step_state::{SkipReason, StepState};
