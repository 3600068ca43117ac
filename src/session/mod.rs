//! Session state for a single editor
//!
//! One coordinator per editor instance owns the job registry, the shared
//! editing flags and the prompt plumbing. Jobs are registered per document
//! URI; starting a new job on a URI supersedes whatever was running there.

mod coordinator;
mod flags;
mod job;
mod prompt;

pub use coordinator::{JobFinished, SessionCoordinator, SessionEvent};
pub use flags::{EditingFlags, FlagSnapshot};
pub use job::{JobRegistry, JobTicket};
pub use prompt::{await_choice, PromptChoice, PromptKind, PromptRequest};
