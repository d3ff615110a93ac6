//! Shell integration: completion scripts and a prompt segment showing the
//! pending queue.

pub mod completions;
pub mod prompt;

pub use completions::{completion_install_instructions, generate_completions};
pub use prompt::{prompt_segment, PromptFormat, PromptStatus};
