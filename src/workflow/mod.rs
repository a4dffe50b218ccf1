pub mod prompt_flow;
pub mod run_ctx;

pub use prompt_flow::{BatchReport, PromptFlow, PromptOutcome};
pub use run_ctx::RunContext;
