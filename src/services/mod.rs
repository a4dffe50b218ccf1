pub mod artifact_collector;
pub mod exporter;
pub mod failure_writer;
pub mod job_poller;
pub mod prompt_batcher;
pub mod script_writer;

pub use artifact_collector::{ArtifactCollector, CollectReport, Labeler};
pub use failure_writer::FailureWriter;
pub use job_poller::{JobPoller, PollOutcome};
pub use script_writer::ScriptWriter;
