pub mod artifact;
pub mod job;
pub mod leonardo;
pub mod loaders;
pub mod project;
pub mod prompt;

pub use artifact::{FetchedImage, ImageArtifact};
pub use job::{FailedPrompt, GenerationJob, JobFailure, JobHandle, JobStatus};
pub use loaders::{load_all_projects, load_toml_to_project, load_txt_to_project};
pub use project::{ProjectSource, ScriptProject};
pub use prompt::{Batch, Prompt, PromptOrigin, PromptPlan, PromptWeights, Section};
