pub mod leonardo_client;
pub mod llm_client;

pub use leonardo_client::{GenerationSettings, LeonardoClient};
pub use llm_client::LlmClient;
