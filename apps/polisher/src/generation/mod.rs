// Resume tailoring pipeline: requirements extraction, prompt assembly,
// resume + recruiter message generation.
// All model calls go through llm_client::LlmGateway.

pub mod generator;
pub mod handlers;
pub mod html;
pub mod prompts;
pub mod requirements;
