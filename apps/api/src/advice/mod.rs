// Professor Doom advice: prompt construction and the stateless HTTP endpoints.
// All LLM calls go through llm_client; no direct vendor calls here.

pub mod handlers;
pub mod prompts;
pub mod skills;
