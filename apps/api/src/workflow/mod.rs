// Trust assessment workflow: transcript → trust questions → scored answers
// → trust level → contract draft.
// All provider calls go through llm_client; this module owns state and parsing.

pub mod handlers;
pub mod machine;
pub mod prompts;
pub mod questions;
pub mod state;
pub mod trust;
