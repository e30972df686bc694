//! Agent orchestration for the Carrie companion backend.
//!
//! [`AgentRegistry`] tracks deployed agents, [`Orchestrator`] turns a user
//! message into a spoken reply, and [`responder`] supplies the rule-based
//! replies used when no hosted conversational agent is available.

pub mod emotion;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod responder;

pub use emotion::{EmotionClient, DEFAULT_DETECTOR_URL};
pub use error::AgentError;
pub use orchestrator::{Orchestrator, Reply, ReplySource};
pub use registry::{AgentRegistry, RegistryEvent, TokenIssuer};
pub use responder::Topic;
