//! Natural-language workflow orchestration.
//!
//! A query is classified into one of four intents (LLM first, keyword rules
//! as fallback), the matching branch dispatches tool calls through a
//! [`ToolGateway`](crate::tools::ToolGateway), and raw tool outputs are
//! normalized into [`Movie`](moviehub_common::Movie) records. Every step is
//! recorded in an [`ExecutionTrace`].

pub mod intent;
pub mod normalize;
pub mod strategy;
pub mod trace;
pub mod workflow;

pub use intent::{Intent, IntentClassifier, IntentType, RuleIntentClassifier};
pub use strategy::{DirectorExtractor, PatternDirectorExtractor, SearchStrategy};
pub use trace::{ExecutionStep, ExecutionTrace};
pub use workflow::{WorkflowOrchestrator, WorkflowRequest, WorkflowResponse, WorkflowResult};
