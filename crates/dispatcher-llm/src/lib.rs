pub mod anthropic;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError, Role};
