// ── Infrastructure ───────────────────────────────────────────────────────────
pub mod http_client;
pub mod scrub;
pub mod structured;
pub mod traits;
pub mod types;

// ── Invocation layer ────────────────────────────────────────────────────────
pub mod adapter;
pub mod factory;

// ── Provider implementations ────────────────────────────────────────────────
pub mod compatible;
pub mod ollama;
mod openai_types;

#[cfg(test)]
pub(crate) mod scripted;

// ── Re-exports ──────────────────────────────────────────────────────────────
pub use adapter::ModelAdapter;
pub use compatible::OpenAiCompatibleProvider;
pub use factory::{compatible_provider_spec, create_provider, resolve_api_key};
pub use http_client::{build_http_client, build_provider_client};
pub use ollama::OllamaProvider;
pub use scrub::{api_error, sanitize_api_error, scrub_secret_patterns};
pub use structured::{StructuredOutput, extract_json_object, parse_structured};
pub use traits::{Provider, ProviderCapabilities, messages_to_text};
pub use types::{ContentBlock, MessageRole, ProviderMessage, ProviderResponse, StopReason, ToolCall};
