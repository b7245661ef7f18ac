use super::compatible::OpenAiCompatibleProvider;
use super::ollama::OllamaProvider;
use super::traits::Provider;
use std::sync::Arc;

/// Resolve API key for a provider from config and environment variables.
///
/// Resolution order:
/// 1. Explicitly provided `api_key` parameter (trimmed, filtered if empty)
/// 2. Provider-specific environment variable (e.g., `GROQ_API_KEY`)
/// 3. Generic fallback variables (`GRAPHMIND_API_KEY`, `API_KEY`)
pub fn resolve_api_key(name: &str, explicit_api_key: Option<&str>) -> Option<String> {
    if let Some(key) = explicit_api_key.map(str::trim).filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    let provider_env_candidates: &[&str] = match name {
        "groq" => &["GROQ_API_KEY"],
        "openai" => &["OPENAI_API_KEY"],
        "openrouter" => &["OPENROUTER_API_KEY"],
        "deepseek" => &["DEEPSEEK_API_KEY"],
        "mistral" => &["MISTRAL_API_KEY"],
        "together" | "together-ai" => &["TOGETHER_API_KEY"],
        "fireworks" | "fireworks-ai" => &["FIREWORKS_API_KEY"],
        "xai" | "grok" => &["XAI_API_KEY"],
        _ => &[],
    };

    provider_env_candidates
        .iter()
        .chain(["GRAPHMIND_API_KEY", "API_KEY"].iter())
        .find_map(|env_var| {
            std::env::var(env_var)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
}

/// Maps well-known compatible provider names to `(display_name, base_url)`.
pub fn compatible_provider_spec(name: &str) -> Option<(&'static str, &'static str)> {
    let spec = match name {
        "groq" => ("Groq", "https://api.groq.com/openai/v1"),
        "openai" => ("OpenAI", "https://api.openai.com/v1"),
        "openrouter" => ("OpenRouter", "https://openrouter.ai/api/v1"),
        "deepseek" => ("DeepSeek", "https://api.deepseek.com/v1"),
        "mistral" => ("Mistral", "https://api.mistral.ai/v1"),
        "together" | "together-ai" => ("Together AI", "https://api.together.xyz/v1"),
        "fireworks" | "fireworks-ai" => ("Fireworks AI", "https://api.fireworks.ai/inference/v1"),
        "xai" | "grok" => ("xAI", "https://api.x.ai/v1"),
        _ => return None,
    };
    Some(spec)
}

/// Create a shared [`Provider`] by name.
///
/// Supported providers:
/// - `"ollama"`: local Ollama server (`ollama_url` or the default port)
/// - All compatible-spec providers (see [`compatible_provider_spec`])
/// - `"custom:<base_url>"`: any `OpenAI`-compatible endpoint
pub fn create_provider(
    name: &str,
    api_key: Option<&str>,
    ollama_url: Option<&str>,
) -> anyhow::Result<Arc<dyn Provider>> {
    if name == "ollama" {
        return Ok(Arc::new(OllamaProvider::new(ollama_url)));
    }

    let resolved_key = resolve_api_key(name, api_key);
    let api_key = resolved_key.as_deref();

    if let Some((display_name, base_url)) = compatible_provider_spec(name) {
        return Ok(Arc::new(OpenAiCompatibleProvider::new(
            display_name,
            base_url,
            api_key,
        )));
    }

    if let Some(base_url) = name.strip_prefix("custom:") {
        if base_url.is_empty() {
            anyhow::bail!("Custom provider requires a URL. Format: custom:https://your-api.com");
        }
        return Ok(Arc::new(OpenAiCompatibleProvider::new(
            "Custom", base_url, api_key,
        )));
    }

    anyhow::bail!(
        "Unknown provider: {name}. Set `default_provider` in ~/.graphmind/config.toml.\n\
         Tip: Use \"custom:https://your-api.com/v1\" for OpenAI-compatible endpoints."
    )
}
