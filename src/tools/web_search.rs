use super::args::parse_args;
use super::traits::Tool;
use super::types::{ToolOutcome, ToolResult};
use crate::error::ToolError;
use crate::llm::{api_error, build_http_client};
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Anything that can answer a web query.
pub trait SearchBackend: Send + Sync {
    fn search<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<SearchHit>>> + Send + 'a>>;
}

/// DuckDuckGo instant-answer API.
pub struct DuckDuckGoBackend {
    endpoint: String,
    max_results: usize,
    client: reqwest::Client,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct InstantAnswer {
    #[serde(rename = "Heading")]
    heading: String,
    #[serde(rename = "AbstractText")]
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    #[serde(rename = "Answer")]
    answer: serde_json::Value,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RelatedTopic {
    #[serde(rename = "Text")]
    text: String,
    #[serde(rename = "FirstURL")]
    first_url: String,
    /// Present on category groups, which nest further topics.
    #[serde(rename = "Topics")]
    topics: Vec<RelatedTopic>,
}

impl DuckDuckGoBackend {
    pub fn new(endpoint: &str, max_results: usize, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            max_results: max_results.max(1),
            client: build_http_client(timeout_secs),
        }
    }

    fn collect(&self, answer: InstantAnswer) -> Vec<SearchHit> {
        let mut hits = Vec::new();

        if let Some(text) = answer.answer.as_str()
            && !text.is_empty()
        {
            hits.push(SearchHit {
                title: answer.heading.clone(),
                snippet: text.to_string(),
                url: String::new(),
            });
        }
        if !answer.abstract_text.is_empty() {
            hits.push(SearchHit {
                title: answer.heading.clone(),
                snippet: answer.abstract_text,
                url: answer.abstract_url,
            });
        }

        let mut stack: Vec<RelatedTopic> = answer.related_topics.into_iter().rev().collect();
        while let Some(topic) = stack.pop() {
            if hits.len() >= self.max_results {
                break;
            }
            if !topic.topics.is_empty() {
                stack.extend(topic.topics.into_iter().rev());
                continue;
            }
            if topic.text.is_empty() {
                continue;
            }
            let title = topic
                .text
                .split(" - ")
                .next()
                .unwrap_or(&topic.text)
                .to_string();
            hits.push(SearchHit {
                title,
                snippet: topic.text,
                url: topic.first_url,
            });
        }

        hits.truncate(self.max_results);
        hits
    }
}

impl SearchBackend for DuckDuckGoBackend {
    fn search<'a>(
        &'a self,
        query: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<SearchHit>>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .get(format!("{}/", self.endpoint))
                .query(&[
                    ("q", query),
                    ("format", "json"),
                    ("no_html", "1"),
                    ("skip_disambig", "1"),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(api_error("DuckDuckGo", response).await);
            }

            // The API answers with a JS content type, so decode by hand.
            let body = response.text().await?;
            let answer: InstantAnswer = serde_json::from_str(&body)?;
            Ok(self.collect(answer))
        })
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

/// Search the web for current information.
pub struct WebSearchTool {
    backend: Arc<dyn SearchBackend>,
}

impl WebSearchTool {
    pub const NAME: &'static str = "search_web";

    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    fn render(query: &str, hits: &[SearchHit]) -> String {
        if hits.is_empty() {
            return format!("No results found for '{query}'.");
        }
        let mut output = String::new();
        for hit in hits {
            let _ = write!(output, "{}", hit.snippet);
            if !hit.url.is_empty() {
                let _ = write!(output, " ({})", hit.url);
            }
            output.push('\n');
        }
        output.trim_end().to_string()
    }
}

impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "This tool is useful for searching the web for latest and up-to-date information."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for"
                }
            },
            "required": ["query"]
        })
    }

    fn execute<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutcome, ToolError>> + Send + 'a>> {
        Box::pin(async move {
            let args: SearchArgs = parse_args(Self::NAME, args)?;
            let query = args.query.trim();
            if query.is_empty() {
                return Ok(ToolResult::failure("Error: search query is empty").into());
            }

            let result = match self.backend.search(query).await {
                Ok(hits) => ToolResult::ok(Self::render(query, &hits)),
                Err(e) => {
                    tracing::warn!(tool = Self::NAME, error = %e, "search backend failed");
                    ToolResult::failure(format!("Error: search failed: {e}"))
                }
            };
            Ok(result.into())
        })
    }
}
