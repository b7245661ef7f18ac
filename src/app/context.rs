//! Builds providers, registries and stores once from [`Config`] and hands
//! out services that share them.

use super::blog::BlogService;
use super::chat::ChatService;
use crate::config::Config;
use crate::llm::{ModelAdapter, Provider, create_provider};
use crate::session::{SessionManager, open_store};
use crate::tools::{PaperLedger, ToolRegistry, chatbot_tools, market_data, search_backend, stock_tools};
use crate::workflows::{
    AgentProfile, RefinementSettings, build_conversation_graph, build_refinement_graph,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

pub struct AppContext {
    config: Arc<Config>,
    sessions: Arc<SessionManager>,
    ledger: Arc<PaperLedger>,
}

impl AppContext {
    /// Open the configured session store.
    pub async fn from_config(config: Arc<Config>) -> Result<Self> {
        let store = open_store(&config.sessions)
            .await
            .context("failed to open session store")?;
        Ok(Self::with_sessions(config, Arc::new(SessionManager::new(store))))
    }

    pub fn with_sessions(config: Arc<Config>, sessions: Arc<SessionManager>) -> Self {
        Self {
            config,
            sessions,
            ledger: Arc::new(PaperLedger::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn ledger(&self) -> &Arc<PaperLedger> {
        &self.ledger
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.model.timeout_secs)
    }

    fn provider(&self, name: &str) -> Result<Arc<dyn Provider>> {
        create_provider(
            name,
            self.config.api_key.as_deref(),
            self.config.model.ollama_url.as_deref(),
        )
    }

    fn registry(&self, profile: AgentProfile) -> Result<ToolRegistry> {
        let tools = &self.config.tools;
        match profile {
            AgentProfile::Chatbot => chatbot_tools(search_backend(tools)),
            AgentProfile::StockTrader => stock_tools(market_data(tools), self.ledger.clone()),
        }
    }

    /// Chat adapter for `profile` on the default provider and model.
    pub fn chat_model(&self, profile: AgentProfile) -> Result<ModelAdapter> {
        let temperature = match profile {
            AgentProfile::Chatbot => self.config.default_temperature,
            AgentProfile::StockTrader => self.config.model.stock_temperature,
        };
        let provider = self.provider(self.config.provider_name())?;
        Ok(ModelAdapter::new(
            provider,
            self.config.model_name(),
            temperature,
            self.timeout(),
        ))
    }

    pub fn chat_service(&self, profile: AgentProfile) -> Result<ChatService> {
        self.chat_service_with(profile, self.chat_model(profile)?)
    }

    /// Same as [`Self::chat_service`] with an externally built model.
    pub fn chat_service_with(&self, profile: AgentProfile, model: ModelAdapter) -> Result<ChatService> {
        let tools = Arc::new(self.registry(profile)?);
        tracing::debug!(profile = %profile, tools = ?tools.tool_names(), "building conversation graph");
        let graph = build_conversation_graph(
            model,
            profile.system_prompt().map(str::to_string),
            tools,
            self.config.agent.max_steps,
        )?;
        Ok(ChatService::new(profile, graph, self.sessions.clone()))
    }

    pub fn refinement_settings(&self) -> RefinementSettings {
        RefinementSettings {
            threshold: self.config.refinement.threshold,
            max_revisions: self.config.refinement.max_revisions,
            max_steps: self.config.agent.max_steps,
        }
    }

    /// Writer and judge share the refinement provider and model.
    pub fn blog_service(&self) -> Result<BlogService> {
        let refinement = &self.config.refinement;
        let provider = self.provider(&refinement.provider)?;
        let writer = ModelAdapter::new(
            provider,
            refinement.model.clone(),
            self.config.model.writer_temperature,
            self.timeout(),
        );
        self.blog_service_with(writer)
    }

    pub fn blog_service_with(&self, writer: ModelAdapter) -> Result<BlogService> {
        let judge = writer.with_temperature(self.config.model.judge_temperature);
        let graph = build_refinement_graph(writer, judge, self.refinement_settings())?;
        Ok(BlogService::new(graph, self.sessions.clone()))
    }
}
