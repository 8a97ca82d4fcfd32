use std::sync::Arc;

use quay_chat::{ChatServer, ChatServerConfig};
use quay_core::conversation::{Orchestrator, OrchestratorConfig};
use quay_core::llm::{ModelError, OpenAiCompatibleModel};
use quay_core::store::{MySqlTerminalStore, SchemaStatus, StoreResult};
use quay_core::tools::ToolExecutor;
use tracing::{info, warn};

use crate::config::{ModelSettings, QuayConfig};

/// Opens the pool and runs the one-time schema check.
pub async fn connect_store(config: &QuayConfig) -> StoreResult<MySqlTerminalStore> {
    let store = MySqlTerminalStore::connect(&config.store).await?;
    match store.ensure_schema(config.seed_file.as_deref()).await? {
        SchemaStatus::Present | SchemaStatus::Seeded => {}
        SchemaStatus::Missing => warn!("terminal tables are missing; lookups will fail until they exist"),
    }
    Ok(store)
}

pub fn build_model(settings: &ModelSettings) -> Result<OpenAiCompatibleModel, ModelError> {
    let mut model = OpenAiCompatibleModel::new(settings.provider, settings.api_key.clone())?;
    if let Some(name) = &settings.model {
        model = model.with_model(name.clone());
    }
    if let Some(base_url) = &settings.base_url {
        model = model.with_base_url(base_url.clone());
    }
    info!(provider = %settings.provider, model = model.model(), "model client configured");
    Ok(model)
}

pub fn build_chat_server(
    config: &QuayConfig,
    settings: &ModelSettings,
    store: MySqlTerminalStore,
) -> Result<ChatServer<OpenAiCompatibleModel, MySqlTerminalStore>, ModelError> {
    let model = build_model(settings)?;
    let orchestrator = Orchestrator::new(
        model,
        ToolExecutor::new(store),
        OrchestratorConfig::default().with_model_timeout(settings.timeout),
    );
    let server_config =
        ChatServerConfig::new(config.chat_addr).with_public_dir(config.public_dir.clone());
    Ok(ChatServer::new(Arc::new(orchestrator), server_config))
}
