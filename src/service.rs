/*
 * Grid service: wires the node client, signer, pipelines and conversation log
 */

use ethers::types::Address;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::{
    catalog::{ActionCatalog, ToolDefinition},
    config::{Config, Deployment},
    conversation::{system_prompt, ConversationLog, Message},
    dispatcher::{DispatchRequest, DispatchResult, Dispatcher},
    models::{GridHookError, Result},
    query::QueryPipeline,
    rpc::{ChainClient, RpcClient},
    tx::TransactionPipeline,
    utils::checksum,
};

pub struct GridService {
    dispatcher: Dispatcher,
    conversation: ConversationLog,
    deployment: Deployment,
    signer: Address,
}

impl GridService {
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing GridHook service");

        let rpc = RpcClient::new(&config.chain.rpc_url, config.chain.chain_id).await?;
        info!("Connected to RPC at {} (chain {})", config.chain.rpc_url, config.chain.chain_id);

        Self::with_chain(config, Arc::new(rpc))
    }

    /// Builds the service on an already connected node client.
    pub fn with_chain(config: &Config, chain: Arc<dyn ChainClient>) -> Result<Self> {
        let deployment = config.deployment()?;
        let wallet = config.wallet()?;
        let catalog = ActionCatalog::standard()?;

        let transactions = TransactionPipeline::new(
            chain.clone(),
            wallet,
            deployment,
            config.transaction_settings(),
        );
        let signer = transactions.signer();
        let queries = QueryPipeline::new(chain, deployment, signer);

        info!(
            "Pool {} with hook {}, signing as {}",
            deployment.pool_key.to_id(),
            checksum(&deployment.grid_hook),
            checksum(&signer)
        );

        let conversation = ConversationLog::with_system_prompt(system_prompt(&deployment, &catalog));
        Ok(Self {
            dispatcher: Dispatcher::new(catalog, transactions, queries),
            conversation,
            deployment,
            signer,
        })
    }

    pub async fn handle(&mut self, request: DispatchRequest) -> DispatchResult {
        self.dispatcher.dispatch(request, &mut self.conversation).await
    }

    /// Runs one action by name and returns only its text.
    pub async fn execute(&mut self, action: &str, arguments: &Value) -> String {
        self.dispatcher
            .execute(action, arguments, &mut self.conversation)
            .await
    }

    /// Appends the collaborator's natural-language answer to the log.
    pub fn record_reply(&mut self, content: &str) -> Result<&Message> {
        if content.trim().is_empty() {
            return Err(GridHookError::ValidationError(
                "assistant reply must not be empty".to_string(),
            ));
        }
        Ok(self.conversation.push_assistant(content))
    }

    #[must_use]
    pub fn manifest(&self) -> Vec<ToolDefinition> {
        self.dispatcher.catalog().manifest()
    }

    #[must_use]
    pub fn conversation(&self) -> &ConversationLog {
        &self.conversation
    }

    #[must_use]
    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    #[must_use]
    pub fn signer(&self) -> Address {
        self.signer
    }
}
