/*
 * Dispatcher: routes a validated action to the transaction or query pipeline
 * and turns every outcome into text for the collaborator
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::{Action, ActionCatalog, Route};
use crate::conversation::ConversationLog;
use crate::models::{ErrorClass, GridHookError, Result, TxStatus};
use crate::query::QueryPipeline;
use crate::tx::{TransactionPipeline, TransactionReport};
use crate::utils::short_hash;

const RETRY_WARNING: &str = "The transaction may still be included on chain. \
    Check the transaction hash or your balances before submitting again.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Text the user typed, if the caller wants it recorded.
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    pub action: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchResult {
    pub tool_call_id: String,
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
    pub output: String,
}

pub struct Dispatcher {
    catalog: ActionCatalog,
    transactions: TransactionPipeline,
    queries: QueryPipeline,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        catalog: ActionCatalog,
        transactions: TransactionPipeline,
        queries: QueryPipeline,
    ) -> Self {
        Self {
            catalog,
            transactions,
            queries,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    /// Runs one action and returns its text. Failures become text as well.
    pub async fn execute(&self, action: &str, arguments: &Value, log: &mut ConversationLog) -> String {
        self.dispatch(
            DispatchRequest {
                action: action.to_string(),
                arguments: arguments.clone(),
                ..Default::default()
            },
            log,
        )
        .await
        .output
    }

    pub async fn dispatch(&self, request: DispatchRequest, log: &mut ConversationLog) -> DispatchResult {
        if let Some(intent) = request.intent.as_deref().filter(|i| !i.trim().is_empty()) {
            log.push_user(intent);
        }

        let tool_call_id = request
            .tool_call_id
            .clone()
            .unwrap_or_else(|| format!("call_{}", log.len()));
        let arguments = normalize_arguments(request.arguments);
        log.push_tool_call(&tool_call_id, &request.action, &arguments);

        info!("Dispatching {} ({})", request.action, tool_call_id);
        let outcome = self.run(&request.action, &arguments).await;
        let result = match outcome {
            Ok((output, None)) => DispatchResult {
                tool_call_id,
                action: request.action,
                success: true,
                error_class: None,
                output,
            },
            Ok((output, Some(class))) => DispatchResult {
                tool_call_id,
                action: request.action,
                success: false,
                error_class: Some(class),
                output,
            },
            Err(e) => {
                warn!("{} failed ({}): {}", request.action, e.class(), e);
                DispatchResult {
                    tool_call_id,
                    action: request.action,
                    success: false,
                    error_class: Some(e.class()),
                    output: format_error(&e),
                }
            }
        };

        log.push_tool_result(&result.tool_call_id, &result.action, result.output.clone());
        result
    }

    /// A mined but reverted transaction is `Ok` with an error class attached.
    async fn run(&self, name: &str, arguments: &Value) -> Result<(String, Option<ErrorClass>)> {
        let action = self.catalog.parse(name, arguments)?;
        match action.kind().route() {
            Route::Transaction => {
                let report = self.transactions.submit(&action).await?;
                info!(
                    "{} finished as {:?} in tx {}",
                    name,
                    report.outcome.status,
                    short_hash(report.outcome.tx_hash.as_bytes())
                );
                let class = match report.outcome.status {
                    TxStatus::Success => None,
                    TxStatus::Reverted => Some(ErrorClass::Reverted),
                };
                Ok((format_report(&action, &report), class))
            }
            Route::Query => Ok((self.queries.query(&action).await?, None)),
        }
    }
}

/// Models sometimes send the argument object as JSON text.
fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => Value::String(text),
        },
        other => other,
    }
}

fn format_report(action: &Action, report: &TransactionReport) -> String {
    let mut lines = Vec::new();
    if let Some(approval) = &report.approval {
        lines.push(format!(
            "Approved token spending first (tx hash: {:?})",
            approval.tx_hash
        ));
    }

    let outcome = &report.outcome;
    let block = outcome
        .block_number
        .map_or_else(|| "unknown".to_string(), |b| b.to_string());
    match outcome.status {
        TxStatus::Success => {
            let headline = match action {
                Action::PlaceOrder { .. } => "Order placed",
                _ => "Swap executed",
            };
            lines.push(format!("{headline}: {}", report.intent.describe()));
            lines.push(format!("tx hash: {:?}", outcome.tx_hash));
            lines.push("Transaction status: Success".to_string());
        }
        TxStatus::Reverted => {
            lines.push(format!(
                "Transaction reverted: {} was rejected by the contract",
                report.intent.describe()
            ));
            lines.push(format!("tx hash: {:?}", outcome.tx_hash));
            lines.push("Transaction status: Reverted".to_string());
        }
    }
    lines.push(format!("Block: {block}"));
    lines.push(format!("Gas used: {}", outcome.gas_used));
    lines.join("\n")
}

#[must_use]
pub fn format_error(error: &GridHookError) -> String {
    let mut text = format!("Error ({}): {error}", error.class());
    if error.outcome_unknown() {
        text.push('\n');
        text.push_str(RETRY_WARNING);
    }
    text
}
