/*
 * Append-only conversation log shared with the language-model collaborator
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::ActionCatalog;
use crate::config::Deployment;
use crate::utils::checksum;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// JSON text, as the model emits it
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered message history. Entries are only ever appended.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut log = Self::new();
        log.push(Message::new(Role::System, prompt));
        log
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &Message {
        self.push(Message::new(Role::User, content))
    }

    /// Records the model's decision to invoke an action.
    pub fn push_tool_call(&mut self, id: &str, action: &str, arguments: &Value) -> &Message {
        let mut message = Message::new(Role::Assistant, "");
        message.tool_calls = Some(vec![ToolCall {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: action.to_string(),
                arguments: arguments.to_string(),
            },
        }]);
        self.push(message)
    }

    pub fn push_tool_result(&mut self, id: &str, action: &str, output: impl Into<String>) -> &Message {
        let mut message = Message::new(Role::Tool, output);
        message.tool_call_id = Some(id.to_string());
        message.name = Some(action.to_string());
        self.push(message)
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> &Message {
        self.push(Message::new(Role::Assistant, content))
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Opening system message describing the deployment and the available actions.
#[must_use]
pub fn system_prompt(deployment: &Deployment, catalog: &ActionCatalog) -> String {
    let key = &deployment.pool_key;
    format!(
        "You are a trading assistant for a Uniswap v4 pool with a GridHook that manages grid limit orders.\n\
         Pool: token0 {} / token1 {}, fee {}, tick spacing {}, pool id {}.\n\
         GridHook: {}. Swap router: {}. Pool manager: {}.\n\
         zero_for_one=true means selling token0 for token1. Amounts are in whole tokens (18 decimals).\n\
         Available actions: {}. Call one action per request and summarise its result for the user.",
        checksum(&key.currency0),
        checksum(&key.currency1),
        key.fee,
        key.tick_spacing,
        key.to_id(),
        checksum(&deployment.grid_hook),
        checksum(&deployment.swap_router),
        checksum(&deployment.pool_manager),
        catalog.names().join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_appends_in_order() {
        let mut log = ConversationLog::with_system_prompt("be helpful");
        log.push_user("place an order at tick 60");
        log.push_tool_call("call_1", "place_order", &json!({"tick": 60}));
        log.push_tool_result("call_1", "place_order", "Order placed");
        log.push_assistant("Done.");

        let roles: Vec<Role> = log.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(log.len(), 5);
        assert_eq!(log.last().map(|m| m.content.as_str()), Some("Done."));
    }

    #[test]
    fn tool_messages_serialize_in_chat_shape() {
        let mut log = ConversationLog::new();
        log.push_tool_call("call_7", "swap", &json!({"zero_for_one": true, "amount": "2"}));
        log.push_tool_result("call_7", "swap", "Swap executed");

        let call = serde_json::to_value(&log.messages()[0]).unwrap();
        assert_eq!(call["role"], "assistant");
        assert_eq!(call["tool_calls"][0]["type"], "function");
        assert_eq!(call["tool_calls"][0]["function"]["name"], "swap");
        assert!(call.get("tool_call_id").is_none());

        let result = serde_json::to_value(&log.messages()[1]).unwrap();
        assert_eq!(result["role"], "tool");
        assert_eq!(result["tool_call_id"], "call_7");
        assert_eq!(result["name"], "swap");
    }
}
