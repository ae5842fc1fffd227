use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One turn of a chat exchange, in the Chat Completions message shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_owned()
}

/// `arguments` is the raw JSON string produced by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// What the model sent back for one round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantReply {
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Runs one round. An empty `tools` slice declares no tools.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> anyhow::Result<AssistantReply>;
}

/// Append-only turn log sent whole on every round.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            turns: vec![
                ChatMessage::System {
                    content: system_prompt.into(),
                },
                ChatMessage::User {
                    content: user_message.into(),
                },
            ],
        }
    }

    pub fn push_assistant(&mut self, reply: &AssistantReply) {
        self.turns.push(ChatMessage::Assistant {
            content: reply.content.clone(),
            tool_calls: reply.tool_calls.clone(),
        });
    }

    pub fn push_tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.turns.push(ChatMessage::Tool {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn messages_serialize_in_chat_completions_shape() {
        let mut conversation = Conversation::new("be helpful", "find me a book");
        conversation.push_assistant(&AssistantReply {
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".to_owned(),
                kind: "function".to_owned(),
                function: FunctionCall {
                    name: "get_summary_by_title".to_owned(),
                    arguments: r#"{"title":"Dune"}"#.to_owned(),
                },
            }],
        });
        conversation.push_tool_result("call_1", "get_summary_by_title", "Spice.");

        let value = serde_json::to_value(conversation.messages()).unwrap();
        assert_eq!(
            value,
            json!([
                { "role": "system", "content": "be helpful" },
                { "role": "user", "content": "find me a book" },
                {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_summary_by_title",
                            "arguments": "{\"title\":\"Dune\"}"
                        }
                    }]
                },
                {
                    "role": "tool",
                    "tool_call_id": "call_1",
                    "name": "get_summary_by_title",
                    "content": "Spice."
                }
            ])
        );
    }

    #[test]
    fn assistant_without_tool_calls_omits_the_field() {
        let message = ChatMessage::Assistant {
            content: Some("Try Dune.".to_owned()),
            tool_calls: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "role": "assistant", "content": "Try Dune." })
        );
    }

    #[test]
    fn conversation_is_append_only_in_order() {
        let mut conversation = Conversation::new("sys", "user");
        conversation.push_tool_result("a", "tool", "first");
        conversation.push_tool_result("b", "tool", "second");
        let ids = conversation
            .messages()
            .iter()
            .filter_map(|message| match message {
                ChatMessage::Tool { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(conversation.len(), 4);
    }

    #[test]
    fn reply_text_ignores_blank_content() {
        let reply = AssistantReply {
            content: Some("  \n".to_owned()),
            tool_calls: Vec::new(),
        };
        assert_eq!(reply.text(), None);
    }
}
