//! Ollama `/api/chat` request building and response parsing
//!
//! Non-streaming responses are a single JSON object; streaming responses
//! are newline-delimited JSON, one object per chunk, ending with
//! `"done": true`.

use serde_json::{json, Map, Value};

use crate::ai::client::config::ModelOptions;
use crate::ai::model::{AssistantTurn, ModelError, StreamPart};
use crate::ai::types::{ChatMessage, Conversation, Role, ToolCall, ToolDefinition};

/// Build the JSON body for `POST /api/chat`
pub fn build_chat_body(
    model: &str,
    conversation: &Conversation,
    tools: &[ToolDefinition],
    options: &ModelOptions,
    stream: bool,
) -> Value {
    let messages: Vec<Value> = conversation.messages().iter().map(message_to_json).collect();

    let mut body = json!({
        "model": model,
        "messages": messages,
        "stream": stream,
        "options": options,
    });

    if !tools.is_empty() {
        body["tools"] = Value::Array(tools.iter().map(tool_to_json).collect());
    }

    body
}

fn message_to_json(message: &ChatMessage) -> Value {
    let mut value = json!({
        "role": message.role.as_str(),
        "content": message.content,
    });

    if message.role == Role::Assistant && !message.tool_calls.is_empty() {
        value["tool_calls"] = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments,
                    }
                })
            })
            .collect();
    }

    if message.role == Role::Tool {
        if let Some(name) = &message.tool_name {
            value["tool_name"] = json!(name);
        }
        if let Some(id) = &message.tool_call_id {
            value["tool_call_id"] = json!(id);
        }
    }

    value
}

fn tool_to_json(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

/// Parse a non-streaming `/api/chat` response
pub fn parse_chat_response(body: &Value) -> Result<AssistantTurn, ModelError> {
    if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
        return Err(ModelError::Malformed(error.to_string()));
    }

    let message = body
        .get("message")
        .ok_or_else(|| ModelError::Malformed("response has no message".into()))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string();

    let tool_calls = match message.get("tool_calls") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(calls)) => calls
            .iter()
            .enumerate()
            .map(|(index, call)| parse_tool_call(index, call))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(ModelError::Malformed(format!(
                "tool_calls is not an array: {other}"
            )))
        }
    };

    Ok(AssistantTurn {
        content,
        tool_calls,
    })
}

/// Ollama usually omits call ids; fall back to `call_<index>`
fn parse_tool_call(index: usize, call: &Value) -> Result<ToolCall, ModelError> {
    let function = call
        .get("function")
        .ok_or_else(|| ModelError::Malformed(format!("tool call #{index} has no function")))?;

    let name = function
        .get("name")
        .and_then(|n| n.as_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ModelError::Malformed(format!("tool call #{index} has no name")))?;

    let arguments = match function.get("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        // Some models return the arguments JSON-encoded
        Some(Value::String(raw)) if raw.trim().is_empty() => Map::new(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                return Err(ModelError::Malformed(format!(
                    "tool call '{name}' has unparseable arguments: {raw}"
                )))
            }
        },
        Some(other) => {
            return Err(ModelError::Malformed(format!(
                "tool call '{name}' has non-object arguments: {other}"
            )))
        }
    };

    let id = call
        .get("id")
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("call_{index}"));

    Ok(ToolCall::new(id, name, arguments))
}

/// Parse one line of a streamed `/api/chat` response
pub fn parse_stream_line(line: &str) -> Result<Vec<StreamPart>, ModelError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(line)
        .map_err(|e| ModelError::Malformed(format!("invalid stream chunk: {e}")))?;

    if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
        return Err(ModelError::Stream(error.to_string()));
    }

    let mut parts = Vec::new();

    if let Some(delta) = value
        .pointer("/message/content")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
    {
        parts.push(StreamPart::TextDelta {
            delta: delta.to_string(),
        });
    }

    if value.get("done").and_then(|d| d.as_bool()).unwrap_or(false) {
        parts.push(StreamPart::Finish {
            reason: value
                .get("done_reason")
                .and_then(|r| r.as_str())
                .map(str::to_string),
        });
    }

    Ok(parts)
}

/// Splits a byte stream into complete lines
///
/// Network chunks may end mid-line (or mid-codepoint), so bytes are held
/// until a newline arrives.
#[derive(Debug, Default)]
pub struct NdjsonBuffer {
    pending: Vec<u8>,
}

impl NdjsonBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and take every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            if !text.trim().is_empty() {
                lines.push(text);
            }
        }
        lines
    }

    /// Whatever is left after the stream ends
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&rest).into_owned();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ModelOptions {
        ModelOptions {
            temperature: 0.0,
            num_thread: Some(4),
        }
    }

    #[test]
    fn body_includes_tools_only_when_present() {
        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::system("sys")).unwrap();
        conversation.push(ChatMessage::user("hi")).unwrap();

        let without = build_chat_body("phi4", &conversation, &[], &options(), true);
        assert!(without.get("tools").is_none());
        assert_eq!(without["stream"], json!(true));
        assert_eq!(without["options"]["num_thread"], json!(4));

        let tools = vec![ToolDefinition {
            name: "get_dividends".into(),
            description: "Dividends".into(),
            parameters: json!({ "type": "object" }),
        }];
        let with = build_chat_body("phi4", &conversation, &tools, &options(), false);
        assert_eq!(with["tools"][0]["type"], json!("function"));
        assert_eq!(with["tools"][0]["function"]["name"], json!("get_dividends"));
        assert_eq!(with["messages"][1], json!({ "role": "user", "content": "hi" }));
    }

    #[test]
    fn tool_messages_carry_name_and_id() {
        let mut args = Map::new();
        args.insert("ticker".into(), json!("NVDA"));
        let mut conversation = Conversation::new();
        conversation
            .push(ChatMessage::assistant_with_tools(
                "",
                vec![ToolCall::new("call_0", "get_dividends", args)],
            ))
            .unwrap();
        conversation
            .push(ChatMessage::tool_result("call_0", "get_dividends", "Date,Dividends"))
            .unwrap();

        let body = build_chat_body("phi4", &conversation, &[], &options(), false);
        assert_eq!(
            body["messages"][0]["tool_calls"][0]["function"]["arguments"]["ticker"],
            json!("NVDA")
        );
        assert_eq!(body["messages"][1]["tool_name"], json!("get_dividends"));
        assert_eq!(body["messages"][1]["tool_call_id"], json!("call_0"));
    }

    #[test]
    fn assigns_ids_when_missing() {
        let body = json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    { "function": { "name": "get_key_financial_metrics", "arguments": { "ticker": "NVDA" } } },
                    { "function": { "name": "get_latest_news", "arguments": "{\"ticker\": \"NVDA\"}" } }
                ]
            },
            "done": true
        });

        let turn = parse_chat_response(&body).unwrap();
        assert_eq!(turn.tool_calls.len(), 2);
        assert_eq!(turn.tool_calls[0].id, "call_0");
        assert_eq!(turn.tool_calls[1].id, "call_1");
        assert_eq!(turn.tool_calls[1].arguments["ticker"], json!("NVDA"));
    }

    #[test]
    fn keeps_server_ids() {
        let body = json!({
            "message": {
                "content": "",
                "tool_calls": [{ "id": "abc", "function": { "name": "x", "arguments": {} } }]
            }
        });
        assert_eq!(parse_chat_response(&body).unwrap().tool_calls[0].id, "abc");
    }

    #[test]
    fn rejects_nameless_calls() {
        let body = json!({
            "message": { "content": "", "tool_calls": [{ "function": { "arguments": {} } }] }
        });
        assert!(matches!(
            parse_chat_response(&body),
            Err(ModelError::Malformed(_))
        ));
    }

    #[test]
    fn plain_text_response() {
        let body = json!({ "message": { "role": "assistant", "content": "Hello!" }, "done": true });
        let turn = parse_chat_response(&body).unwrap();
        assert_eq!(turn, AssistantTurn::text("Hello!"));
    }

    #[test]
    fn stream_lines() {
        let parts =
            parse_stream_line(r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#)
                .unwrap();
        assert_eq!(parts, vec![StreamPart::TextDelta { delta: "Hel".into() }]);

        let parts = parse_stream_line(
            r#"{"message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#,
        )
        .unwrap();
        assert_eq!(
            parts,
            vec![StreamPart::Finish {
                reason: Some("stop".into())
            }]
        );

        assert!(matches!(
            parse_stream_line(r#"{"error":"model not found"}"#),
            Err(ModelError::Stream(_))
        ));
        assert!(parse_stream_line("   ").unwrap().is_empty());
    }

    #[test]
    fn ndjson_buffer_joins_split_chunks() {
        let mut buffer = NdjsonBuffer::new();
        assert!(buffer.push(b"{\"a\":").is_empty());
        assert_eq!(buffer.push(b"1}\n{\"b\""), vec!["{\"a\":1}".to_string()]);
        assert_eq!(buffer.push(b":2}\n\n"), vec!["{\"b\":2}".to_string()]);
        assert_eq!(buffer.finish(), None);

        // multi-byte character split across chunks
        let euro = "€".as_bytes();
        buffer.push(&euro[..1]);
        let lines = buffer.push(&[&euro[1..], b"\n".as_slice()].concat());
        assert_eq!(lines, vec!["€".to_string()]);

        buffer.push(b"{\"tail\":true}");
        assert_eq!(buffer.finish(), Some("{\"tail\":true}".to_string()));
    }
}
