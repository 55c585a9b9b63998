//! Wire format for streamed runs: one `data: <json>\n\n` chunk per event

use super::loop_events::LoopEvent;

pub struct StreamEmitter;

impl StreamEmitter {
    pub fn emit(event: &LoopEvent) -> String {
        // LoopEvent holds only strings and JSON values
        let json = serde_json::to_string(event).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize stream event: {}", e);
            r#"{"type":"text","content":"internal serialization error"}"#.to_string()
        });
        format!("data: {json}\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frames_each_event() {
        assert_eq!(
            StreamEmitter::emit(&LoopEvent::Done),
            "data: {\"type\":\"done\"}\n\n"
        );
        assert_eq!(
            StreamEmitter::emit(&LoopEvent::Text {
                content: "line one\nline two".into()
            }),
            "data: {\"type\":\"text\",\"content\":\"line one\\nline two\"}\n\n"
        );
    }

    #[test]
    fn tool_frame_round_trips() {
        let frame = StreamEmitter::emit(&LoopEvent::Tool {
            name: "get_historical_data".into(),
            args: json!({ "ticker": "NVDA", "period": "5d" }),
        });
        let payload = frame
            .strip_prefix("data: ")
            .and_then(|f| f.strip_suffix("\n\n"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(value["type"], "tool");
        assert_eq!(value["args"]["period"], "5d");
    }
}
