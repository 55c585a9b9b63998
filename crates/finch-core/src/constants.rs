//! Shared constants

pub mod ai {
    use std::time::Duration;

    pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
    pub const DEFAULT_TOOL_MODEL: &str = "granite4:350m";
    pub const DEFAULT_CHAT_MODEL: &str = "granite4:1b";

    /// Tool selection must be deterministic
    pub const SELECTOR_TEMPERATURE: f32 = 0.0;
    pub const RESPONDER_TEMPERATURE: f32 = 0.5;

    /// Upper bound for a single non-streaming model call
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Maximum silence between two chunks of a streamed response
    pub const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(120);
}

pub mod tools {
    use std::time::Duration;

    pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);
    pub const MAX_TOOL_OUTPUT_CHARS: usize = 30_000;
    pub const NEWS_LIMIT: usize = 5;
}

pub mod server {
    pub const DEFAULT_PORT: u16 = 8000;
    pub const EVENT_CHANNEL_BUFFER: usize = 64;
}

pub mod sessions {
    /// Prior messages kept per session (user + assistant pairs)
    pub const MAX_HISTORY_MESSAGES: usize = 20;
    pub const MAX_SESSIONS: usize = 1_000;
    pub const MAX_SESSION_ID_LEN: usize = 128;
}

pub mod paths {
    pub const CONFIG_DIR_NAME: &str = ".finch";
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}
