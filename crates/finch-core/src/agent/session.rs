//! Seed conversations
//!
//! Every run starts from `[system, user]`; with a session, prior turns sit
//! between the two.

use once_cell::sync::Lazy;

use crate::ai::types::{ChatMessage, Conversation, ConversationError};
use crate::tools::FinanceTool;

/// Fixed instructions for the assistant
pub static SYSTEM_PROMPT: Lazy<String> = Lazy::new(|| {
    let tools: Vec<String> = FinanceTool::ALL
        .iter()
        .map(|tool| format!("- {}: {}", tool.name(), tool.purpose()))
        .collect();

    format!(
        "You are a financial analysis assistant who has access to various tools for retrieving stock market and financial data about specific stocks.\n\
         \n\
         You have access to these tools:\n\
         \n\
         {}\n\
         \n\
         If a user asks you for financial data, make sure you know the company name or ticker symbol. Use the appropriate tool to retrieve the relevant financial data.\n",
        tools.join("\n")
    )
});

/// `[system, user]`
pub fn build(system_prompt: &str, user_prompt: &str) -> Conversation {
    Conversation::from_prompt(system_prompt, user_prompt)
}

/// `[system, ..history, user]`
pub fn build_with_history(
    system_prompt: &str,
    history: &[ChatMessage],
    user_prompt: &str,
) -> Result<Conversation, ConversationError> {
    let mut conversation = Conversation::new();
    conversation.push(ChatMessage::system(system_prompt))?;
    for message in history {
        conversation.push(message.clone())?;
    }
    conversation.push(ChatMessage::user(user_prompt))?;
    Ok(conversation)
}
