//! Tool registry and the financial data tools

pub mod implementations;
pub mod registry;
pub mod truncation;

pub use implementations::{finance_registry, FinanceTool};
pub use registry::{
    parse_params, Tool, ToolError, ToolRegistry, ToolRegistryBuilder, ToolResult, UnknownTool,
};
