//! Dynamic tool dispatch for the conversation loop.
//!
//! The LLM chooses among registered tools at runtime, so tools are a
//! registry of named capabilities: each exposes a static definition (name,
//! parameter schema) and an execute operation. Adding a tool means
//! registering another implementation, not branching on type.
//!
//! Tools that cite retrieved material track their sources per execution;
//! the registry collects and resets them once per conversation turn.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Source;

/// A named capability the LLM can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Static tool definition in the LLM wire format:
    /// `{name, description, input_schema}`.
    fn definition(&self) -> serde_json::Value;

    /// Execute with the LLM-supplied arguments. The returned string is fed
    /// back to the LLM verbatim as the tool result.
    async fn execute(&self, args: &serde_json::Value) -> Result<String>;

    /// Citations produced by the most recent execution, for UI display.
    fn last_sources(&self) -> Vec<Source> {
        Vec::new()
    }

    /// Drop any turn-scoped source state.
    fn reset_sources(&self) {}
}

/// Registry of tools keyed by name. Definition order is registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Definitions of every registered tool, ready for a generation call.
    pub fn definitions(&self) -> Vec<serde_json::Value> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch a tool call by name. An unknown name is reported as a
    /// tool-result string, not an error; the LLM relays it to the user.
    pub async fn execute(&self, name: &str, args: &serde_json::Value) -> Result<String> {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.execute(args).await,
            None => Ok(format!("Tool '{name}' not found")),
        }
    }

    /// Sources from the most recent tool execution this turn, if any.
    /// Source state is registry-wide, not per session; callers serialize
    /// turns against one registry.
    pub fn last_sources(&self) -> Vec<Source> {
        for tool in &self.tools {
            let sources = tool.last_sources();
            if !sources.is_empty() {
                return sources;
            }
        }
        Vec::new()
    }

    /// Clear source state on every tool at the end of a turn.
    pub fn reset_sources(&self) {
        for tool in &self.tools {
            tool.reset_sources();
        }
    }
}
