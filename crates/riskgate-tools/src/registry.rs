//! Tool Registry - Registration and dispatch of gateway tools
//!
//! Tools are registered by name and optionally grouped by category. The
//! registry turns into a [`BuiltinToolExecutor`] that enforces each tool's
//! timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use riskgate_core::{GateError, GateResult, Tool, ToolDefinition, ToolExecutor, ToolInput, ToolResult};
use riskgate_safety::{Gateway, RequestExecutor};
use tracing::{debug, info, warn};

use crate::tools::GatewayTools;

/// Tool category for organization
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolCategory {
    /// Calls against the management API
    Api,
    /// Read-only catalog queries
    Catalog,
    /// Mode and safety controls
    Safety,
    /// Custom user-defined tools
    Custom(String),
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolCategory::Api => write!(f, "api"),
            ToolCategory::Catalog => write!(f, "catalog"),
            ToolCategory::Safety => write!(f, "safety"),
            ToolCategory::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// Tool registry for managing available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    categories: HashMap<ToolCategory, Vec<String>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four gateway tools
    pub fn with_gateway_tools(gateway: Arc<Gateway>, executor: Arc<dyn RequestExecutor>) -> Self {
        let mut registry = Self::new();
        for (category, tool) in GatewayTools::categorized(gateway, executor) {
            registry.register_boxed(tool, Some(category));
        }
        registry
    }

    /// Register a single tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> &mut Self {
        self.register_boxed(Box::new(tool), None)
    }

    /// Register a tool with a specific category
    pub fn register_with_category<T: Tool + 'static>(
        &mut self,
        tool: T,
        category: ToolCategory,
    ) -> &mut Self {
        self.register_boxed(Box::new(tool), Some(category))
    }

    fn register_boxed(&mut self, tool: Box<dyn Tool>, category: Option<ToolCategory>) -> &mut Self {
        let name = tool.config().name.clone();
        if self.tools.contains_key(&name) {
            warn!(tool = %name, "Replacing previously registered tool");
        }
        match &category {
            Some(category) => info!(tool = %name, category = %category, "Registering tool"),
            None => info!(tool = %name, "Registering tool"),
        }
        if let Some(category) = category {
            let names = self.categories.entry(category).or_default();
            if !names.contains(&name) {
                names.push(name.clone());
            }
        }
        self.tools.insert(name, Arc::from(tool));
        self
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all tool names, sorted
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// List tool definitions, sorted by name
    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        sorted_definitions(&self.tools)
    }

    /// List tools by category
    pub fn list_by_category(&self, category: &ToolCategory) -> Vec<Arc<dyn Tool>> {
        self.categories
            .get(category)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| self.tools.get(n).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Convert registry into a tool executor
    pub fn into_executor(self) -> BuiltinToolExecutor {
        BuiltinToolExecutor::new(self)
    }

    /// Create an executor sharing this registry's tools
    pub fn as_executor(&self) -> BuiltinToolExecutor {
        BuiltinToolExecutor {
            tools: self.tools.clone(),
        }
    }
}

fn sorted_definitions(tools: &HashMap<String, Arc<dyn Tool>>) -> Vec<ToolDefinition> {
    let mut definitions: Vec<ToolDefinition> = tools.values().map(|t| t.definition()).collect();
    definitions.sort_by(|a, b| a.name.cmp(&b.name));
    definitions
}

/// Tool executor backed by registered tools
pub struct BuiltinToolExecutor {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl BuiltinToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            tools: registry.tools,
        }
    }
}

#[async_trait]
impl ToolExecutor for BuiltinToolExecutor {
    async fn execute_tool(&self, name: &str, input: ToolInput) -> GateResult<ToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| GateError::tool(format!("Tool not found: {}", name)))?;

        debug!(tool = %name, "Executing tool");
        let timeout_secs = tool.config().timeout_secs;
        let start = std::time::Instant::now();

        let outcome = tokio::time::timeout(Duration::from_secs(timeout_secs), tool.execute(input))
            .await
            .map_err(|_| {
                GateError::tool(format!("Tool {} timed out after {}s", name, timeout_secs))
            })?;

        match outcome {
            Ok(result) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(tool = %name, elapsed_ms = %elapsed, success = %result.success, "Tool execution complete");
                Ok(result.with_execution_time(elapsed))
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                Err(e)
            }
        }
    }

    fn list_tools(&self) -> Vec<ToolDefinition> {
        sorted_definitions(&self.tools)
    }

    fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }
}
