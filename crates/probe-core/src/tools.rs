//! External tool lookup.
//!
//! Vendor tools are located through the `[tools]` section of the
//! configuration:
//!
//! ```toml
//! [tools]
//! JLinkRemoteServer = "/opt/SEGGER/JLink_V794/JLinkRemoteServer"
//! ```
//!
//! Names are matched ignoring ASCII case, since keys coming from
//! environment variables arrive lowercased.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source of tool path overrides.
pub trait ToolLookup: Send + Sync {
    /// Registered path for `name`, if any.
    fn tool(&self, name: &str) -> Option<String>;
}

/// Tool name to path mapping loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolRegistry {
    tools: BTreeMap<String, String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` for `name`, replacing any previous entry.
    pub fn with_tool(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.tools.insert(name.into(), path.into());
        self
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolLookup for ToolRegistry {
    fn tool(&self, name: &str) -> Option<String> {
        let path = match self.tools.get(name) {
            Some(path) => Some(path),
            None => self
                .tools
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, path)| path),
        };
        path.filter(|path| !path.trim().is_empty()).cloned()
    }
}

/// Resolve the path of a tool.
///
/// With a lookup available, a registered override wins and the bare `name`
/// (searched on `PATH` at spawn time) is used otherwise. Without a lookup the
/// vendor's default installation path `fallback` is used. The result is not
/// checked for existence.
pub fn resolve_tool(lookup: Option<&dyn ToolLookup>, name: &str, fallback: &str) -> String {
    match lookup {
        Some(lookup) => lookup.tool(name).unwrap_or_else(|| name.to_string()),
        None => fallback.to_string(),
    }
}
