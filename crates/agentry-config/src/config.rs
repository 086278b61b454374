//! Loading and validating `AgentConfig`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use agentry_contracts::{
    error::{AgentError, AgentResult},
    goal::Goal,
};
use agentry_core::RetryPolicy;

use crate::sections::{AgentSection, GoalEntry, RetrySection, StorageSection, ToolsSection};

/// A parsed agent configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub agent: AgentSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub goals: Vec<GoalEntry>,
}

impl AgentConfig {
    /// Parse a TOML string.
    ///
    /// Returns `AgentError::Config` if the TOML is malformed, does not match
    /// the schema, or fails validation.
    pub fn from_toml_str(s: &str) -> AgentResult<Self> {
        let config: AgentConfig = toml::from_str(s).map_err(|e| AgentError::Config {
            reason: format!("failed to parse agent TOML: {}", e),
        })?;
        config.validate()?;
        debug!(
            agent = %config.agent.name,
            goals = config.goals.len(),
            "agent configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as an agent configuration.
    pub fn from_file(path: &Path) -> AgentResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AgentError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> AgentResult<()> {
        if self.agent.name.trim().is_empty() {
            return Err(AgentError::Config {
                reason: "agent.name must not be empty".to_string(),
            });
        }
        if self.agent.max_iterations == Some(0) {
            return Err(AgentError::Config {
                reason: "agent.max_iterations must be at least 1".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(AgentError::Config {
                reason: "retry.max_attempts must be at least 1".to_string(),
            });
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(AgentError::Config {
                reason: format!(
                    "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                    self.retry.base_delay_ms, self.retry.max_delay_ms
                ),
            });
        }
        Ok(())
    }

    /// Goals ordered by ascending priority. Ties keep declaration order.
    pub fn sorted_goals(&self) -> Vec<Goal> {
        let mut goals: Vec<Goal> = self.goals.iter().map(Goal::from).collect();
        goals.sort_by_key(|g| g.priority);
        goals
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn tool_tags(&self) -> Vec<&str> {
        self.tools.tags.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[agent]
name = "invoice-agent"
max_iterations = 10

[retry]
max_attempts = 4
base_delay_ms = 100
max_delay_ms = 1000

[storage]
path = "data/store.json"

[tools]
tags = ["invoices", "system"]

[[goals]]
priority = 2
name = "Store"
description = "Store the invoice"

[[goals]]
priority = 1
name = "Extract"
description = "Extract the fields"

[[goals]]
priority = 2
name = "Report"
description = "Report the result"
"#;

    #[test]
    fn parses_every_section() {
        let config = AgentConfig::from_toml_str(FULL).unwrap();
        assert_eq!(config.agent.name, "invoice-agent");
        assert_eq!(config.agent.max_iterations, Some(10));
        assert_eq!(config.storage.path, "data/store.json");
        assert_eq!(config.tool_tags(), vec!["invoices", "system"]);

        let retry = config.retry_policy();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.base_delay, Duration::from_millis(100));
        assert_eq!(retry.max_delay, Duration::from_secs(1));
    }

    #[test]
    fn goals_sort_by_priority_and_keep_ties_stable() {
        let config = AgentConfig::from_toml_str(FULL).unwrap();
        let names: Vec<String> = config.sorted_goals().into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["Extract", "Store", "Report"]);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AgentConfig::from_toml_str("[agent]\nname = \"a\"\n").unwrap();
        assert_eq!(config.agent.max_iterations, None);
        assert_eq!(config.retry, RetrySection::default());
        assert_eq!(config.storage.path, "agent_storage.json");
        assert!(config.tool_tags().is_empty());
        assert!(config.goals.is_empty());
    }

    #[test]
    fn missing_agent_section_is_config_error() {
        let err = AgentConfig::from_toml_str("[storage]\npath = \"x\"\n").unwrap_err();
        assert!(matches!(err, AgentError::Config { .. }));
    }

    #[test]
    fn zero_iterations_rejected() {
        let err =
            AgentConfig::from_toml_str("[agent]\nname = \"a\"\nmax_iterations = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_iterations"));
    }

    #[test]
    fn inverted_delays_rejected() {
        let toml = "[agent]\nname = \"a\"\n[retry]\nbase_delay_ms = 900\nmax_delay_ms = 10\n";
        let err = AgentConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, AgentError::Config { .. }));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = AgentConfig::from_file(Path::new("/nonexistent/agent.toml")).unwrap_err();
        match err {
            AgentError::Config { reason } => assert!(reason.contains("/nonexistent/agent.toml")),
            other => panic!("expected Config, got {:?}", other),
        }
    }
}
