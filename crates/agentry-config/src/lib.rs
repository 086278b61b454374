//! # agentry-config
//!
//! TOML configuration for an agentry agent: its name and iteration cap, the
//! model retry policy, where storage lives, which tool tags to expose, and
//! the goals rendered into every prompt.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentry_config::AgentConfig;
//!
//! let config = AgentConfig::from_file(Path::new("config/invoice-agent.toml"))?;
//! let agent = Agent::builder(&config.agent.name)
//!     .goals(config.sorted_goals())
//!     .retry(config.retry_policy())
//!     .registry(registry.subset(&config.tool_tags()))
//!     // ...
//!     .build()?;
//! ```

pub mod config;
pub mod sections;

pub use config::AgentConfig;
pub use sections::{AgentSection, GoalEntry, RetrySection, StorageSection, ToolsSection};
