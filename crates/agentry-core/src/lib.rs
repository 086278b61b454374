//! # agentry-core
//!
//! The orchestration core of the agentry runtime.
//!
//! This crate provides:
//! - The capability traits (`ModelClient`, `AgentLanguage`, `Environment`,
//!   `ActionHandler`, `Storage`)
//! - `Memory`, `Action`/`ActionRegistry` and the run-wide `ActionContext`
//! - `LocalEnvironment`, which validates and runs actions
//! - The `Agent` control loop and its rate-limit retry policy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentry_core::{Agent, ActionRegistry};
//!
//! let agent = Agent::builder("invoice-agent")
//!     .goals(goals)
//!     .language(JsonActionLanguage::new())
//!     .registry(registry)
//!     .model(model)
//!     .build()?;
//! let memory = agent.run("process invoice INV-1", None)?;
//! ```

pub mod action;
pub mod agent;
pub mod context;
pub mod environment;
pub mod memory;
pub mod retry;
pub mod traits;

pub use action::{Action, ActionRegistry};
pub use agent::{Agent, AgentBuilder, AgentPhase};
pub use context::ActionContext;
pub use environment::LocalEnvironment;
pub use memory::Memory;
pub use retry::{RetryPolicy, RetryingModel};
