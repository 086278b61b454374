//! # agentry-language
//!
//! [`AgentLanguage`](agentry_core::traits::AgentLanguage) implementations.
//!
//! - [`JsonActionLanguage`] asks the model to think in prose, then emit a
//!   fenced block opened with a literal marker (```` ```action ````)
//!   containing `{"tool": ..., "args": {...}}`.
//! - [`FunctionCallingLanguage`] offers the registry as native tool specs and
//!   expects the collaborator to return the structured call directly.
//!
//! Both hand the loop the same `Invocation`, so agents can switch variants
//! without other changes.

pub mod function_calling;
pub mod json_action;
mod render;

pub use function_calling::FunctionCallingLanguage;
pub use json_action::JsonActionLanguage;
