//! # agentry-contracts
//!
//! Shared types, wire shapes, and error contracts for the agentry runtime.
//!
//! All crates in the workspace import from here. No orchestration logic lives
//! in this crate: only data definitions and error types.

pub mod error;
pub mod execution;
pub mod goal;
pub mod invocation;
pub mod memory;
pub mod prompt;
