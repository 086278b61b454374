//! Rendering helpers shared by both language variants.

use agentry_contracts::{
    goal::Goal,
    memory::MemoryType,
    prompt::{Message, Role},
};
use agentry_core::Memory;

const GOAL_SEPARATOR: &str = "\n-------------------\n";

/// All goals as one block, in the order given.
pub(crate) fn goals_block(goals: &[Goal]) -> String {
    goals
        .iter()
        .map(|g| format!("{}:{GOAL_SEPARATOR}{}{GOAL_SEPARATOR}", g.name, g.description))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Environment results are shown to the model as user input.
pub(crate) fn role_for(kind: MemoryType) -> Role {
    match kind {
        MemoryType::User | MemoryType::Environment => Role::User,
        MemoryType::Assistant => Role::Assistant,
        MemoryType::System => Role::System,
    }
}

pub(crate) fn memory_messages(memory: &Memory) -> Vec<Message> {
    memory
        .entries()
        .into_iter()
        .map(|e| Message::new(role_for(e.kind), e.content))
        .collect()
}
