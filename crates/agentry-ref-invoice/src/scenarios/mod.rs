//! Invoice reference runtime demo scenarios.
//!
//! Each scenario wires real agentry components (agent loop, language,
//! registry, storage, transactions) to mock data and a scripted model.

pub mod invoice_pipeline;
pub mod staged_ledger;

use agentry_core::Memory;

/// Print a run's memory, one line per entry, long content shortened.
pub(crate) fn print_memory(memory: &Memory) {
    for (i, entry) in memory.entries().iter().enumerate() {
        let flat = entry.content.replace('\n', " ");
        let shown: String = flat.chars().take(96).collect();
        let ellipsis = if flat.chars().count() > 96 { "..." } else { "" };
        println!("    {:>2}. [{:<11}] {}{}", i + 1, entry.kind.to_string(), shown, ellipsis);
    }
}
