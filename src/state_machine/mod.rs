// State machine module for status workflows
//
// Declarative transition tables are compiled once into inverted, validated
// definitions (target -> allowed sources), one per status namespace.

pub mod definition;
pub mod namespace;
pub mod table;

// Re-export main types for convenient access
pub use definition::StateMachineDefinition;
pub use namespace::{StatusFields, StatusNamespace};
pub use table::TransitionTable;
