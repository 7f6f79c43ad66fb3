//! In-memory reference implementations of the store traits.
//!
//! These adapters are deterministic and test-friendly. Each store guards its
//! state with a single lock so a change set is applied atomically.

mod definitions;
mod instances;

pub use definitions::{DefinitionCatalogue, InMemoryDefinitionStore};
pub use instances::{InMemoryInstanceStore, InstanceTables};
