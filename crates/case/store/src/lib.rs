//! Case engine storage contracts.
//!
//! This crate defines what the execution kernel needs from persistence:
//! - a definition catalogue, read through consistent snapshots
//! - an instance store holding case instances and their plan item trees
//! - atomic change sets guarded by commit-time preconditions
//!
//! The in-memory adapters are the reference implementation used by tests
//! and embedded deployments.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod change;
mod error;
pub mod memory;
mod traits;

pub use change::{Change, ChangeSet, Precondition};
pub use error::{StoreError, StoreResult};
pub use memory::{DefinitionCatalogue, InMemoryDefinitionStore, InMemoryInstanceStore, InstanceTables};
pub use traits::{DefinitionLookup, DefinitionStore, InstanceStore};
