//! Case Engine Domain Types
//!
//! The vocabulary shared by the definition store, the instance store and the
//! execution kernel.
//!
//! # Key Concepts
//!
//! - **Definition**: A versioned, immutable template identified by an id and
//!   addressed by a human key. Many definitions share a key across versions
//!   and tenants; "latest" is the maximum version per (key, tenant).
//! - **Instance**: A running execution of exactly one definition, carrying
//!   persistent variables, an optional business key and callback linkage.
//! - **PlanItem**: A runtime unit of work inside an instance. Stages are plan
//!   items that contain further plan items.
//! - **ContainerRef**: Where a plan item lives, either the case instance
//!   itself or a stage within it.
//! - **TenantId**: Partition of definitions and instances. `NoTenant` is a
//!   distinct sentinel, not the same as an empty tenant string.

#![deny(unsafe_code)]

mod definition;
mod event;
mod ids;
mod instance;
mod plan_item;
mod tenant;
mod variables;

pub use definition::*;
pub use event::*;
pub use ids::*;
pub use instance::*;
pub use plan_item::*;
pub use tenant::*;
pub use variables::*;
