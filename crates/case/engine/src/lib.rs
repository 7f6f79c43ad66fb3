//! Case Engine Execution Kernel
//!
//! Turns requests to start an instance or to inject work into a running
//! case into consistent state transitions against the definition and
//! instance stores.
//!
//! # Architecture
//!
//! ```text
//! caller ─► CaseEngine ─► CommandExecutor ─► [logging] ─► [retry] ─► CommandContext
//!                                                                     │
//!              DefinitionResolver ◄── snapshot of DefinitionStore ◄───┤
//!              InstanceCreationService / InjectPlanItemCmd ──────────►┤ staged changes
//!                                                                     ▼
//!                                              commit: InstanceStore::apply, then events
//! ```
//!
//! - **Commands** carry only their inputs and run inside exactly one
//!   [`CommandContext`]. Nested commands join the open context.
//! - **Resolution** follows id, then key without tenant, then key with
//!   tenant and optional fallback to the no-tenant definition.
//! - **Injection** is validated twice: when the command runs, and again by
//!   the store when the change set is applied.

#![deny(unsafe_code)]

pub mod command;
pub mod commands;
mod configuration;
mod engine;
mod error;
mod hooks;
mod injection;
mod instance_builder;
mod instance_helper;
pub mod mocks;
mod resolver;
mod settings;
pub mod telemetry;

pub use command::{
    Command, CommandContext, CommandExecutor, CommandInterceptor, CommandOutput, EngineCommand,
    LoggingInterceptor, Next, RetryInterceptor,
};
pub use commands::{InjectPlanItemCmd, StartInstanceCmd, TerminateContainerCmd};
pub use configuration::EngineConfiguration;
pub use engine::CaseEngine;
pub use error::{CaseError, CaseResult, ErrorKind, Lookup};
pub use hooks::{DefaultInterpreter, EventListener, ExecutionInterpreter};
pub use injection::InjectionBuilder;
pub use instance_builder::InstanceBuilder;
pub use instance_helper::{CreateInstanceParams, InstanceCreationService};
pub use resolver::{DefinitionQuery, DefinitionResolver};
pub use settings::{EngineSettings, LoggingConfig, RetryConfig};
