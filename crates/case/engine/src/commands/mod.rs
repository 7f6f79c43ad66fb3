//! The engine's commands.

mod inject_plan_item;
mod start_instance;
mod terminate_container;

pub use inject_plan_item::InjectPlanItemCmd;
pub use start_instance::StartInstanceCmd;
pub use terminate_container::TerminateContainerCmd;
