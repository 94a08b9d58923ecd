pub mod orchestrator;
pub mod temp;

pub use orchestrator::Orchestrator;
pub use temp::{TempSet, WorkDir};
