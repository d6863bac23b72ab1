mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::CatwatchOrchestrator;
pub use types::{ComponentState, ShutdownReason};
