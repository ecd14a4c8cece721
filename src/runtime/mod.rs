//! Execution runtime: per-machine orchestration and run reporting.

pub mod error;
pub mod executor;
pub mod result;

pub use error::ExecutionError;
pub use executor::{Executor, ExecutorConfig};
pub use result::{ActionOutcome, ActionStatus, MachineReport, RunReport};
