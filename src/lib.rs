//! Magpie - scripted diagnostics collector
//!
//! This crate parses a small declarative script describing which machines to
//! reach and which artifacts to collect, then executes the resulting plan
//! against every target machine, writing results into a local working tree
//! namespaced by machine identity.

pub mod bundle;
pub mod cli;
pub mod cluster;
pub mod copy;
pub mod machine;
pub mod runtime;
pub mod script;
pub mod transport;

pub use machine::Machine;
pub use runtime::{Executor, ExecutorConfig, RunReport};
pub use script::{Script, ScriptAssembler, ScriptDefaults};
