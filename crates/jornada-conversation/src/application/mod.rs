//! Application layer: effect execution, command/query handlers, runtime.

pub mod command_handlers;
pub mod driver;
pub mod query_handlers;
pub mod runtime;
