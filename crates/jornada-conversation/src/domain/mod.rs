//! Domain layer: pure data and the transition function.

pub mod commands;
pub mod effects;
pub mod events;
pub mod keywords;
pub mod live_call;
pub mod messages;
pub mod script;
pub mod session;
pub mod steps;
pub mod stories;
pub mod transition;
