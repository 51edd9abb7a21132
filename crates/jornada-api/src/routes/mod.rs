//! Route modules.

pub mod conversations;
pub mod health;
