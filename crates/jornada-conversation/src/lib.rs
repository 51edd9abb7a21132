//! Jornada — conversation driver.
//!
//! Responsible for the scripted funnel: step transitions, captured answers,
//! message emission, the story viewer and simulated call, and the per-session
//! runtime that owns timers.

pub mod application;
pub mod domain;
