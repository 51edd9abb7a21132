//! Jornada Core — shared abstractions.
//!
//! This crate defines the seams the conversation engine is written against:
//! time, typing pauses, the external text-generation collaborator, and the
//! local-storage-style session store. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod generation;
pub mod pacing;
pub mod repository;
