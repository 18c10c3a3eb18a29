//! `scribe-watch` command implementations and terminal rendering.

pub mod commands;
pub mod render;
