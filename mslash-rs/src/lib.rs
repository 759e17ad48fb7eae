//! MSlash: an interpreter for a small line-oriented scripting language.

pub mod cli;
pub mod console;
pub mod script;
