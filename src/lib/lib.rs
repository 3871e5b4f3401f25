pub mod automaton;
pub mod config;
pub mod error;
