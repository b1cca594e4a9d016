//! Prompt synthesis and execution: agent generation, evolution-prompt
//! synthesis, api/cli execution, and execution-metadata capture.

pub mod evolve;
pub mod execute;
pub mod generate;
pub mod observability;
