// src/cli/mod.rs
// Command-line front end for the inspect binary

pub mod inspect;

pub use inspect::{run_inspect_cli, InspectArgs, InspectCliError};
