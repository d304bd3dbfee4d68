//! Command-line check for serverless deployment descriptors.
//!
//! This crate owns process concerns (argument parsing, output streams and exit
//! codes) around the pure `descriptor_core` pipeline.

pub mod cli;
pub mod outcome;

pub use cli::{run, Cli, Command, OutputFormat};
pub use outcome::{check_path, CheckOutcome, CheckReport};

pub const EXIT_OK: i32 = 0;
pub const EXIT_INVALID: i32 = 1;
pub const EXIT_LOAD_FAILED: i32 = 2;
