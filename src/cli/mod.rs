//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Setup and server | `init`, `serve` |
//! | Task | Work item management | `task add`, `task toggle`, `task list` |
//! | Summary | Counts by status | `stats` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr:
//! ```bash
//! taskboard --verbose task list
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod task;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use task::TaskCommands;
