//! Taskboard - task manager with a JSON HTTP API

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = taskboard::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
