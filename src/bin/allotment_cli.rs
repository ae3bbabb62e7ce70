use std::process::ExitCode;

use allotment_core::cli::{output, run_cli};

fn main() -> ExitCode {
    allotment_core::init();
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print(output::MessageKind::Error, format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}
