use std::process::ExitCode;

mod apply;
mod config;
mod library;
mod runtime;
mod sprite;

use apply::ApplyError;

fn main() -> ExitCode {
    match runtime::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Cancelling is a choice, not a failure worth a report.
            if e.downcast_ref::<ApplyError>().is_some_and(ApplyError::is_cancelled) {
                eprintln!("msupack: cancelled");
                return ExitCode::from(130);
            }
            eprintln!("msupack: {e}");
            ExitCode::FAILURE
        }
    }
}
