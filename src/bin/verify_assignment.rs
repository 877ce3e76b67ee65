//! Detection and recognition placement check

use std::process::ExitCode;

fn main() -> ExitCode {
    accel_probe::cli::block_on(accel_probe::cli::verify_assignment())
}
