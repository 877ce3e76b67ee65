//! GPU device evidence and validation

use std::process::ExitCode;

fn main() -> ExitCode {
    accel_probe::cli::block_on(accel_probe::cli::probe_gpu())
}
