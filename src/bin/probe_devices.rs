//! Host summary, full device probe and task assignment

use std::process::ExitCode;

fn main() -> ExitCode {
    accel_probe::cli::block_on(accel_probe::cli::probe_devices())
}
