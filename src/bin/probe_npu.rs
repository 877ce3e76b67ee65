//! NPU device evidence and validation. Exits 1 without a working NPU

use std::process::ExitCode;

fn main() -> ExitCode {
    accel_probe::cli::block_on(accel_probe::cli::probe_npu())
}
