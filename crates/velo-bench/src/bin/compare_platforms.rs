//! Platform throughput comparison for the chignolin miniprotein (1UAO).
//!
//! Builds one solvated, parameterized system, then benchmarks the fixed
//! configuration list below sequentially, since overlapping runs would contend
//! for the same cores and devices and invalidate the measurements. Writes
//! `results.txt`, one line per configuration.

use std::path::Path;

use anyhow::{Context, Result};

use velo_bench::harness::{self, PlatformConfig};
use velo_bench::modeller;
use velo_physics::solvate::SolventConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let system = modeller::prepare_system(Path::new("data/1uao.pdb"), &SolventConfig::default())
        .context("system preparation failed")?;

    let configs = vec![
        PlatformConfig::new("CPU", &[("Threads", "1")]),
        PlatformConfig::new("CPU", &[("Threads", "4")]),
        PlatformConfig::new("CPU", &[("Threads", "8")]),
        PlatformConfig::new("CUDA", &[("DeviceIndex", "0"), ("Precision", "single")]),
        // Multi-GPU, if the host has a second device.
        PlatformConfig::new("CUDA", &[("DeviceIndex", "0,1"), ("Precision", "single")]),
        PlatformConfig::new("OpenCL", &[("DeviceIndex", "0"), ("Precision", "single")]),
    ];

    let results: Vec<_> = configs
        .iter()
        .map(|config| harness::run_benchmark(&system, config, harness::DEFAULT_STEP_COUNT))
        .collect();

    log::debug!("results: {}", serde_json::to_string(&results)?);
    harness::write_report(Path::new("results.txt"), &results)?;
    Ok(())
}
