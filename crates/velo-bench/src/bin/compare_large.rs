//! GPU-focused throughput scan over growing device counts.
//!
//! Same preparation pipeline as `compare_platforms`, but the configuration
//! list sweeps CUDA device lists (1, 2, 3 devices) plus an OpenCL entry.
//! Writes `results_large.txt`.

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
        PlatformConfig::new("CUDA", &[("DeviceIndex", "0"), ("Precision", "single")]),
        PlatformConfig::new("CUDA", &[("DeviceIndex", "0,1"), ("Precision", "single")]),
        PlatformConfig::new("CUDA", &[("DeviceIndex", "0,1,2"), ("Precision", "single")]),
        PlatformConfig::new("OpenCL", &[("DeviceIndex", "0"), ("Precision", "single")]),
    ];

    let results: Vec<_> = configs
        .iter()
        .map(|config| harness::run_benchmark(&system, config, harness::DEFAULT_STEP_COUNT))
        .collect();

    log::debug!("results: {}", serde_json::to_string(&results)?);
    harness::write_report(Path::new("results_large.txt"), &results)?;
    Ok(())
}
