//! The benchmark harness and report writer.
//!
//! One configuration = one transient simulation context: resolve the
//! platform, minimize, thermalize, then time a fixed number of integration
//! steps. Failures local to a configuration (platform unavailable, device
//! error, numerical blow-up) never escape: they are logged and recorded as
//! a zero-throughput result so the batch always completes.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;

use velo_core::{Result, VeloError};
use velo_physics::{
    LangevinIntegrator, MolecularSystem, Platform, PlatformOptions, SimulationContext,
};

/// Integration steps timed per configuration.
pub const DEFAULT_STEP_COUNT: usize = 5000;

/// Minimization tolerance, kJ/(mol·nm).
const MINIMIZE_TOLERANCE: f64 = 1.0;

/// Minimization iteration cap.
const MINIMIZE_MAX_ITERATIONS: usize = 1000;

/// One benchmark target: platform name plus its option map.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub platform: String,
    pub options: PlatformOptions,
}

impl PlatformConfig {
    pub fn new(platform: &str, options: &[(&str, &str)]) -> Self {
        Self {
            platform: platform.to_string(),
            options: PlatformOptions::from_pairs(options),
        }
    }

    /// Human-readable label: platform name + option map, e.g.
    /// `CPU {"Threads": "4"}` or `QUANTUM {}`.
    pub fn label(&self) -> String {
        format!("{} {}", self.platform, self.options)
    }
}

/// Outcome of benchmarking one configuration. Throughput 0.0 is the
/// sentinel for a failed or unsupported configuration.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub label: String,
    pub steps_per_sec: f64,
}

/// Benchmarks one platform configuration against the shared system.
///
/// Never fails: every error is reported to the operator and folded into a
/// `(label, 0.0)` result.
pub fn run_benchmark(
    system: &MolecularSystem,
    config: &PlatformConfig,
    step_count: usize,
) -> BenchmarkResult {
    let label = config.label();
    log::info!("benchmarking {label} ({step_count} steps)");

    match time_configuration(system, config, step_count) {
        Ok(rate) => {
            println!("{label}: {rate:.2} steps/sec");
            BenchmarkResult {
                label,
                steps_per_sec: rate,
            }
        }
        Err(e) => {
            log::error!("benchmark failed on {label}: {e}");
            println!("Error on {label}: {e}");
            BenchmarkResult {
                label,
                steps_per_sec: 0.0,
            }
        }
    }
}

/// The fallible inner path: everything from platform resolution through the
/// timed stepping loop.
fn time_configuration(
    system: &MolecularSystem,
    config: &PlatformConfig,
    step_count: usize,
) -> Result<f64> {
    if step_count == 0 {
        return Err(VeloError::config("step count must be positive"));
    }

    let platform = Platform::resolve(&config.platform, &config.options)?;
    let integrator = LangevinIntegrator::new(300.0, 1.0, 2.0);
    let mut context = SimulationContext::new(system, integrator, platform)?;

    context.set_positions(system.initial_positions())?;
    context.minimize(MINIMIZE_TOLERANCE, MINIMIZE_MAX_ITERATIONS)?;
    context.set_velocities_to_temperature(300.0);

    let start = Instant::now();
    context.step(step_count)?;
    let elapsed = start.elapsed().as_secs_f64();

    if elapsed <= 0.0 {
        return Err(VeloError::numerical("unmeasurable elapsed time"));
    }
    Ok(step_count as f64 / elapsed)
}

/// Writes the report: one `"{label}: {rate:.2} steps/sec"` line per result,
/// in input order, overwriting any existing file.
pub fn write_report(path: &Path, results: &[BenchmarkResult]) -> anyhow::Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("cannot write report to {}", path.display()))?;
    for result in results {
        writeln!(file, "{}: {:.2} steps/sec", result.label, result.steps_per_sec)?;
    }
    log::info!("wrote {} results to {}", results.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use velo_physics::StructureAtom;

    fn tiny_system() -> MolecularSystem {
        let mk = |name: &str, res: &str, id: i32, pos: [f64; 3]| StructureAtom {
            name: name.to_string(),
            residue_name: res.to_string(),
            residue_id: id,
            chain_id: 'A',
            position: pos,
        };
        let atoms = vec![
            mk("N", "GLY", 1, [0.0, 0.0, 0.0]),
            mk("CA", "GLY", 1, [1.45, 0.0, 0.0]),
            mk("C", "GLY", 1, [2.0, 1.4, 0.0]),
            mk("O", "GLY", 1, [1.4, 2.4, 0.0]),
        ];
        MolecularSystem::in_vacuo(&atoms).expect("vacuum system")
    }

    #[test]
    fn unknown_platform_yields_zero_sentinel() {
        let system = tiny_system();
        let config = PlatformConfig::new("QUANTUM", &[]);
        let result = run_benchmark(&system, &config, 100);
        assert_eq!(result.label, "QUANTUM {}");
        assert_eq!(result.steps_per_sec, 0.0);
    }

    #[test]
    fn cpu_benchmark_produces_positive_throughput() {
        let system = tiny_system();
        let config = PlatformConfig::new("CPU", &[("Threads", "1")]);
        let result = run_benchmark(&system, &config, 20);
        assert!(result.label.starts_with("CPU {"));
        assert!(result.label.contains("Threads"));
        assert!(result.steps_per_sec > 0.0, "tiny CPU run must succeed");
        assert!(result.steps_per_sec.is_finite());
    }

    #[test]
    fn zero_steps_is_a_recoverable_failure() {
        let system = tiny_system();
        let config = PlatformConfig::new("CPU", &[]);
        let result = run_benchmark(&system, &config, 0);
        assert_eq!(result.steps_per_sec, 0.0);
    }

    #[test]
    fn report_has_one_ordered_line_per_result() {
        let results = vec![
            BenchmarkResult {
                label: r#"CPU {"Threads": "1"}"#.to_string(),
                steps_per_sec: 123.456,
            },
            BenchmarkResult {
                label: "QUANTUM {}".to_string(),
                steps_per_sec: 0.0,
            },
        ];

        let path = std::env::temp_dir().join("velo_report_test.txt");
        write_report(&path, &results).expect("report writes");
        let content = std::fs::read_to_string(&path).expect("report reads");
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"CPU {"Threads": "1"}: 123.46 steps/sec"#);
        assert_eq!(lines[1], "QUANTUM {}: 0.00 steps/sec");

        std::fs::remove_file(&path).ok();
    }
}
