//! # velo-bench
//!
//! Measures integration throughput (steps/sec) of the velo MD engine across
//! execution platform configurations and writes a plain-text report.
//!
//! Pipeline: PDB structure → hydrogenation → TIP3P solvation → ff14SB
//! parameterization → one shared immutable [`velo_physics::MolecularSystem`]
//! → per configuration: resolve platform, minimize, thermalize, time a fixed
//! number of Langevin steps.

pub mod harness;
pub mod modeller;
pub mod pdb;

pub use harness::{run_benchmark, write_report, BenchmarkResult, PlatformConfig};
pub use modeller::{prepare_system, Modeller};
