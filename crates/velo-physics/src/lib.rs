//! # velo-physics
//!
//! The simulation engine behind the velo platform benchmark: an Amber
//! ff14SB force field with explicit TIP3P solvent, a Langevin (BAOAB)
//! integrator, a local energy minimizer, and pluggable execution platforms
//! (multi-threaded CPU, CUDA multi-device behind the `cuda` feature).
//!
//! The benchmark harness only touches the outer seam:
//! [`MolecularSystem`] (built once, immutable) → [`Platform::resolve`] →
//! [`SimulationContext`] (per-configuration, transient).

pub mod dynamics;
pub mod forcefield;
pub mod forces;
pub mod platform;
pub mod solvate;
pub mod system;
pub mod topology;
pub mod water;

#[cfg(feature = "cuda")]
pub mod cuda;

pub use dynamics::{LangevinIntegrator, SimulationContext};
pub use platform::{Platform, PlatformOptions};
pub use solvate::{SolventBox, SolventConfig};
pub use system::MolecularSystem;
pub use topology::{StructureAtom, Topology};
