//! Langevin dynamics and the per-configuration simulation context.
//!
//! The context owns all mutable simulation state (positions, velocities,
//! RNG); the [`MolecularSystem`] it is bound to stays immutable and shared.
//! One context exists per benchmark configuration and is dropped once the
//! throughput sample is recorded.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use velo_core::units::{self, ACCEL_PER_FORCE, FS_PER_PS, KB_KCAL};
use velo_core::{Result, VeloError};

use crate::forces;
use crate::platform::Platform;
use crate::system::MolecularSystem;

/// Velocity clamp (Å/fs); ~0.03 Å/fs is typical at 300 K, so this allows
/// generous headroom while stopping thermal runaway.
const MAX_VELOCITY: f64 = 0.05;

/// Stochastic Langevin integrator with fixed parameters per context.
#[derive(Debug, Clone, Copy)]
pub struct LangevinIntegrator {
    /// Bath temperature (K).
    pub temperature: f64,
    /// Friction coefficient (ps⁻¹).
    pub friction: f64,
    /// Timestep (fs).
    pub timestep: f64,
}

impl LangevinIntegrator {
    pub fn new(temperature: f64, friction: f64, timestep: f64) -> Self {
        Self {
            temperature,
            friction,
            timestep,
        }
    }
}

impl Default for LangevinIntegrator {
    fn default() -> Self {
        // 300 K, 1/ps friction, 2 fs timestep.
        Self::new(300.0, 1.0, 2.0)
    }
}

/// Transient simulation state bound to a shared immutable system.
pub struct SimulationContext<'a> {
    system: &'a MolecularSystem,
    integrator: LangevinIntegrator,
    platform: Platform,
    positions: Vec<[f64; 3]>,
    velocities: Vec<[f64; 3]>,
    rng: StdRng,
    /// Simulation time (fs).
    time: f64,
}

impl<'a> SimulationContext<'a> {
    /// Creates a context on the resolved platform.
    ///
    /// For CUDA platforms this uploads the immutable topology buffers to
    /// every bound device.
    pub fn new(
        system: &'a MolecularSystem,
        integrator: LangevinIntegrator,
        platform: Platform,
    ) -> Result<Self> {
        #[cfg(feature = "cuda")]
        let platform = {
            let mut platform = platform;
            if let Platform::Cuda(gpu) = &mut platform {
                gpu.bind_system(&system.topology)?;
            }
            platform
        };

        let n = system.n_atoms();
        Ok(Self {
            system,
            integrator,
            platform,
            positions: system.initial_positions().to_vec(),
            velocities: vec![[0.0; 3]; n],
            rng: StdRng::seed_from_u64(42),
            time: 0.0,
        })
    }

    /// Replaces the RNG seed (velocity draws and thermostat noise).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Sets particle positions (Å).
    pub fn set_positions(&mut self, positions: &[[f64; 3]]) -> Result<()> {
        if positions.len() != self.system.n_atoms() {
            return Err(VeloError::config(format!(
                "expected {} positions, got {}",
                self.system.n_atoms(),
                positions.len()
            )));
        }
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        Ok(())
    }

    /// Local energy minimization by steepest descent with backtracking.
    ///
    /// `tolerance` is quoted in kJ/(mol·nm) and converted internally; the
    /// run stops when the largest per-atom force drops below it, the trial
    /// step underflows, or `max_iterations` is reached.
    pub fn minimize(&mut self, tolerance: f64, max_iterations: usize) -> Result<()> {
        let tol = units::tolerance_kj_per_nm_to_internal(tolerance);
        let mut step: f64 = 0.01; // Å
        let mut energy = self.potential_energy();
        log::debug!("minimization start: PE = {energy:.1} kcal/mol");

        for iteration in 0..max_iterations {
            let forces = self.compute_forces()?;
            let max_f = forces
                .iter()
                .map(|f| (f[0] * f[0] + f[1] * f[1] + f[2] * f[2]).sqrt())
                .fold(0.0_f64, f64::max);

            if max_f < tol {
                log::debug!(
                    "minimization converged at iteration {iteration}: PE = {energy:.1} kcal/mol"
                );
                return Ok(());
            }

            // Trial move along the force direction, largest move = `step`.
            let trial: Vec<[f64; 3]> = self
                .positions
                .iter()
                .zip(&forces)
                .map(|(p, f)| {
                    [
                        p[0] + step * f[0] / max_f,
                        p[1] + step * f[1] / max_f,
                        p[2] + step * f[2] / max_f,
                    ]
                })
                .collect();

            let trial_energy =
                forces::potential_energy(&self.system.topology, &self.system.nonbonded, &trial);
            if trial_energy.is_nan() {
                return Err(VeloError::numerical("NaN energy during minimization"));
            }

            if trial_energy <= energy {
                self.positions = trial;
                energy = trial_energy;
                step = (step * 1.2).min(0.5);
            } else {
                step *= 0.5;
                if step < 1e-6 {
                    break;
                }
            }
        }

        log::debug!("minimization finished: PE = {energy:.1} kcal/mol");
        Ok(())
    }

    /// Draws velocities from a Maxwell-Boltzmann distribution at `temperature`.
    pub fn set_velocities_to_temperature(&mut self, temperature: f64) {
        self.velocities =
            maxwell_boltzmann(&self.system.topology.masses, temperature, &mut self.rng);
    }

    /// Advances the simulation by `n_steps` integration steps.
    pub fn step(&mut self, n_steps: usize) -> Result<()> {
        for _ in 0..n_steps {
            self.langevin_step()?;
        }
        Ok(())
    }

    /// One BAOAB Langevin step.
    fn langevin_step(&mut self) -> Result<()> {
        let dt = self.integrator.timestep;
        let gamma = self.integrator.friction / FS_PER_PS; // ps⁻¹ → fs⁻¹
        let temp = self.integrator.temperature;
        let masses = &self.system.topology.masses;
        let n = self.positions.len();

        let forces = self.compute_forces()?;

        let c1 = (-gamma * dt).exp();
        let c2 = ((1.0 - c1 * c1) * KB_KCAL * temp * ACCEL_PER_FORCE).sqrt();
        let normal = Normal::new(0.0, 1.0).unwrap();

        for i in 0..n {
            let m = masses[i] as f64;
            let inv_m = 1.0 / m;

            // B: half kick
            for d in 0..3 {
                self.velocities[i][d] += 0.5 * dt * forces[i][d] * inv_m * ACCEL_PER_FORCE;
            }
            // A: half drift
            for d in 0..3 {
                self.positions[i][d] += 0.5 * dt * self.velocities[i][d];
            }
            // O: Ornstein-Uhlenbeck thermostat
            for d in 0..3 {
                let noise: f64 = normal.sample(&mut self.rng);
                self.velocities[i][d] = c1 * self.velocities[i][d] + c2 / m.sqrt() * noise;
            }
            // A: half drift
            for d in 0..3 {
                self.positions[i][d] += 0.5 * dt * self.velocities[i][d];
            }
        }

        // B: half kick with forces at the new positions.
        let forces_new = self.compute_forces()?;
        for i in 0..n {
            let inv_m = 1.0 / masses[i] as f64;
            for d in 0..3 {
                self.velocities[i][d] += 0.5 * dt * forces_new[i][d] * inv_m * ACCEL_PER_FORCE;
            }
        }

        self.clamp_velocities();
        self.time += dt;

        if !self.positions.iter().all(|p| p.iter().all(|x| x.is_finite())) {
            return Err(VeloError::numerical(format!(
                "non-finite coordinates at t = {:.1} fs",
                self.time
            )));
        }
        Ok(())
    }

    /// Computes clamped forces on the context's platform.
    fn compute_forces(&self) -> Result<Vec<[f64; 3]>> {
        let topo = &self.system.topology;
        let nb = &self.system.nonbonded;
        let positions = &self.positions;
        let mut total = vec![[0.0_f64; 3]; positions.len()];

        forces::add_bond_forces(topo, positions, &mut total);
        forces::add_angle_forces(topo, positions, &mut total);
        forces::add_torsion_forces(topo, positions, &mut total);
        forces::add_pair14_forces(topo, nb, positions, &mut total);

        match &self.platform {
            Platform::Cpu(cpu) => {
                cpu.install(|| forces::add_nonbonded_forces(topo, nb, positions, &mut total));
            }
            #[cfg(feature = "cuda")]
            Platform::Cuda(gpu) => {
                let nonbonded = gpu.nonbonded_forces(nb, positions)?;
                for (t, f) in total.iter_mut().zip(nonbonded) {
                    for d in 0..3 {
                        t[d] += f[d];
                    }
                }
            }
        }

        forces::clamp_forces(&mut total);
        Ok(total)
    }

    /// Current potential energy (kcal/mol).
    pub fn potential_energy(&self) -> f64 {
        forces::potential_energy(&self.system.topology, &self.system.nonbonded, &self.positions)
    }

    /// Current kinetic energy (kcal/mol).
    pub fn kinetic_energy(&self) -> f64 {
        self.velocities
            .iter()
            .zip(&self.system.topology.masses)
            .map(|(v, &m)| {
                let v_sq = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
                0.5 * m as f64 * v_sq / ACCEL_PER_FORCE
            })
            .sum()
    }

    /// Instantaneous temperature (K).
    pub fn temperature(&self) -> f64 {
        let n_dof = (3 * self.positions.len()).saturating_sub(6).max(1);
        2.0 * self.kinetic_energy() / (n_dof as f64 * KB_KCAL)
    }

    /// Elapsed simulation time (fs).
    pub fn time(&self) -> f64 {
        self.time
    }

    fn clamp_velocities(&mut self) {
        const MAX_SQ: f64 = MAX_VELOCITY * MAX_VELOCITY;
        for v in &mut self.velocities {
            let v_sq = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
            if v_sq > MAX_SQ {
                let scale = MAX_VELOCITY / v_sq.sqrt();
                for d in 0..3 {
                    v[d] *= scale;
                }
            }
        }
    }
}

/// Draws per-atom velocities from the Maxwell-Boltzmann distribution and
/// removes center-of-mass drift.
pub fn maxwell_boltzmann<R: Rng>(
    masses: &[f32],
    temperature: f64,
    rng: &mut R,
) -> Vec<[f64; 3]> {
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut velocities = Vec::with_capacity(masses.len());

    for &mass in masses {
        let sigma = (KB_KCAL * temperature / mass as f64 * ACCEL_PER_FORCE).sqrt();
        velocities.push([
            sigma * normal.sample(rng),
            sigma * normal.sample(rng),
            sigma * normal.sample(rng),
        ]);
    }

    let total_mass: f64 = masses.iter().map(|&m| m as f64).sum();
    let mut com = [0.0_f64; 3];
    for (v, &m) in velocities.iter().zip(masses) {
        for d in 0..3 {
            com[d] += m as f64 * v[d];
        }
    }
    for d in 0..3 {
        com[d] /= total_mass;
    }
    for v in &mut velocities {
        for d in 0..3 {
            v[d] -= com[d];
        }
    }

    velocities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Platform, PlatformOptions};
    use crate::topology::StructureAtom;

    fn atom(name: &str, res: &str, id: i32, pos: [f64; 3]) -> StructureAtom {
        StructureAtom {
            name: name.to_string(),
            residue_name: res.to_string(),
            residue_id: id,
            chain_id: 'A',
            position: pos,
        }
    }

    fn vacuum_dipeptide() -> MolecularSystem {
        let atoms = vec![
            atom("N", "ALA", 1, [0.0, 0.0, 0.0]),
            atom("CA", "ALA", 1, [1.6, 0.0, 0.0]), // stretched N-CA
            atom("C", "ALA", 1, [2.1, 1.4, 0.0]),
            atom("O", "ALA", 1, [1.5, 2.4, 0.0]),
            atom("CB", "ALA", 1, [2.1, -0.9, 1.1]),
            atom("N", "GLY", 2, [3.4, 1.5, 0.0]),
            atom("CA", "GLY", 2, [4.1, 2.7, 0.1]),
            atom("C", "GLY", 2, [5.6, 2.6, 0.1]),
            atom("O", "GLY", 2, [6.3, 1.6, 0.0]),
        ];
        MolecularSystem::in_vacuo(&atoms).expect("vacuum system")
    }

    fn cpu_context(system: &MolecularSystem) -> SimulationContext<'_> {
        let platform = Platform::resolve("CPU", &PlatformOptions::new()).expect("CPU");
        SimulationContext::new(system, LangevinIntegrator::default(), platform)
            .expect("context")
    }

    #[test]
    fn default_integrator_parameters() {
        let li = LangevinIntegrator::default();
        assert!((li.temperature - 300.0).abs() < 1e-12);
        assert!((li.friction - 1.0).abs() < 1e-12);
        assert!((li.timestep - 2.0).abs() < 1e-12);
    }

    #[test]
    fn maxwell_boltzmann_removes_com_drift() {
        let masses = vec![12.0_f32; 64];
        let mut rng = StdRng::seed_from_u64(7);
        let velocities = maxwell_boltzmann(&masses, 300.0, &mut rng);
        assert_eq!(velocities.len(), 64);

        let mut momentum = [0.0_f64; 3];
        for (v, &m) in velocities.iter().zip(&masses) {
            for d in 0..3 {
                momentum[d] += m as f64 * v[d];
            }
        }
        for d in 0..3 {
            assert!(momentum[d].abs() < 1e-9, "COM momentum must vanish");
        }
    }

    #[test]
    fn minimization_never_raises_energy() {
        let system = vacuum_dipeptide();
        let mut ctx = cpu_context(&system);
        let before = ctx.potential_energy();
        ctx.minimize(1.0, 200).expect("minimize");
        let after = ctx.potential_energy();
        assert!(after <= before + 1e-9, "PE rose from {before} to {after}");
    }

    #[test]
    fn stepping_advances_time_and_stays_finite() {
        let system = vacuum_dipeptide();
        let mut ctx = cpu_context(&system).with_seed(11);
        ctx.minimize(1.0, 100).expect("minimize");
        ctx.set_velocities_to_temperature(300.0);
        ctx.step(25).expect("dynamics");

        assert!((ctx.time() - 50.0).abs() < 1e-9, "25 steps of 2 fs");
        assert!(ctx.potential_energy().is_finite());
        assert!(ctx.temperature().is_finite());
        assert!(ctx.temperature() >= 0.0);
    }

    #[test]
    fn set_positions_validates_length() {
        let system = vacuum_dipeptide();
        let mut ctx = cpu_context(&system);
        let err = ctx.set_positions(&[[0.0; 3]; 2]).unwrap_err();
        assert!(err.is_recoverable());
    }
}
