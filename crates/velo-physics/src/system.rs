//! The simulatable system: parameterized topology + prepared positions.

use velo_core::{Result, VeloError};

use crate::solvate::SolventBox;
use crate::topology::{StructureAtom, Topology};
use crate::water::Tip3p;

/// Nonbonded interaction settings.
///
/// The soft-core offset caps the LJ singularity for structures that start
/// from raw experimental coordinates; without it, a single close contact
/// can blow up the first few integration steps.
#[derive(Debug, Clone, Copy)]
pub struct NonbondedSettings {
    /// Interaction cutoff (Å).
    pub cutoff: f64,
    /// Soft-core offset added to r² (Å²).
    pub softcore_delta_sq: f64,
    /// Floor on effective r² (Å²).
    pub min_dist_sq: f64,
}

impl Default for NonbondedSettings {
    fn default() -> Self {
        Self {
            cutoff: 10.0,
            softcore_delta_sq: 2.0,
            min_dist_sq: 4.0,
        }
    }
}

/// An immutable, force-field-parameterized molecular system.
///
/// Built once at startup and shared read-only across all benchmark runs;
/// per-run mutable state (positions, velocities) lives in the
/// [`crate::SimulationContext`] created per platform configuration.
#[derive(Debug, Clone)]
pub struct MolecularSystem {
    pub topology: Topology,
    /// Prepared initial positions, protein first, then waters, then ions (Å).
    positions: Vec<[f64; 3]>,
    pub nonbonded: NonbondedSettings,
}

impl MolecularSystem {
    /// Assembles the full system from protein atoms and a built solvent box.
    pub fn build(protein: &[StructureAtom], solvent: &SolventBox) -> Result<Self> {
        let mut topology = Topology::from_atoms(protein)?;
        let mut positions: Vec<[f64; 3]> = protein.iter().map(|a| a.position).collect();

        let tip3p = Tip3p::new();
        for water in &solvent.waters {
            topology.push_water(&tip3p);
            positions.push(water.o);
            positions.push(water.h1);
            positions.push(water.h2);
        }
        for ion in &solvent.ions {
            topology.push_ion(ion);
            positions.push(ion.position);
        }

        if positions.len() != topology.n_atoms {
            return Err(VeloError::Internal(format!(
                "position count {} does not match topology atom count {}",
                positions.len(),
                topology.n_atoms
            )));
        }

        log::info!(
            "system assembled: {} atoms ({} protein, {} waters, {} ions)",
            topology.n_atoms,
            protein.len(),
            solvent.waters.len(),
            solvent.ions.len()
        );

        Ok(Self {
            topology,
            positions,
            nonbonded: NonbondedSettings::default(),
        })
    }

    /// Builds a system without solvent (used by engine-level tests).
    pub fn in_vacuo(protein: &[StructureAtom]) -> Result<Self> {
        let topology = Topology::from_atoms(protein)?;
        let positions = protein.iter().map(|a| a.position).collect();
        Ok(Self {
            topology,
            positions,
            nonbonded: NonbondedSettings::default(),
        })
    }

    pub fn n_atoms(&self) -> usize {
        self.topology.n_atoms
    }

    /// The prepared structure positions benchmark contexts start from.
    pub fn initial_positions(&self) -> &[[f64; 3]] {
        &self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvate::{SolventBox, SolventConfig};

    fn atom(name: &str, res: &str, id: i32, pos: [f64; 3]) -> StructureAtom {
        StructureAtom {
            name: name.to_string(),
            residue_name: res.to_string(),
            residue_id: id,
            chain_id: 'A',
            position: pos,
        }
    }

    #[test]
    fn solvated_system_counts_line_up() {
        let protein = vec![
            atom("N", "GLY", 1, [0.0, 0.0, 0.0]),
            atom("CA", "GLY", 1, [1.45, 0.0, 0.0]),
            atom("C", "GLY", 1, [2.0, 1.4, 0.0]),
            atom("O", "GLY", 1, [1.5, 2.4, 0.0]),
        ];
        let config = SolventConfig {
            padding: 6.0,
            max_box_dimension: 18.0,
            ..Default::default()
        };
        let net = protein
            .iter()
            .map(|a| crate::forcefield::partial_charge(&a.residue_name, &a.name) as f64)
            .sum();
        let solvent = SolventBox::build(&protein, net, &config).expect("solvent");
        let system = MolecularSystem::build(&protein, &solvent).expect("system");

        assert_eq!(system.n_atoms(), 4 + solvent.n_atoms());
        assert_eq!(system.initial_positions().len(), system.n_atoms());
        assert_eq!(system.topology.charges.len(), system.n_atoms());
        assert_eq!(system.topology.lj_params.len(), system.n_atoms());
    }
}
