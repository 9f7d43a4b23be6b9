//! Structure preparation: hydrogenation and solvation.
//!
//! Experimental structures usually omit hydrogens; they are rebuilt here
//! from the residue connectivity templates before solvation. Placement is
//! geometric (away from the parent's bonded neighbors) and deliberately
//! crude; energy minimization relaxes the exact geometry before dynamics.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use velo_physics::forcefield::partial_charge;
use velo_physics::solvate::{SolventBox, SolventConfig};
use velo_physics::topology::residue_template;
use velo_physics::{MolecularSystem, StructureAtom};

use crate::pdb;

/// Mutable structure being prepared for simulation.
pub struct Modeller {
    atoms: Vec<StructureAtom>,
}

impl Modeller {
    pub fn new(atoms: Vec<StructureAtom>) -> Self {
        Self { atoms }
    }

    pub fn atoms(&self) -> &[StructureAtom] {
        &self.atoms
    }

    /// Net charge of the current atom set (elementary charge units).
    pub fn net_charge(&self) -> f64 {
        self.atoms
            .iter()
            .map(|a| partial_charge(&a.residue_name, &a.name) as f64)
            .sum()
    }

    /// Adds hydrogens missing from the structure. Returns the count added.
    pub fn add_hydrogens(&mut self) -> usize {
        // Residues in encounter order, each with its atom indices.
        let mut order: Vec<(char, i32)> = Vec::new();
        let mut groups: HashMap<(char, i32), Vec<usize>> = HashMap::new();
        for (i, atom) in self.atoms.iter().enumerate() {
            let key = (atom.chain_id, atom.residue_id);
            if !groups.contains_key(&key) {
                order.push(key);
            }
            groups.entry(key).or_default().push(i);
        }

        let mut rebuilt: Vec<StructureAtom> = Vec::with_capacity(self.atoms.len());
        let mut added = 0;

        for key in order {
            let indices = &groups[&key];
            let res_name = self.atoms[indices[0]].residue_name.clone();

            let mut present: HashMap<&str, usize> = HashMap::new();
            for &i in indices {
                present.insert(self.atoms[i].name.as_str(), i);
            }

            for &i in indices {
                rebuilt.push(self.atoms[i].clone());
            }

            let Some(template) = residue_template(&res_name) else {
                continue;
            };

            // How many hydrogens each heavy atom already carries/receives,
            // used to fan out multiple hydrogens on one parent.
            let mut h_count: HashMap<&str, usize> = HashMap::new();

            for &(a, b) in template.bonds {
                let (h_name, heavy_name) = match (a.starts_with('H'), b.starts_with('H')) {
                    (true, false) => (a, b),
                    (false, true) => (b, a),
                    _ => continue,
                };
                if present.contains_key(h_name) {
                    *h_count.entry(heavy_name).or_default() += 1;
                    continue;
                }
                let Some(&heavy_idx) = present.get(heavy_name) else {
                    continue;
                };

                let heavy_pos = self.atoms[heavy_idx].position;
                let neighbors: Vec<[f64; 3]> = template
                    .bonds
                    .iter()
                    .filter_map(|&(x, y)| {
                        let other = if x == heavy_name {
                            y
                        } else if y == heavy_name {
                            x
                        } else {
                            return None;
                        };
                        if other.starts_with('H') {
                            return None;
                        }
                        present.get(other).map(|&j| self.atoms[j].position)
                    })
                    .collect();

                let k = {
                    let slot = h_count.entry(heavy_name).or_default();
                    let k = *slot;
                    *slot += 1;
                    k
                };
                let position =
                    place_hydrogen(heavy_pos, &neighbors, bond_length(heavy_name), k);

                let parent = &self.atoms[heavy_idx];
                rebuilt.push(StructureAtom {
                    name: h_name.to_string(),
                    residue_name: parent.residue_name.clone(),
                    residue_id: parent.residue_id,
                    chain_id: parent.chain_id,
                    position,
                });
                added += 1;
            }
        }

        self.atoms = rebuilt;
        added
    }

    /// Builds the solvent shell around the prepared structure.
    pub fn add_solvent(&self, config: &SolventConfig) -> velo_core::Result<SolventBox> {
        SolventBox::build(&self.atoms, self.net_charge(), config)
    }
}

/// Ideal X-H bond length (Å) by parent element.
fn bond_length(heavy_name: &str) -> f64 {
    match heavy_name.as_bytes().first() {
        Some(&b'N') => 1.01,
        Some(&b'O') => 0.96,
        Some(&b'S') => 1.34,
        _ => 1.09,
    }
}

/// Places a hydrogen pointing away from the parent's bonded neighbors.
///
/// `k` distinguishes multiple hydrogens on the same parent so methyl and
/// amino groups do not collapse onto one point.
fn place_hydrogen(heavy: [f64; 3], neighbors: &[[f64; 3]], length: f64, k: usize) -> [f64; 3] {
    let mut dir = if neighbors.is_empty() {
        [1.0, 0.0, 0.0]
    } else {
        let inv = 1.0 / neighbors.len() as f64;
        let centroid = neighbors.iter().fold([0.0; 3], |mut acc, p| {
            for d in 0..3 {
                acc[d] += p[d] * inv;
            }
            acc
        });
        [
            heavy[0] - centroid[0],
            heavy[1] - centroid[1],
            heavy[2] - centroid[2],
        ]
    };

    normalize(&mut dir);

    // Fan out siblings around the base direction.
    const SPREAD: [[f64; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [0.9, 0.3, 0.0],
        [-0.45, 0.78, 0.3],
        [-0.45, -0.78, -0.3],
    ];
    let offset = SPREAD[k % SPREAD.len()];
    for d in 0..3 {
        dir[d] += offset[d];
    }
    normalize(&mut dir);

    [
        heavy[0] + length * dir[0],
        heavy[1] + length * dir[1],
        heavy[2] + length * dir[2],
    ]
}

fn normalize(v: &mut [f64; 3]) {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len < 1e-10 {
        *v = [0.0, 0.0, 1.0];
    } else {
        for d in 0..3 {
            v[d] /= len;
        }
    }
}

/// Full preparation pipeline: load, hydrogenate, solvate, parameterize.
///
/// Failures here are fatal: the shared system is built exactly once,
/// before any benchmarking, and there is no fallback input.
pub fn prepare_system(path: &Path, config: &SolventConfig) -> Result<MolecularSystem> {
    let atoms = pdb::load_structure(path)?;
    let mut modeller = Modeller::new(atoms);
    let added = modeller.add_hydrogens();
    log::info!("added {added} hydrogens");

    let solvent = modeller.add_solvent(config).context("solvation failed")?;
    let system = MolecularSystem::build(modeller.atoms(), &solvent)
        .context("force-field parameterization failed")?;
    Ok(system)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(name: &str, res: &str, id: i32, pos: [f64; 3]) -> StructureAtom {
        StructureAtom {
            name: name.to_string(),
            residue_name: res.to_string(),
            residue_id: id,
            chain_id: 'A',
            position: pos,
        }
    }

    fn ala_heavy() -> Vec<StructureAtom> {
        vec![
            atom("N", "ALA", 1, [0.0, 0.0, 0.0]),
            atom("CA", "ALA", 1, [1.45, 0.0, 0.0]),
            atom("C", "ALA", 1, [2.0, 1.4, 0.0]),
            atom("O", "ALA", 1, [1.4, 2.4, 0.0]),
            atom("CB", "ALA", 1, [2.0, -0.9, 1.1]),
        ]
    }

    #[test]
    fn adds_template_hydrogens() {
        let mut modeller = Modeller::new(ala_heavy());
        let added = modeller.add_hydrogens();
        // ALA template: H on N, HA on CA, HB1-3 on CB.
        assert_eq!(added, 5);
        assert_eq!(modeller.atoms().len(), 10);

        let names: Vec<&str> = modeller.atoms().iter().map(|a| a.name.as_str()).collect();
        for expected in ["H", "HA", "HB1", "HB2", "HB3"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn hydrogens_sit_at_bond_length() {
        let mut modeller = Modeller::new(ala_heavy());
        modeller.add_hydrogens();

        let find = |name: &str| {
            modeller
                .atoms()
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.position)
                .unwrap()
        };
        let n = find("N");
        let h = find("H");
        let d = ((h[0] - n[0]).powi(2) + (h[1] - n[1]).powi(2) + (h[2] - n[2]).powi(2)).sqrt();
        assert!((d - 1.01).abs() < 1e-6, "N-H length {d}");
    }

    #[test]
    fn sibling_hydrogens_do_not_overlap() {
        let mut modeller = Modeller::new(ala_heavy());
        modeller.add_hydrogens();
        let find = |name: &str| {
            modeller
                .atoms()
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.position)
                .unwrap()
        };
        let hb1 = find("HB1");
        let hb2 = find("HB2");
        let d = ((hb1[0] - hb2[0]).powi(2)
            + (hb1[1] - hb2[1]).powi(2)
            + (hb1[2] - hb2[2]).powi(2))
        .sqrt();
        assert!(d > 0.5, "methyl hydrogens collapsed: {d} Å apart");
    }

    #[test]
    fn existing_hydrogens_are_kept_not_duplicated() {
        let mut atoms = ala_heavy();
        atoms.push(atom("H", "ALA", 1, [-0.9, 0.4, 0.0]));
        let mut modeller = Modeller::new(atoms);
        let added = modeller.add_hydrogens();
        assert_eq!(added, 4, "backbone H was already present");
        let h_count = modeller
            .atoms()
            .iter()
            .filter(|a| a.name == "H")
            .count();
        assert_eq!(h_count, 1);
    }
}
