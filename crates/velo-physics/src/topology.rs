//! Molecular topology generation.
//!
//! Builds the complete bonded description of a protein (bonds, angles,
//! torsions, 1-4 pairs, nonbonded exclusions) from residue connectivity
//! templates, inter-residue peptide bonds and detected disulfides. Water
//! and ions are appended later by the solvation stage.

use std::collections::{HashMap, HashSet};

use velo_core::{Result, VeloError};

use crate::forcefield::{
    self, AngleParam, AtomType, BondParam, LjParam, TorsionParam,
};
use crate::water::{Ion, Tip3p};

/// One atom of the input structure (protein atoms; solvent is generated).
#[derive(Debug, Clone)]
pub struct StructureAtom {
    pub name: String,
    pub residue_name: String,
    pub residue_id: i32,
    pub chain_id: char,
    /// Position in Å.
    pub position: [f64; 3],
}

/// Intra-residue connectivity template. Atom names are canonical PDB names.
#[derive(Debug, Clone, Copy)]
pub struct ResidueTemplate {
    pub name: &'static str,
    pub bonds: &'static [(&'static str, &'static str)],
}

/// Connectivity template for the standard amino acids.
pub fn residue_template(res_name: &str) -> Option<ResidueTemplate> {
    macro_rules! template {
        ($name:expr, $bonds:expr) => {
            Some(ResidueTemplate { name: $name, bonds: $bonds })
        };
    }

    match res_name.to_uppercase().as_str() {
        "ALA" => template!("ALA", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB1"), ("CB", "HB2"), ("CB", "HB3"),
        ]),
        "ARG" => template!("ARG", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "HG2"), ("CG", "HG3"), ("CG", "CD"),
            ("CD", "HD2"), ("CD", "HD3"), ("CD", "NE"),
            ("NE", "HE"), ("NE", "CZ"), ("CZ", "NH1"), ("CZ", "NH2"),
            ("NH1", "HH11"), ("NH1", "HH12"), ("NH2", "HH21"), ("NH2", "HH22"),
        ]),
        "ASN" => template!("ASN", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "OD1"), ("CG", "ND2"), ("ND2", "HD21"), ("ND2", "HD22"),
        ]),
        "ASP" => template!("ASP", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "OD1"), ("CG", "OD2"),
        ]),
        "CYS" => template!("CYS", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "SG"), ("SG", "HG"),
        ]),
        "GLN" => template!("GLN", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "HG2"), ("CG", "HG3"), ("CG", "CD"),
            ("CD", "OE1"), ("CD", "NE2"), ("NE2", "HE21"), ("NE2", "HE22"),
        ]),
        "GLU" => template!("GLU", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "HG2"), ("CG", "HG3"), ("CG", "CD"), ("CD", "OE1"), ("CD", "OE2"),
        ]),
        "GLY" => template!("GLY", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"),
            ("CA", "HA2"), ("CA", "HA3"),
        ]),
        "HIS" | "HID" | "HIE" | "HIP" => template!("HIS", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "ND1"), ("CG", "CD2"), ("ND1", "HD1"), ("ND1", "CE1"),
            ("CE1", "HE1"), ("CE1", "NE2"), ("NE2", "CD2"), ("CD2", "HD2"),
        ]),
        "ILE" => template!("ILE", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB"), ("CB", "CG1"), ("CB", "CG2"),
            ("CG1", "HG12"), ("CG1", "HG13"), ("CG1", "CD1"),
            ("CG2", "HG21"), ("CG2", "HG22"), ("CG2", "HG23"),
            ("CD1", "HD11"), ("CD1", "HD12"), ("CD1", "HD13"),
        ]),
        "LEU" => template!("LEU", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "HG"), ("CG", "CD1"), ("CG", "CD2"),
            ("CD1", "HD11"), ("CD1", "HD12"), ("CD1", "HD13"),
            ("CD2", "HD21"), ("CD2", "HD22"), ("CD2", "HD23"),
        ]),
        "LYS" => template!("LYS", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "HG2"), ("CG", "HG3"), ("CG", "CD"),
            ("CD", "HD2"), ("CD", "HD3"), ("CD", "CE"),
            ("CE", "HE2"), ("CE", "HE3"), ("CE", "NZ"),
            ("NZ", "HZ1"), ("NZ", "HZ2"), ("NZ", "HZ3"),
        ]),
        "MET" => template!("MET", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "HG2"), ("CG", "HG3"), ("CG", "SD"), ("SD", "CE"),
            ("CE", "HE1"), ("CE", "HE2"), ("CE", "HE3"),
        ]),
        "PHE" => template!("PHE", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "CD1"), ("CG", "CD2"), ("CD1", "HD1"), ("CD1", "CE1"),
            ("CD2", "HD2"), ("CD2", "CE2"), ("CE1", "HE1"), ("CE1", "CZ"),
            ("CE2", "HE2"), ("CE2", "CZ"), ("CZ", "HZ"),
        ]),
        "PRO" => template!("PRO", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("CA", "HA"),
            ("CA", "CB"), ("N", "CD"),
            ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "HG2"), ("CG", "HG3"), ("CG", "CD"), ("CD", "HD2"), ("CD", "HD3"),
        ]),
        "SER" => template!("SER", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "OG"), ("OG", "HG"),
        ]),
        "THR" => template!("THR", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB"), ("CB", "OG1"), ("CB", "CG2"),
            ("OG1", "HG1"), ("CG2", "HG21"), ("CG2", "HG22"), ("CG2", "HG23"),
        ]),
        "TRP" => template!("TRP", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "CD1"), ("CG", "CD2"), ("CD1", "HD1"), ("CD1", "NE1"),
            ("NE1", "HE1"), ("NE1", "CE2"), ("CE2", "CZ2"), ("CE2", "CD2"),
            ("CZ2", "HZ2"), ("CZ2", "CH2"), ("CH2", "HH2"), ("CH2", "CZ3"),
            ("CZ3", "HZ3"), ("CZ3", "CE3"), ("CE3", "HE3"), ("CE3", "CD2"),
        ]),
        "TYR" => template!("TYR", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB2"), ("CB", "HB3"), ("CB", "CG"),
            ("CG", "CD1"), ("CG", "CD2"), ("CD1", "HD1"), ("CD1", "CE1"),
            ("CD2", "HD2"), ("CD2", "CE2"), ("CE1", "HE1"), ("CE1", "CZ"),
            ("CE2", "HE2"), ("CE2", "CZ"), ("CZ", "OH"), ("OH", "HH"),
        ]),
        "VAL" => template!("VAL", &[
            ("N", "CA"), ("CA", "C"), ("C", "O"), ("N", "H"), ("CA", "HA"),
            ("CA", "CB"), ("CB", "HB"), ("CB", "CG1"), ("CB", "CG2"),
            ("CG1", "HG11"), ("CG1", "HG12"), ("CG1", "HG13"),
            ("CG2", "HG21"), ("CG2", "HG22"), ("CG2", "HG23"),
        ]),
        _ => None,
    }
}

/// Complete parameterized topology of a simulatable system.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub n_atoms: usize,
    pub atom_types: Vec<AtomType>,
    pub masses: Vec<f32>,
    pub charges: Vec<f32>,
    pub lj_params: Vec<LjParam>,

    pub bonds: Vec<(u32, u32)>,
    pub bond_params: Vec<BondParam>,

    pub angles: Vec<(u32, u32, u32)>,
    pub angle_params: Vec<AngleParam>,

    pub torsions: Vec<(u32, u32, u32, u32)>,
    pub torsion_params: Vec<Vec<TorsionParam>>,

    /// 1-4 pairs, handled as a separate scaled interaction list.
    pub pairs_14: Vec<(u32, u32)>,

    /// Per-atom sorted exclusion lists covering 1-2, 1-3 AND 1-4 neighbors.
    /// The plain nonbonded loop skips everything here; 1-4 contributions are
    /// re-added with their scaling factors from `pairs_14`.
    pub excluded: Vec<Vec<u32>>,
}

impl Topology {
    /// Builds a parameterized topology from protein structure atoms.
    pub fn from_atoms(atoms: &[StructureAtom]) -> Result<Self> {
        if atoms.is_empty() {
            return Err(VeloError::topology("no atoms to parameterize"));
        }

        let mut topo = Topology {
            n_atoms: atoms.len(),
            ..Default::default()
        };

        for atom in atoms {
            let t = AtomType::assign(&atom.residue_name, &atom.name);
            topo.atom_types.push(t);
            topo.masses.push(forcefield::atom_mass(t));
            topo.charges.push(forcefield::partial_charge(&atom.residue_name, &atom.name));
            topo.lj_params.push(forcefield::lj_param(t));
        }

        let bond_set = detect_bonds(atoms)?;
        for &(a, b) in &bond_set {
            let param = forcefield::bond_param(
                topo.atom_types[a as usize],
                topo.atom_types[b as usize],
            )
            .unwrap_or(BondParam { r0: 1.5, k: 300.0 });
            topo.bonds.push((a, b));
            topo.bond_params.push(param);
        }

        // Adjacency for angle/torsion enumeration.
        let mut graph: HashMap<u32, Vec<u32>> = HashMap::new();
        for &(a, b) in &topo.bonds {
            graph.entry(a).or_default().push(b);
            graph.entry(b).or_default().push(a);
        }

        // Angles: every i-j-k with bonds i-j and j-k.
        let mut angle_set: HashSet<(u32, u32, u32)> = HashSet::new();
        for (&center, neighbors) in &graph {
            for (ni, &a) in neighbors.iter().enumerate() {
                for &c in &neighbors[ni + 1..] {
                    let (lo, hi) = if a < c { (a, c) } else { (c, a) };
                    angle_set.insert((lo, center, hi));
                }
            }
        }
        for &(a, b, c) in &angle_set {
            let param = forcefield::angle_param(
                topo.atom_types[a as usize],
                topo.atom_types[b as usize],
                topo.atom_types[c as usize],
            )
            .unwrap_or(AngleParam {
                theta0: 109.5_f32.to_radians(),
                k: 50.0,
            });
            topo.angles.push((a, b, c));
            topo.angle_params.push(param);
        }

        // Torsions: every i-j-k-l spanning the central bond j-k.
        let mut torsion_set: HashSet<(u32, u32, u32, u32)> = HashSet::new();
        for &(j, k) in &topo.bonds {
            let left: Vec<u32> = graph
                .get(&j)
                .map(|v| v.iter().copied().filter(|&x| x != k).collect())
                .unwrap_or_default();
            let right: Vec<u32> = graph
                .get(&k)
                .map(|v| v.iter().copied().filter(|&x| x != j).collect())
                .unwrap_or_default();
            for &i in &left {
                for &l in &right {
                    if i == l {
                        continue; // three-membered ring
                    }
                    let quad = if j < k { (i, j, k, l) } else { (l, k, j, i) };
                    torsion_set.insert(quad);
                }
            }
        }
        for &(a, b, c, d) in &torsion_set {
            let params = {
                let p = forcefield::torsion_params(
                    topo.atom_types[a as usize],
                    topo.atom_types[b as usize],
                    topo.atom_types[c as usize],
                    topo.atom_types[d as usize],
                );
                if p.is_empty() {
                    forcefield::torsion_params(
                        topo.atom_types[d as usize],
                        topo.atom_types[c as usize],
                        topo.atom_types[b as usize],
                        topo.atom_types[a as usize],
                    )
                } else {
                    p
                }
            };
            if params.is_empty() {
                continue; // no tabulated terms, zero contribution
            }
            topo.torsions.push((a, b, c, d));
            topo.torsion_params.push(params);
        }

        // Exclusions: 1-2 and 1-3 first.
        let mut exclusion_set: HashSet<(u32, u32)> = HashSet::new();
        for &(a, b) in &topo.bonds {
            exclusion_set.insert(sorted_pair(a, b));
        }
        for &(a, _, c) in &topo.angles {
            exclusion_set.insert(sorted_pair(a, c));
        }

        // 1-4 pairs: torsion ends not already excluded as 1-2/1-3
        // (rings collapse some torsion ends to closer neighbors).
        let mut pair_14_set: HashSet<(u32, u32)> = HashSet::new();
        for &(a, _, _, d) in &topo.torsions {
            let p = sorted_pair(a, d);
            if !exclusion_set.contains(&p) {
                pair_14_set.insert(p);
            }
        }
        topo.pairs_14 = pair_14_set.iter().copied().collect();
        topo.pairs_14.sort_unstable();

        // The nonbonded loop skips 1-4 pairs too; they come back scaled.
        exclusion_set.extend(pair_14_set);
        topo.excluded = build_exclusion_lists(atoms.len(), &exclusion_set);

        log::info!("{}", topo.summary());
        Ok(topo)
    }

    /// Appends one TIP3P water (O, H1, H2) and returns its oxygen index.
    pub fn push_water(&mut self, tip3p: &Tip3p) -> usize {
        let o = self.n_atoms;
        for (t, charge) in [
            (AtomType::OW, tip3p.o_charge),
            (AtomType::HW, tip3p.h_charge),
            (AtomType::HW, tip3p.h_charge),
        ] {
            self.atom_types.push(t);
            self.masses.push(forcefield::atom_mass(t));
            self.charges.push(charge);
            self.lj_params.push(forcefield::lj_param(t));
        }
        self.n_atoms += 3;

        // Full intramolecular exclusion: the three sites interact with the
        // rest of the system through LJ + charges only.
        let (o, h1, h2) = (o as u32, o as u32 + 1, o as u32 + 2);
        self.excluded.push(vec![h1, h2]);
        self.excluded.push(vec![o, h2]);
        self.excluded.push(vec![o, h1]);

        // Flexible TIP3P: O-H stretches and the H-O-H bend hold the
        // geometry together in place of rigid-body constraints.
        let bp = forcefield::bond_param(AtomType::OW, AtomType::HW)
            .unwrap_or(BondParam { r0: 0.9572, k: 553.0 });
        self.bonds.push((o, h1));
        self.bond_params.push(bp);
        self.bonds.push((o, h2));
        self.bond_params.push(bp);
        let ap = forcefield::angle_param(AtomType::HW, AtomType::OW, AtomType::HW)
            .unwrap_or(AngleParam {
                theta0: 104.52_f32.to_radians(),
                k: 100.0,
            });
        self.angles.push((h1, o, h2));
        self.angle_params.push(ap);

        o as usize
    }

    /// Appends a monatomic ion.
    pub fn push_ion(&mut self, ion: &Ion) {
        self.atom_types.push(ion.atom_type());
        self.masses.push(ion.mass());
        self.charges.push(ion.charge());
        self.lj_params.push(LjParam {
            epsilon: ion.epsilon(),
            rmin_half: ion.rmin_half(),
        });
        self.n_atoms += 1;
        self.excluded.push(Vec::new());
    }

    /// True if the pair is excluded from the plain nonbonded interaction.
    pub fn is_excluded(&self, i: usize, j: usize) -> bool {
        self.excluded[i].binary_search(&(j as u32)).is_ok()
    }

    /// Net charge of the system (elementary charge units).
    pub fn net_charge(&self) -> f64 {
        self.charges.iter().map(|&q| q as f64).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "topology: {} atoms, {} bonds, {} angles, {} torsions, {} 1-4 pairs",
            self.n_atoms,
            self.bonds.len(),
            self.angles.len(),
            self.torsions.len(),
            self.pairs_14.len()
        )
    }
}

fn sorted_pair(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn build_exclusion_lists(n_atoms: usize, pairs: &HashSet<(u32, u32)>) -> Vec<Vec<u32>> {
    let mut lists = vec![Vec::new(); n_atoms];
    for &(a, b) in pairs {
        lists[a as usize].push(b);
        lists[b as usize].push(a);
    }
    for list in &mut lists {
        list.sort_unstable();
    }
    lists
}

/// Detects covalent bonds: template bonds within each residue, peptide bonds
/// between consecutive residues of the same chain, and disulfide bridges
/// between CYS sulfurs closer than 2.5 Å.
fn detect_bonds(atoms: &[StructureAtom]) -> Result<Vec<(u32, u32)>> {
    let mut lookup: HashMap<(i32, char, &str), usize> = HashMap::new();
    for (i, atom) in atoms.iter().enumerate() {
        lookup.insert((atom.residue_id, atom.chain_id, atom.name.trim()), i);
    }

    let mut residues: Vec<(i32, char, &str)> = Vec::new();
    let mut seen: HashSet<(i32, char)> = HashSet::new();
    for atom in atoms {
        if seen.insert((atom.residue_id, atom.chain_id)) {
            residues.push((atom.residue_id, atom.chain_id, &atom.residue_name));
        }
    }
    residues.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut bond_set: HashSet<(u32, u32)> = HashSet::new();

    // Intra-residue bonds from templates.
    for &(res_id, chain, res_name) in &residues {
        let Some(template) = residue_template(res_name) else {
            log::warn!("no residue template for '{}', skipping its bonds", res_name);
            continue;
        };
        for &(name1, name2) in template.bonds {
            let i1 = lookup.get(&(res_id, chain, name1));
            let i2 = lookup.get(&(res_id, chain, name2));
            if let (Some(&a), Some(&b)) = (i1, i2) {
                bond_set.insert(sorted_pair(a as u32, b as u32));
            }
        }
    }

    // Peptide bonds C(i) - N(i+1) within the same chain.
    for pair in residues.windows(2) {
        let (id1, chain1, _) = pair[0];
        let (id2, chain2, _) = pair[1];
        if chain1 == chain2 && id2 == id1 + 1 {
            if let (Some(&c), Some(&n)) = (
                lookup.get(&(id1, chain1, "C")),
                lookup.get(&(id2, chain2, "N")),
            ) {
                bond_set.insert(sorted_pair(c as u32, n as u32));
            }
        }
    }

    // Disulfides: SG-SG within 2.5 Å.
    let sulfurs: Vec<usize> = atoms
        .iter()
        .enumerate()
        .filter(|(_, a)| {
            matches!(a.residue_name.as_str(), "CYS" | "CYX") && a.name.trim() == "SG"
        })
        .map(|(i, _)| i)
        .collect();
    for (si, &a) in sulfurs.iter().enumerate() {
        for &b in &sulfurs[si + 1..] {
            let d2 = distance_sq(&atoms[a].position, &atoms[b].position);
            if d2 < 2.5 * 2.5 {
                bond_set.insert(sorted_pair(a as u32, b as u32));
            }
        }
    }

    if bond_set.is_empty() {
        return Err(VeloError::topology(
            "no bonds detected; structure atoms do not match any residue template",
        ));
    }

    let mut bonds: Vec<(u32, u32)> = bond_set.into_iter().collect();
    bonds.sort_unstable();
    Ok(bonds)
}

fn distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let dz = b[2] - a[2];
    dx * dx + dy * dy + dz * dz
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

    fn dipeptide() -> Vec<StructureAtom> {
        vec![
            atom("N", "ALA", 1, [0.0, 0.0, 0.0]),
            atom("CA", "ALA", 1, [1.449, 0.0, 0.0]),
            atom("C", "ALA", 1, [2.0, 1.5, 0.0]),
            atom("O", "ALA", 1, [1.5, 2.5, 0.0]),
            atom("CB", "ALA", 1, [1.8, -0.8, 1.2]),
            atom("N", "GLY", 2, [3.3, 1.5, 0.0]),
            atom("CA", "GLY", 2, [4.0, 2.7, 0.0]),
            atom("C", "GLY", 2, [5.5, 2.7, 0.0]),
            atom("O", "GLY", 2, [6.2, 1.7, 0.0]),
        ]
    }

    #[test]
    fn dipeptide_topology() {
        let topo = Topology::from_atoms(&dipeptide()).expect("topology builds");
        assert_eq!(topo.n_atoms, 9);
        assert!(!topo.bonds.is_empty());
        assert!(!topo.angles.is_empty());
        assert!(!topo.torsions.is_empty());

        // Peptide bond C(1) at index 2 to N(2) at index 5.
        assert!(topo.bonds.contains(&(2, 5)), "missing peptide bond");

        assert_eq!(topo.atom_types[0], AtomType::N);
        assert_eq!(topo.atom_types[1], AtomType::CT);
        assert_eq!(topo.atom_types[2], AtomType::C);
    }

    #[test]
    fn bonded_pairs_are_excluded() {
        let topo = Topology::from_atoms(&dipeptide()).expect("topology builds");
        for &(a, b) in &topo.bonds {
            assert!(topo.is_excluded(a as usize, b as usize));
            assert!(topo.is_excluded(b as usize, a as usize));
        }
        for &(a, _, c) in &topo.angles {
            assert!(topo.is_excluded(a as usize, c as usize));
        }
    }

    #[test]
    fn pairs_14_not_double_counted() {
        let topo = Topology::from_atoms(&dipeptide()).expect("topology builds");
        // Every 1-4 pair must also sit in the exclusion lists (they get
        // re-added with scaling), and never coincide with a bond or angle end.
        let mut one_two_three: HashSet<(u32, u32)> = HashSet::new();
        for &(a, b) in &topo.bonds {
            one_two_three.insert(sorted_pair(a, b));
        }
        for &(a, _, c) in &topo.angles {
            one_two_three.insert(sorted_pair(a, c));
        }
        for &(a, b) in &topo.pairs_14 {
            assert!(topo.is_excluded(a as usize, b as usize));
            assert!(!one_two_three.contains(&sorted_pair(a, b)));
        }
    }

    #[test]
    fn water_and_ion_appending() {
        let mut topo = Topology::from_atoms(&dipeptide()).expect("topology builds");
        let n0 = topo.n_atoms;
        let o = topo.push_water(&Tip3p::new());
        assert_eq!(o, n0);
        assert_eq!(topo.n_atoms, n0 + 3);
        assert!(topo.is_excluded(o, o + 1));
        assert!(topo.is_excluded(o + 1, o + 2));

        topo.push_ion(&Ion::sodium([0.0; 3]));
        assert_eq!(topo.n_atoms, n0 + 4);
        assert!((topo.charges[n0 + 3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disulfide_detection() {
        let mut atoms = vec![
            atom("N", "CYS", 1, [0.0, 0.0, 0.0]),
            atom("CA", "CYS", 1, [1.4, 0.0, 0.0]),
            atom("C", "CYS", 1, [2.0, 1.4, 0.0]),
            atom("O", "CYS", 1, [1.5, 2.5, 0.0]),
            atom("CB", "CYS", 1, [2.0, -1.0, 1.0]),
            atom("SG", "CYS", 1, [3.5, -1.5, 1.5]),
        ];
        let mut second: Vec<StructureAtom> = atoms
            .iter()
            .map(|a| {
                let mut b = a.clone();
                b.residue_id = 5;
                b.position[0] += 2.0;
                b
            })
            .collect();
        // Pull the second SG within bridge distance of the first.
        second[5].position = [3.5 + 1.9, -1.5, 1.5];
        atoms.append(&mut second);

        let topo = Topology::from_atoms(&atoms).expect("topology builds");
        assert!(
            topo.bonds.contains(&(5, 11)),
            "SG-SG bridge not detected: {:?}",
            topo.bonds
        );
    }
}
