//! Amber ff14SB parameter set.
//!
//! Atom typing, masses, partial charges, Lennard-Jones, bond, angle and
//! torsion parameters for the 20 standard amino acids plus TIP3P water and
//! Na+/Cl- counterions (Joung & Cheatham).
//!
//! References: Maier et al. (2015) JCTC (ff14SB); Jorgensen et al. (1983)
//! JCP (TIP3P); Joung & Cheatham (2008) JPCB (ion parameters).

use std::f32::consts::PI;

/// ff14SB atom types used in this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AtomType {
    N = 0,   // amide nitrogen
    H = 1,   // H on nitrogen
    CT = 2,  // sp3 aliphatic carbon
    H1 = 3,  // aliphatic H, one electron-withdrawing neighbor
    HC = 4,  // aliphatic H
    C = 5,   // carbonyl carbon
    O = 6,   // carbonyl oxygen
    O2 = 7,  // carboxylate oxygen
    N2 = 8,  // guanidinium nitrogen (ARG)
    N3 = 9,  // sp3 amino nitrogen (LYS)
    OH = 10, // hydroxyl oxygen
    HO = 11, // hydroxyl hydrogen
    S = 12,  // disulfide / thioether sulfur
    SH = 13, // thiol sulfur
    HS = 14, // thiol hydrogen
    CA = 15, // aromatic carbon
    HA = 16, // aromatic hydrogen
    HP = 17, // H on charged nitrogen
    CW = 18, // TRP 5-ring carbon next to N
    NA = 19, // protonated ring nitrogen
    NB = 20, // aromatic ring nitrogen without H
    CC = 21, // HIS ring carbon
    CR = 22, // HIS carbon between two N
    CV = 23, // HIS/TRP ring carbon
    CN = 24, // TRP junction carbon
    CB = 25, // fused-ring aromatic carbon
    OW = 26, // TIP3P oxygen
    HW = 27, // TIP3P hydrogen
    IP = 28, // Na+
    IM = 29, // Cl-
    Unknown = 255,
}

/// Harmonic bond parameter: E = k(r − r₀)².
#[derive(Debug, Clone, Copy)]
pub struct BondParam {
    /// Equilibrium length (Å).
    pub r0: f32,
    /// Force constant (kcal/mol/Å²).
    pub k: f32,
}

/// Harmonic angle parameter: E = k(θ − θ₀)².
#[derive(Debug, Clone, Copy)]
pub struct AngleParam {
    /// Equilibrium angle (radians).
    pub theta0: f32,
    /// Force constant (kcal/mol/rad²).
    pub k: f32,
}

/// Periodic torsion term: E = k(1 + cos(nφ − δ)).
#[derive(Debug, Clone, Copy)]
pub struct TorsionParam {
    pub k: f32,
    pub n: u8,
    /// Phase offset (radians).
    pub phase: f32,
}

/// Lennard-Jones parameters in Amber convention.
#[derive(Debug, Clone, Copy)]
pub struct LjParam {
    /// Well depth (kcal/mol).
    pub epsilon: f32,
    /// Half the position of the minimum (Å).
    pub rmin_half: f32,
}

fn is_water_residue(res: &str) -> bool {
    matches!(res, "WAT" | "HOH" | "SOL" | "TIP3" | "TIP3P")
}

impl AtomType {
    /// Assigns the ff14SB atom type from PDB residue and atom names.
    pub fn assign(residue: &str, atom_name: &str) -> Self {
        use AtomType::*;

        let atom = atom_name.trim();
        let res = residue.trim().to_uppercase();

        if is_water_residue(&res) {
            return if atom.starts_with('H') { HW } else { OW };
        }
        match res.as_str() {
            "NA" | "NA+" | "SOD" => return IP,
            "CL" | "CL-" | "CLA" => return IM,
            _ => {}
        }

        // Backbone, identical across residues.
        match atom {
            "N" => return N,
            "H" | "HN" => return H,
            "H1" | "H2" | "H3" => return HP, // charged N-terminus
            "CA" => return CT,
            "HA" | "HA2" | "HA3" => return H1,
            "C" => return C,
            "O" | "OXT" => return O,
            _ => {}
        }

        // Sidechain atoms that are not plain aliphatic C/H.
        if let Some(t) = Self::sidechain_override(&res, atom) {
            return t;
        }

        // Everything left is aliphatic: carbons are CT, hydrogens HC,
        // with H1 next to an electron-withdrawing neighbor.
        match atom.as_bytes().first() {
            Some(&b'C') => CT,
            Some(&b'H') => {
                if Self::h_is_polarized(&res, atom) {
                    H1
                } else {
                    HC
                }
            }
            _ => {
                log::warn!("unknown atom '{}' in residue '{}', defaulting to CT", atom, res);
                Unknown
            }
        }
    }

    /// Residue-specific atom types beyond the aliphatic default.
    fn sidechain_override(res: &str, atom: &str) -> Option<AtomType> {
        use AtomType::*;

        let t = match res {
            "PHE" => match atom {
                "CG" | "CD1" | "CD2" | "CE1" | "CE2" | "CZ" => CA,
                "HD1" | "HD2" | "HE1" | "HE2" | "HZ" => HA,
                _ => return None,
            },
            "TYR" => match atom {
                "CG" | "CD1" | "CD2" | "CE1" | "CE2" | "CZ" => CA,
                "HD1" | "HD2" | "HE1" | "HE2" => HA,
                "OH" => OH,
                "HH" => HO,
                _ => return None,
            },
            "TRP" => match atom {
                "CG" | "CD2" => CB,
                "CD1" => CW,
                "HD1" | "HE1" => H,
                "NE1" => NA,
                "CE2" => CN,
                "CE3" | "CZ2" | "CZ3" | "CH2" => CA,
                "HE3" | "HZ2" | "HZ3" | "HH2" => HA,
                _ => return None,
            },
            "SER" => match atom {
                "OG" => OH,
                "HG" => HO,
                _ => return None,
            },
            "THR" => match atom {
                "OG1" => OH,
                "HG1" => HO,
                _ => return None,
            },
            "CYS" => match atom {
                "SG" => SH,
                "HG" => HS,
                _ => return None,
            },
            "CYX" => match atom {
                "SG" => S,
                _ => return None,
            },
            "MET" => match atom {
                "SD" => S,
                _ => return None,
            },
            "ASN" => match atom {
                "CG" => C,
                "OD1" => O,
                "ND2" => N,
                "HD21" | "HD22" => H,
                _ => return None,
            },
            "GLN" => match atom {
                "CD" => C,
                "OE1" => O,
                "NE2" => N,
                "HE21" | "HE22" => H,
                _ => return None,
            },
            "ASP" => match atom {
                "CG" => C,
                "OD1" | "OD2" => O2,
                _ => return None,
            },
            "GLU" => match atom {
                "CD" => C,
                "OE1" | "OE2" => O2,
                _ => return None,
            },
            "LYS" => match atom {
                "NZ" => N3,
                "HZ1" | "HZ2" | "HZ3" => HP,
                _ => return None,
            },
            "ARG" => match atom {
                "NE" | "NH1" | "NH2" => N2,
                "HE" | "HH11" | "HH12" | "HH21" | "HH22" => H,
                "CZ" => CA,
                _ => return None,
            },
            "HIS" | "HID" | "HIE" | "HIP" => match atom {
                "CG" => CC,
                "ND1" => NA,
                "CE1" => CR,
                "NE2" => NB,
                "CD2" => CV,
                "HD1" | "HD2" | "HE1" | "HE2" => H,
                _ => return None,
            },
            _ => return None,
        };
        Some(t)
    }

    /// H1 vs HC: hydrogens on carbons bonded to N, O or S.
    fn h_is_polarized(res: &str, atom: &str) -> bool {
        matches!(
            (res, atom),
            ("SER" | "CYS" | "CYX", "HB2" | "HB3")
                | ("MET", "HB2" | "HB3" | "HG2" | "HG3" | "HE1" | "HE2" | "HE3")
                | ("THR", "HB")
        )
    }
}

/// Atomic mass in Da.
pub fn atom_mass(t: AtomType) -> f32 {
    use AtomType::*;
    match t {
        H | H1 | HC | HA | HO | HP | HS | HW => 1.008,
        C | CT | CA | CB | CC | CR | CV | CW | CN => 12.01,
        N | N2 | N3 | NA | NB => 14.01,
        O | O2 | OH => 16.00,
        OW => 15.9994,
        S | SH => 32.07,
        IP => 22.9898,
        IM => 35.453,
        Unknown => 12.01,
    }
}

/// Lennard-Jones parameters per atom type.
pub fn lj_param(t: AtomType) -> LjParam {
    use AtomType::*;
    let (epsilon, rmin_half) = match t {
        N | N2 | N3 | NA | NB => (0.170, 1.824),
        H | HP | HS => (0.0157, 0.600),
        H1 => (0.0157, 1.387),
        HC | HA => (0.0157, 1.487),
        HO => (0.0, 0.0),
        CT => (0.1094, 1.908),
        C | CA | CB | CC | CR | CV | CW | CN => (0.0860, 1.908),
        O | O2 => (0.2100, 1.661),
        OH => (0.2104, 1.721),
        S | SH => (0.2500, 2.000),
        // TIP3P oxygen; hydrogens carry a small radius for stability
        // during minimization of grid-placed solvent.
        OW => (0.1521, 1.7683),
        HW => (0.0460, 0.8000),
        IP => (0.0874393, 1.212),
        IM => (0.0355910, 2.711),
        Unknown => (0.1094, 1.908),
    };
    LjParam { epsilon, rmin_half }
}

/// ff14SB partial charge (elementary charge units) by residue + atom name.
pub fn partial_charge(residue: &str, atom_name: &str) -> f32 {
    let atom = atom_name.trim();
    let res = residue.trim().to_uppercase();

    if is_water_residue(&res) {
        return if atom.starts_with('H') { 0.417 } else { -0.834 };
    }
    match res.as_str() {
        "NA" | "NA+" | "SOD" => return 1.0,
        "CL" | "CL-" | "CLA" => return -1.0,
        _ => {}
    }

    // Backbone charges, shared by all residues.
    match atom {
        "N" => return -0.4157,
        "H" | "HN" => return 0.2719,
        "CA" => return 0.0337,
        "HA" | "HA2" | "HA3" => {
            return if res == "GLY" { 0.0698 } else { 0.0823 };
        }
        "C" => return 0.5973,
        "O" => return -0.5679,
        "OXT" => return -0.8055,
        _ => {}
    }

    match res.as_str() {
        "ALA" => match atom {
            "CB" => -0.1825,
            "HB1" | "HB2" | "HB3" => 0.0603,
            _ => 0.0,
        },
        "ARG" => match atom {
            "CB" => -0.0007,
            "HB2" | "HB3" => 0.0327,
            "CG" => 0.0390,
            "HG2" | "HG3" => 0.0285,
            "CD" => 0.0486,
            "HD2" | "HD3" => 0.0687,
            "NE" => -0.5295,
            "HE" => 0.3456,
            "CZ" => 0.8076,
            "NH1" | "NH2" => -0.8627,
            "HH11" | "HH12" | "HH21" | "HH22" => 0.4478,
            _ => 0.0,
        },
        "ASN" => match atom {
            "CB" => -0.2041,
            "HB2" | "HB3" => 0.0797,
            "CG" => 0.7130,
            "OD1" => -0.5931,
            "ND2" => -0.9191,
            "HD21" | "HD22" => 0.4196,
            _ => 0.0,
        },
        "ASP" => match atom {
            "CB" => -0.0303,
            "HB2" | "HB3" => -0.0122,
            "CG" => 0.7994,
            "OD1" | "OD2" => -0.8014,
            _ => 0.0,
        },
        "CYS" => match atom {
            "CB" => -0.1231,
            "HB2" | "HB3" => 0.1112,
            "SG" => -0.3119,
            "HG" => 0.1933,
            _ => 0.0,
        },
        "GLN" => match atom {
            "CB" => -0.0036,
            "HB2" | "HB3" => 0.0171,
            "CG" => -0.0645,
            "HG2" | "HG3" => 0.0352,
            "CD" => 0.6951,
            "OE1" => -0.6086,
            "NE2" => -0.9407,
            "HE21" | "HE22" => 0.4251,
            _ => 0.0,
        },
        "GLU" => match atom {
            "CB" => 0.0560,
            "HB2" | "HB3" => -0.0173,
            "CG" => 0.0136,
            "HG2" | "HG3" => -0.0425,
            "CD" => 0.8054,
            "OE1" | "OE2" => -0.8188,
            _ => 0.0,
        },
        "GLY" => 0.0,
        "HIS" | "HID" => match atom {
            "CB" => -0.0414,
            "HB2" | "HB3" => 0.0367,
            "CG" => -0.0012,
            "ND1" => -0.3811,
            "HD1" => 0.3649,
            "CE1" => 0.2057,
            "HE1" => 0.1392,
            "NE2" => -0.5727,
            "CD2" => 0.1292,
            "HD2" => 0.1147,
            _ => 0.0,
        },
        "HIE" => match atom {
            "CB" => -0.0581,
            "HB2" | "HB3" => 0.0367,
            "CG" => 0.1868,
            "ND1" => -0.5432,
            "CE1" => 0.1635,
            "HE1" => 0.1435,
            "NE2" => -0.2795,
            "HE2" => 0.3339,
            "CD2" => -0.2207,
            "HD2" => 0.1862,
            _ => 0.0,
        },
        "HIP" => match atom {
            "CB" => -0.0236,
            "HB2" | "HB3" => 0.0519,
            "CG" => -0.0017,
            "ND1" => -0.1513,
            "HD1" => 0.3866,
            "CE1" => -0.0170,
            "HE1" => 0.2681,
            "NE2" => -0.1718,
            "HE2" => 0.3911,
            "CD2" => -0.1141,
            "HD2" => 0.2317,
            _ => 0.0,
        },
        "ILE" => match atom {
            "CB" => 0.1303,
            "HB" => 0.0187,
            "CG1" => -0.0430,
            "HG12" | "HG13" => 0.0236,
            "CG2" => -0.3204,
            "HG21" | "HG22" | "HG23" => 0.0882,
            "CD1" => -0.0660,
            "HD11" | "HD12" | "HD13" => 0.0186,
            _ => 0.0,
        },
        "LEU" => match atom {
            "CB" => -0.2106,
            "HB2" | "HB3" => 0.0457,
            "CG" => 0.3531,
            "HG" => -0.0361,
            "CD1" | "CD2" => -0.4121,
            "HD11" | "HD12" | "HD13" | "HD21" | "HD22" | "HD23" => 0.1000,
            _ => 0.0,
        },
        "LYS" => match atom {
            "CB" => -0.0094,
            "HB2" | "HB3" => 0.0362,
            "CG" => 0.0187,
            "HG2" | "HG3" => 0.0103,
            "CD" => -0.0479,
            "HD2" | "HD3" => 0.0621,
            "CE" => -0.0143,
            "HE2" | "HE3" => 0.1135,
            "NZ" => -0.3854,
            "HZ1" | "HZ2" | "HZ3" => 0.3400,
            _ => 0.0,
        },
        "MET" => match atom {
            "CB" => 0.0342,
            "HB2" | "HB3" => 0.0241,
            "CG" => 0.0018,
            "HG2" | "HG3" => 0.0440,
            "SD" => -0.2737,
            "CE" => -0.0536,
            "HE1" | "HE2" | "HE3" => 0.0684,
            _ => 0.0,
        },
        "PHE" => match atom {
            "CB" => -0.0343,
            "HB2" | "HB3" => 0.0295,
            "CG" => 0.0118,
            "CD1" | "CD2" => -0.1256,
            "HD1" | "HD2" => 0.1330,
            "CE1" | "CE2" => -0.1704,
            "HE1" | "HE2" => 0.1430,
            "CZ" => -0.1072,
            "HZ" => 0.1297,
            _ => 0.0,
        },
        "PRO" => match atom {
            "CB" => -0.0070,
            "HB2" | "HB3" => 0.0253,
            "CG" => 0.0189,
            "HG2" | "HG3" => 0.0213,
            "CD" => 0.0192,
            "HD2" | "HD3" => 0.0391,
            _ => 0.0,
        },
        "SER" => match atom {
            "CB" => 0.2117,
            "HB2" | "HB3" => 0.0352,
            "OG" => -0.6546,
            "HG" => 0.4275,
            _ => 0.0,
        },
        "THR" => match atom {
            "CB" => 0.3654,
            "HB" => 0.0043,
            "OG1" => -0.6761,
            "HG1" => 0.4102,
            "CG2" => -0.2438,
            "HG21" | "HG22" | "HG23" => 0.0642,
            _ => 0.0,
        },
        "TRP" => match atom {
            "CB" => -0.0050,
            "HB2" | "HB3" => 0.0339,
            "CG" => -0.1415,
            "CD1" => -0.1638,
            "HD1" => 0.2062,
            "NE1" => -0.3418,
            "HE1" => 0.3412,
            "CE2" => 0.1380,
            "CZ2" => -0.2601,
            "HZ2" => 0.1572,
            "CH2" => -0.1134,
            "HH2" => 0.1417,
            "CZ3" => -0.1972,
            "HZ3" => 0.1447,
            "CE3" => -0.2387,
            "HE3" => 0.1700,
            "CD2" => 0.1243,
            _ => 0.0,
        },
        "TYR" => match atom {
            "CB" => -0.0152,
            "HB2" | "HB3" => 0.0295,
            "CG" => -0.0011,
            "CD1" | "CD2" => -0.1906,
            "HD1" | "HD2" => 0.1699,
            "CE1" | "CE2" => -0.2341,
            "HE1" | "HE2" => 0.1656,
            "CZ" => 0.3226,
            "OH" => -0.5579,
            "HH" => 0.3992,
            _ => 0.0,
        },
        "VAL" => match atom {
            "CB" => 0.2985,
            "HB" => -0.0297,
            "CG1" | "CG2" => -0.3192,
            "HG11" | "HG12" | "HG13" | "HG21" | "HG22" | "HG23" => 0.0791,
            _ => 0.0,
        },
        _ => 0.0,
    }
}

/// Canonicalizes an unordered atom-type pair by enum value.
fn ordered(a: AtomType, b: AtomType) -> (AtomType, AtomType) {
    if (a as u8) <= (b as u8) {
        (a, b)
    } else {
        (b, a)
    }
}

/// Bond parameters for a pair of atom types, if tabulated.
pub fn bond_param(type1: AtomType, type2: AtomType) -> Option<BondParam> {
    use AtomType::*;

    let (r0, k) = match ordered(type1, type2) {
        // Backbone
        (N, H) | (N, HP) => (1.010, 434.0),
        (N, CT) => (1.449, 337.0),
        (CT, C) => (1.522, 317.0),
        (C, O) => (1.229, 570.0),
        (C, O2) => (1.250, 656.0),
        (N, C) => (1.335, 490.0),
        // Aliphatic
        (CT, CT) => (1.526, 310.0),
        (CT, HC) | (CT, H1) => (1.090, 340.0),
        // Hydroxyl
        (CT, OH) => (1.410, 320.0),
        (OH, HO) => (0.960, 553.0),
        // Sulfur
        (CT, SH) => (1.810, 237.0),
        (CT, S) => (1.810, 227.0),
        (SH, HS) => (1.336, 274.0),
        (S, S) => (2.038, 166.0),
        // Aromatic
        (CA, CA) => (1.400, 469.0),
        (CA, HA) => (1.080, 367.0),
        (CT, CA) | (CT, CB) => (1.510, 317.0),
        (OH, CA) => (1.364, 450.0),
        (N2, CA) => (1.340, 481.0),
        (CA, CB) => (1.404, 469.0),
        (CB, CB) => (1.370, 520.0),
        (CN, CB) => (1.419, 447.0),
        // Charged sidechains
        (CT, N3) => (1.471, 367.0),
        (CT, N2) => (1.463, 337.0),
        (H, N2) => (1.010, 434.0),
        (N3, HP) => (1.010, 434.0),
        // Histidine ring
        (CT, CC) => (1.504, 317.0),
        (NA, CC) => (1.385, 422.0),
        (NB, CC) => (1.394, 410.0),
        (CC, CV) => (1.375, 512.0),
        (NB, CV) => (1.350, 488.0),
        (NA, CR) => (1.343, 477.0),
        (NB, CR) => (1.335, 488.0),
        (H, CR) | (H, CV) | (H, CW) => (1.080, 367.0),
        (CW, NA) => (1.381, 427.0),
        (H, NA) => (1.010, 434.0),
        // Tryptophan ring
        (CW, CB) => (1.365, 546.0),
        (CA, CN) => (1.400, 469.0),
        (NA, CN) => (1.380, 428.0),
        // TIP3P (HW-HW is the virtual pair used as a rigid-geometry reference)
        (OW, HW) => (0.9572, 553.0),
        (HW, HW) => (1.5139, 553.0),
        _ => {
            log::warn!("missing bond parameter: {:?}-{:?}", type1, type2);
            return None;
        }
    };
    Some(BondParam { r0, k })
}

/// Angle parameters for an atom-type triplet, if tabulated.
///
/// The outer pair is canonicalized by enum value, so each angle appears in
/// the table exactly once and lookups are order-insensitive.
pub fn angle_param(type1: AtomType, type2: AtomType, type3: AtomType) -> Option<AngleParam> {
    use AtomType::*;

    let (i, k_atom) = ordered(type1, type3);
    let j = type2;

    let (theta0_deg, k) = match (i, j, k_atom) {
        // Backbone
        (H, N, CT) => (118.0, 50.0),
        (CT, N, HP) => (118.0, 50.0),
        (CT, N, C) => (121.9, 50.0),
        (H, N, C) => (119.8, 50.0),
        (N, CT, C) => (110.1, 63.0),
        (N, CT, CT) => (109.7, 80.0),
        (CT, CT, C) => (111.1, 63.0),
        (CT, C, O) => (120.4, 80.0),
        (N, C, CT) => (116.6, 70.0),
        (N, C, O) => (122.9, 80.0),
        (CT, N, CT) => (118.0, 70.0),
        // Alpha and aliphatic hydrogens
        (N, CT, H1) => (109.5, 50.0),
        (H1, CT, C) => (109.5, 50.0),
        (CT, CT, H1) => (109.5, 50.0),
        (H1, CT, H1) => (109.5, 35.0),
        (N, CT, HC) => (109.5, 50.0),
        (HC, CT, C) => (109.5, 50.0),
        // Aliphatic
        (CT, CT, CT) => (109.5, 40.0),
        (CT, CT, HC) => (109.5, 50.0),
        (HC, CT, HC) => (109.5, 35.0),
        // Carboxylate
        (CT, C, O2) => (117.0, 70.0),
        (O2, C, O2) => (126.0, 80.0),
        // Hydroxyl
        (CT, CT, OH) => (109.5, 50.0),
        (CT, OH, HO) => (108.5, 55.0),
        (H1, CT, OH) => (109.5, 50.0),
        // Sulfur
        (CT, CT, SH) => (108.6, 50.0),
        (CT, SH, HS) => (96.0, 43.0),
        (CT, CT, S) => (114.7, 50.0),
        (CT, S, CT) => (98.9, 62.0),
        (CT, S, S) => (103.7, 68.0),
        (H1, CT, S) => (109.5, 50.0),
        (H1, CT, SH) => (109.5, 50.0),
        // Aromatic
        (CA, CA, CA) => (120.0, 63.0),
        (CA, CA, HA) => (120.0, 50.0),
        (CT, CA, CA) => (120.0, 70.0),
        (OH, CA, CA) => (120.0, 70.0),
        (HO, OH, CA) => (113.0, 50.0),
        (CT, CT, CA) => (109.5, 63.0),
        (HC, CT, CA) => (109.5, 50.0),
        // Charged sidechains
        (CT, CT, N3) => (111.2, 80.0),
        (CT, N3, HP) => (109.5, 50.0),
        (HP, N3, HP) => (109.5, 35.0),
        (HC, CT, N3) => (109.5, 50.0),
        (CT, CT, N2) => (111.2, 80.0),
        (H, N2, CT) => (118.4, 50.0),
        (H, N2, CA) => (120.0, 50.0),
        (N2, CA, N2) => (120.0, 70.0),
        (CT, N2, CA) => (123.2, 50.0),
        (HC, CT, N2) => (109.5, 50.0),
        (H, N2, H) => (120.0, 35.0),
        // Histidine ring
        (CT, CT, CC) => (109.5, 63.0),
        (CT, CC, NA) => (120.0, 70.0),
        (CT, CC, CV) => (120.0, 70.0),
        (CT, CC, NB) => (120.0, 70.0),
        (NA, CC, CV) => (120.0, 70.0),
        (NA, CC, NB) => (120.0, 70.0),
        (CC, NA, CR) => (105.4, 70.0),
        (H, NA, CC) => (126.4, 50.0),
        (H, NA, CR) => (128.2, 50.0),
        (NA, CR, NB) => (111.6, 70.0),
        (H, CR, NA) => (124.2, 50.0),
        (H, CR, NB) => (124.2, 50.0),
        (CC, NB, CR) => (103.8, 70.0),
        (CC, NB, CV) => (105.0, 70.0),
        (CR, NB, CV) => (110.0, 70.0),
        (H, CV, CC) => (130.0, 50.0),
        (H, CV, NB) => (120.0, 50.0),
        (NB, CV, CC) => (110.0, 70.0),
        (HC, CT, CC) => (109.5, 50.0),
        // Amide
        (H, N, H) => (120.0, 35.0),
        // Tryptophan ring system
        (CA, CB, CB) => (117.0, 63.0),
        (CA, CB, CW) => (133.0, 63.0),
        (CT, CB, CB) => (117.0, 63.0),
        (CT, CB, CW) => (126.0, 63.0),
        (CA, CB, CN) => (117.0, 63.0),
        (CN, CB, CB) => (116.0, 63.0),
        (NA, CW, CB) => (108.7, 70.0),
        (H, CW, CB) => (130.0, 50.0),
        (H, CW, NA) => (121.0, 50.0),
        (CW, NA, CN) => (111.6, 70.0),
        (H, NA, CW) => (125.0, 50.0),
        (H, NA, CN) => (123.0, 50.0),
        (CA, CN, NA) => (132.0, 70.0),
        (NA, CN, CB) => (108.0, 70.0),
        (CA, CN, CB) => (120.0, 63.0),
        (CA, CA, CN) => (120.0, 63.0),
        (CT, CT, CB) => (109.5, 63.0),
        (HC, CT, CB) => (109.5, 50.0),
        (HA, CA, CB) => (120.0, 50.0),
        (CA, CA, CB) => (120.0, 63.0),
        (HA, CA, CN) => (120.0, 50.0),
        (CW, CB, CB) => (107.0, 63.0),
        // TIP3P
        (HW, OW, HW) => (104.52, 100.0),
        _ => {
            log::warn!("missing angle parameter: {:?}-{:?}-{:?}", type1, type2, type3);
            return None;
        }
    };

    Some(AngleParam {
        theta0: theta0_deg * PI / 180.0,
        k,
    })
}

/// Torsion terms for an atom-type quartet. May be empty.
pub fn torsion_params(
    type1: AtomType,
    type2: AtomType,
    type3: AtomType,
    type4: AtomType,
) -> Vec<TorsionParam> {
    use AtomType::*;

    let deg = |d: f32| d * PI / 180.0;
    let tp = |k: f32, n: u8, phase_deg: f32| TorsionParam {
        k,
        n,
        phase: deg(phase_deg),
    };

    // Specific backbone torsions before central-bond wildcards.
    match (type1, type2, type3, type4) {
        // Phi: C-N-CA-C
        (C, N, CT, C) | (C, CT, N, C) => return vec![tp(0.0, 1, 0.0)],
        // Psi: N-CA-C-N
        (N, CT, C, N) | (N, C, CT, N) => return vec![tp(0.4, 1, 0.0), tp(2.0, 2, 180.0)],
        // Omega: CA-C-N-CA, peptide-bond planarity
        (CT, C, N, CT) | (CT, N, C, CT) => return vec![tp(2.5, 2, 180.0)],
        _ => {}
    }

    // Wildcard X-j-k-X torsions keyed on the canonicalized central bond.
    match ordered(type2, type3) {
        (N, C) => vec![tp(2.5, 2, 180.0)],
        (CT, C) => vec![tp(0.0, 2, 0.0)],
        (CT, CT) => vec![tp(0.156, 3, 0.0)],
        (N, CT) => vec![tp(0.0, 2, 0.0)],
        (CT, OH) => vec![tp(0.167, 3, 0.0)],
        (CT, SH) => vec![tp(0.75, 3, 0.0)],
        (CT, S) => vec![tp(0.333, 3, 0.0)],
        (S, S) => vec![tp(3.5, 2, 0.0), tp(0.6, 3, 0.0)],
        (CT, N3) => vec![tp(0.156, 3, 0.0)],
        (CA, CA) => vec![tp(3.625, 2, 180.0)],
        (CT, CA) => vec![tp(0.0, 2, 0.0)],
        (OH, CA) => vec![tp(0.9, 2, 180.0)],
        (NA, CC) | (NA, CR) => vec![tp(1.4, 2, 180.0)],
        (NB, CR) | (NB, CC) => vec![tp(2.4, 2, 180.0)],
        (CC, CV) => vec![tp(2.1, 2, 180.0)],
        (CW, CB) => vec![tp(5.0, 2, 180.0)],
        (CW, NA) | (NA, CN) => vec![tp(1.5, 2, 180.0)],
        (CA, CN) => vec![tp(3.625, 2, 180.0)],
        (CN, CB) => vec![tp(3.0, 2, 180.0)],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backbone_typing() {
        assert_eq!(AtomType::assign("ALA", "N"), AtomType::N);
        assert_eq!(AtomType::assign("ALA", "CA"), AtomType::CT);
        assert_eq!(AtomType::assign("ALA", "C"), AtomType::C);
        assert_eq!(AtomType::assign("ALA", "O"), AtomType::O);
        assert_eq!(AtomType::assign("GLY", "HA2"), AtomType::H1);
    }

    #[test]
    fn sidechain_typing() {
        assert_eq!(AtomType::assign("ALA", "CB"), AtomType::CT);
        assert_eq!(AtomType::assign("ALA", "HB1"), AtomType::HC);
        assert_eq!(AtomType::assign("PHE", "CG"), AtomType::CA);
        assert_eq!(AtomType::assign("PHE", "HZ"), AtomType::HA);
        assert_eq!(AtomType::assign("TYR", "OH"), AtomType::OH);
        assert_eq!(AtomType::assign("CYS", "SG"), AtomType::SH);
        assert_eq!(AtomType::assign("SER", "HB2"), AtomType::H1);
        assert_eq!(AtomType::assign("TRP", "NE1"), AtomType::NA);
        assert_eq!(AtomType::assign("LYS", "NZ"), AtomType::N3);
    }

    #[test]
    fn water_and_ion_typing() {
        assert_eq!(AtomType::assign("HOH", "O"), AtomType::OW);
        assert_eq!(AtomType::assign("WAT", "H1"), AtomType::HW);
        assert_eq!(AtomType::assign("NA", "NA"), AtomType::IP);
        assert_eq!(AtomType::assign("CL", "CL"), AtomType::IM);
    }

    #[test]
    fn backbone_bond_params() {
        let p = bond_param(AtomType::N, AtomType::CT).expect("N-CT tabulated");
        assert!((p.r0 - 1.449).abs() < 0.01);
        assert!((p.k - 337.0).abs() < 1.0);

        // Peptide bond, either argument order
        let p = bond_param(AtomType::C, AtomType::N).expect("C-N tabulated");
        assert!((p.r0 - 1.335).abs() < 0.01);
        let q = bond_param(AtomType::N, AtomType::C).expect("N-C tabulated");
        assert!((q.r0 - p.r0).abs() < 1e-6);
    }

    #[test]
    fn angle_params_symmetric_lookup() {
        let a = angle_param(AtomType::N, AtomType::CT, AtomType::C).expect("N-CA-C");
        let b = angle_param(AtomType::C, AtomType::CT, AtomType::N).expect("C-CA-N");
        assert!((a.theta0 - 110.1 * PI / 180.0).abs() < 1e-4);
        assert!((a.theta0 - b.theta0).abs() < 1e-6);
        assert!((a.k - b.k).abs() < 1e-6);
    }

    #[test]
    fn psi_torsion_has_two_terms() {
        let terms = torsion_params(AtomType::N, AtomType::CT, AtomType::C, AtomType::N);
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[1].n, 2);
    }

    #[test]
    fn charges_match_ff14sb() {
        assert!((partial_charge("ALA", "N") - (-0.4157)).abs() < 1e-4);
        assert!((partial_charge("ALA", "C") - 0.5973).abs() < 1e-4);
        assert!((partial_charge("LYS", "NZ") - (-0.3854)).abs() < 1e-4);
        assert!((partial_charge("HOH", "O") - (-0.834)).abs() < 1e-4);
    }

    #[test]
    fn glycine_alpha_hydrogen_charge() {
        assert!((partial_charge("GLY", "HA2") - 0.0698).abs() < 1e-4);
        assert!((partial_charge("ALA", "HA") - 0.0823).abs() < 1e-4);
    }
}
