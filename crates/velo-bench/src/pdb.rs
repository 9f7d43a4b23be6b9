//! PDB structure parsing.
//!
//! Fixed-column `ATOM`/`HETATM` records only; for multi-model NMR files the
//! first model is used. Alternate locations other than blank or 'A' are
//! dropped.
//!
//! Column map (columns are 1-based in the format description):
//! 7-11 serial, 13-16 atom name, 17 altLoc, 18-20 residue name, 22 chain,
//! 23-26 residue number, 31-38/39-46/47-54 x/y/z.

use std::path::Path;

use anyhow::{bail, Context, Result};

use velo_physics::StructureAtom;

/// Loads structure atoms from a PDB file.
pub fn load_structure(path: &Path) -> Result<Vec<StructureAtom>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read PDB file {}", path.display()))?;
    let atoms = parse_structure(&content)
        .with_context(|| format!("failed to parse PDB file {}", path.display()))?;
    log::info!("loaded {} atoms from {}", atoms.len(), path.display());
    Ok(atoms)
}

/// Parses structure atoms from PDB-format text.
pub fn parse_structure(content: &str) -> Result<Vec<StructureAtom>> {
    let mut atoms = Vec::new();

    for line in content.lines() {
        if line.starts_with("ENDMDL") {
            // NMR ensembles carry one model per conformer; keep the first.
            break;
        }
        if !(line.starts_with("ATOM") || line.starts_with("HETATM")) {
            continue;
        }
        if let Some(atom) = parse_atom_line(line) {
            atoms.push(atom);
        }
    }

    if atoms.is_empty() {
        bail!("no ATOM records found");
    }
    Ok(atoms)
}

fn parse_atom_line(line: &str) -> Option<StructureAtom> {
    if line.len() < 54 {
        return None;
    }

    let alt_loc = line.chars().nth(16)?;
    if alt_loc != ' ' && alt_loc != 'A' {
        return None;
    }

    let name = line.get(12..16)?.trim().to_string();
    let residue_name = line.get(17..20)?.trim().to_string();
    let chain_id = line.chars().nth(21)?;
    let residue_id: i32 = line.get(22..26)?.trim().parse().ok()?;
    let x: f64 = line.get(30..38)?.trim().parse().ok()?;
    let y: f64 = line.get(38..46)?.trim().parse().ok()?;
    let z: f64 = line.get(46..54)?.trim().parse().ok()?;

    Some(StructureAtom {
        name,
        residue_name,
        residue_id,
        chain_id,
        position: [x, y, z],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
HEADER    DE NOVO PROTEIN
MODEL        1
ATOM      1  N   GLY A   1      -8.722   4.846   0.891  1.00  0.00           N
ATOM      2  CA  GLY A   1      -7.409   4.306   1.196  1.00  0.00           C
ATOM      3  C   GLY A   1      -7.338   2.810   0.944  1.00  0.00           C
ATOM      4  O   GLY A   1      -8.287   2.206   0.436  1.00  0.00           O
ENDMDL
MODEL        2
ATOM      1  N   GLY A   1      -9.000   5.000   1.000  1.00  0.00           N
ENDMDL
END
";

    #[test]
    fn parses_single_atom_line() {
        let line = "ATOM   4879  N   THR E 333     -34.808  16.588  48.236  1.00107.78           N  ";
        let atom = parse_atom_line(line).expect("parses");
        assert_eq!(atom.name, "N");
        assert_eq!(atom.residue_name, "THR");
        assert_eq!(atom.chain_id, 'E');
        assert_eq!(atom.residue_id, 333);
        assert!((atom.position[0] + 34.808).abs() < 1e-6);
        assert!((atom.position[2] - 48.236).abs() < 1e-6);
    }

    #[test]
    fn keeps_first_model_only() {
        let atoms = parse_structure(SAMPLE).expect("parses");
        assert_eq!(atoms.len(), 4);
        // Model 2 moves N to -9.0; we must have kept model 1.
        assert!((atoms[0].position[0] + 8.722).abs() < 1e-6);
    }

    #[test]
    fn rejects_alternate_locations() {
        let line = "ATOM      1  CB BTYR A 299       6.167  22.607  20.046  0.50  8.12           C  ";
        assert!(parse_atom_line(line).is_none());
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_structure("HEADER only\nEND\n").is_err());
    }

    #[test]
    fn short_lines_are_skipped() {
        let content = "ATOM      1  N   GLY A   1\nATOM      2  CA  GLY A   1      -7.409   4.306   1.196  1.00  0.00           C\n";
        let atoms = parse_structure(content).expect("parses");
        assert_eq!(atoms.len(), 1);
        assert_eq!(atoms[0].name, "CA");
    }
}
