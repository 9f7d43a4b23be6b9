//! Solvation box builder.
//!
//! Wraps a protein in explicit TIP3P solvent: bounding box plus padding,
//! grid placement with overlap rejection, then Na+/Cl- counterions to
//! neutralize the net charge.

use velo_core::{Result, VeloError};

use crate::topology::StructureAtom;
use crate::water::{distance_sq, Ion, Water};

/// Solvation parameters.
#[derive(Debug, Clone)]
pub struct SolventConfig {
    /// Padding from protein extent to box edge (Å).
    pub padding: f64,
    /// Minimum water-oxygen to protein-atom distance (Å).
    pub min_protein_distance: f64,
    /// Minimum water-oxygen to water-oxygen distance (Å).
    pub min_water_distance: f64,
    /// Hard cap on any box edge (Å), guards against runaway atom counts.
    pub max_box_dimension: f64,
}

impl Default for SolventConfig {
    fn default() -> Self {
        Self {
            // 1.0 nm padding, the conventional choice for small proteins.
            padding: 10.0,
            min_protein_distance: 2.8,
            min_water_distance: 2.5,
            max_box_dimension: 100.0,
        }
    }
}

/// A built solvent shell: waters, counterions and box geometry.
#[derive(Debug, Clone)]
pub struct SolventBox {
    pub waters: Vec<Water>,
    pub ions: Vec<Ion>,
    /// Box edge lengths [x, y, z] (Å).
    pub dimensions: [f64; 3],
    /// Minimum corner of the box (Å).
    pub origin: [f64; 3],
}

impl SolventBox {
    /// Builds the solvent shell around the given protein atoms.
    ///
    /// `net_charge` is the protein's total charge; the box is neutralized
    /// with that many counterions of the opposite sign.
    pub fn build(
        protein: &[StructureAtom],
        net_charge: f64,
        config: &SolventConfig,
    ) -> Result<Self> {
        if protein.is_empty() {
            return Err(VeloError::topology("cannot solvate an empty structure"));
        }

        let (min_corner, max_corner) = bounding_box(protein);
        let origin = [
            min_corner[0] - config.padding,
            min_corner[1] - config.padding,
            min_corner[2] - config.padding,
        ];
        let dimensions = [
            (max_corner[0] - min_corner[0] + 2.0 * config.padding).min(config.max_box_dimension),
            (max_corner[1] - min_corner[1] + 2.0 * config.padding).min(config.max_box_dimension),
            (max_corner[2] - min_corner[2] + 2.0 * config.padding).min(config.max_box_dimension),
        ];

        log::info!(
            "solvent box: origin [{:.1}, {:.1}, {:.1}], dims [{:.1}, {:.1}, {:.1}] Å",
            origin[0], origin[1], origin[2],
            dimensions[0], dimensions[1], dimensions[2]
        );

        let mut solvent = Self {
            waters: Vec::new(),
            ions: Vec::new(),
            dimensions,
            origin,
        };
        solvent.place_waters(protein, config);
        solvent.neutralize(protein, net_charge);
        Ok(solvent)
    }

    /// Fills the box with TIP3P waters on a grid, rejecting overlaps.
    fn place_waters(&mut self, protein: &[StructureAtom], config: &SolventConfig) {
        // 3.1 Å grid spacing reproduces liquid water density
        // (0.997 g/mL → ~29.9 Å³ per molecule).
        let spacing = 3.1;

        let nx = (self.dimensions[0] / spacing).ceil() as usize;
        let ny = (self.dimensions[1] / spacing).ceil() as usize;
        let nz = (self.dimensions[2] / spacing).ceil() as usize;

        // Buffer for hydrogen extent beyond the oxygen placement point.
        const H_EXTENSION: f64 = 1.0;
        let min_protein_sq =
            (config.min_protein_distance + H_EXTENSION) * (config.min_protein_distance + H_EXTENSION);
        let min_water_sq = (config.min_water_distance + 2.0 * H_EXTENSION)
            * (config.min_water_distance + 2.0 * H_EXTENSION);

        let mut seed = 12345_u64;
        for ix in 0..nx {
            for iy in 0..ny {
                for iz in 0..nz {
                    let center = [
                        self.origin[0] + (ix as f64 + 0.5) * spacing,
                        self.origin[1] + (iy as f64 + 0.5) * spacing,
                        self.origin[2] + (iz as f64 + 0.5) * spacing,
                    ];
                    if center[0] > self.origin[0] + self.dimensions[0]
                        || center[1] > self.origin[1] + self.dimensions[1]
                        || center[2] > self.origin[2] + self.dimensions[2]
                    {
                        continue;
                    }

                    let near_protein = protein
                        .iter()
                        .any(|a| distance_sq(center, a.position) < min_protein_sq);
                    if near_protein {
                        continue;
                    }
                    let near_water = self
                        .waters
                        .iter()
                        .any(|w| distance_sq(center, w.o) < min_water_sq);
                    if near_water {
                        continue;
                    }

                    seed = seed
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    self.waters.push(Water::at_oriented(center, seed));
                }
            }
        }

        log::info!("placed {} waters ({} atoms)", self.waters.len(), self.waters.len() * 3);
    }

    /// Replaces waters with counterions until the system is neutral.
    fn neutralize(&mut self, protein: &[StructureAtom], net_charge: f64) {
        let rounded = net_charge.round() as i32;
        log::info!("protein net charge {:.2} (rounded {})", net_charge, rounded);

        let (n_sodium, n_chloride) = if rounded > 0 {
            (0, rounded as usize)
        } else {
            ((-rounded) as usize, 0)
        };

        let mut placed: Vec<[f64; 3]> = Vec::new();
        for _ in 0..n_sodium {
            if let Some(pos) = self.ion_site(protein, &placed) {
                self.ions.push(Ion::sodium(pos));
                placed.push(pos);
            }
        }
        for _ in 0..n_chloride {
            if let Some(pos) = self.ion_site(protein, &placed) {
                self.ions.push(Ion::chloride(pos));
                placed.push(pos);
            }
        }

        // Evict waters that overlap an ion. 4.5 Å accommodates the large
        // Cl- LJ minimum against water oxygen.
        let min_sq = 4.5 * 4.5;
        self.waters
            .retain(|w| !placed.iter().any(|p| distance_sq(w.o, *p) < min_sq));

        if !self.ions.is_empty() {
            log::info!("added {} Na+ / {} Cl- counterions", n_sodium, n_chloride);
        }
    }

    /// Finds a water-oxygen site suitable for ion substitution.
    fn ion_site(&self, protein: &[StructureAtom], taken: &[[f64; 3]]) -> Option<[f64; 3]> {
        let min_protein_sq = 5.0 * 5.0;
        let min_ion_sq = 4.0 * 4.0;

        self.waters
            .iter()
            .map(|w| w.o)
            .find(|&pos| {
                protein
                    .iter()
                    .all(|a| distance_sq(pos, a.position) >= min_protein_sq)
                    && taken.iter().all(|t| distance_sq(pos, *t) >= min_ion_sq)
            })
    }

    /// Total solvent atom count (3 per water + 1 per ion).
    pub fn n_atoms(&self) -> usize {
        self.waters.len() * 3 + self.ions.len()
    }

    /// Box volume (Å³).
    pub fn volume(&self) -> f64 {
        self.dimensions[0] * self.dimensions[1] * self.dimensions[2]
    }
}

fn bounding_box(atoms: &[StructureAtom]) -> ([f64; 3], [f64; 3]) {
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for atom in atoms {
        for d in 0..3 {
            min[d] = min[d].min(atom.position[d]);
            max[d] = max[d].max(atom.position[d]);
        }
    }
    (min, max)
}
