//! Force and potential-energy kernels (CPU reference path).
//!
//! Bonded terms (bonds, angles, torsions) are cheap and stay serial; the
//! O(n²) nonbonded loop is the benchmark-dominant cost and runs
//! rayon-parallel over atoms. 1-4 pairs are excluded from the plain loop
//! and re-added from their own list with Amber scaling factors.

use rayon::prelude::*;

use velo_core::units::{COULOMB_KCAL, SCALE_14_COUL, SCALE_14_LJ};

use crate::system::NonbondedSettings;
use crate::topology::Topology;

/// Force clamp (kcal/mol/Å). Raw experimental structures can start with
/// severe close contacts; clamping keeps the first minimization steps sane.
const MAX_FORCE: f64 = 10.0;

/// rmin/2 → σ/2 conversion: σ = rmin · 2^(-1/6), so σ = rmin_half · 2^(5/6).
const RMIN_HALF_TO_SIGMA: f64 = 1.7817974362806785;

pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

fn delta(from: &[f64; 3], to: &[f64; 3]) -> [f64; 3] {
    [to[0] - from[0], to[1] - from[1], to[2] - from[2]]
}

/// Per-atom LJ parameters in σ/ε form, extracted once per force evaluation.
fn sigma_epsilon(topo: &Topology, i: usize) -> (f64, f64) {
    let p = topo.lj_params[i];
    (
        p.rmin_half as f64 * RMIN_HALF_TO_SIGMA,
        p.epsilon as f64,
    )
}

/// Adds harmonic bond forces: F = −2k(r − r₀) r̂.
pub fn add_bond_forces(topo: &Topology, positions: &[[f64; 3]], forces: &mut [[f64; 3]]) {
    for (idx, &(ai, aj)) in topo.bonds.iter().enumerate() {
        let (i, j) = (ai as usize, aj as usize);
        let p = topo.bond_params[idx];
        let r_ij = delta(&positions[i], &positions[j]);
        let dist = norm(&r_ij);
        if dist < 1e-10 {
            continue;
        }
        let mag = -2.0 * p.k as f64 * (dist - p.r0 as f64);
        for d in 0..3 {
            let f = mag * r_ij[d] / dist;
            forces[i][d] -= f;
            forces[j][d] += f;
        }
    }
}

/// Adds harmonic angle forces via the cos-gradient.
pub fn add_angle_forces(topo: &Topology, positions: &[[f64; 3]], forces: &mut [[f64; 3]]) {
    for (idx, &(ai, aj, ak)) in topo.angles.iter().enumerate() {
        let (i, j, k) = (ai as usize, aj as usize, ak as usize);
        let p = topo.angle_params[idx];

        let r_ji = delta(&positions[j], &positions[i]);
        let r_jk = delta(&positions[j], &positions[k]);
        let l1 = norm(&r_ji);
        let l2 = norm(&r_jk);
        if l1 < 1e-10 || l2 < 1e-10 {
            continue;
        }

        let cos_theta = (dot(&r_ji, &r_jk) / (l1 * l2)).clamp(-1.0, 1.0);
        let theta = cos_theta.acos();
        let dv_dtheta = 2.0 * p.k as f64 * (theta - p.theta0 as f64);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt().max(1e-10);

        for d in 0..3 {
            let grad_i = (r_jk[d] / (l1 * l2) - cos_theta * r_ji[d] / (l1 * l1)) / sin_theta;
            let grad_k = (r_ji[d] / (l1 * l2) - cos_theta * r_jk[d] / (l2 * l2)) / sin_theta;
            forces[i][d] -= dv_dtheta * grad_i;
            forces[k][d] -= dv_dtheta * grad_k;
            forces[j][d] += dv_dtheta * (grad_i + grad_k);
        }
    }
}

/// Adds periodic torsion forces.
pub fn add_torsion_forces(topo: &Topology, positions: &[[f64; 3]], forces: &mut [[f64; 3]]) {
    for (idx, &(ai, aj, ak, al)) in topo.torsions.iter().enumerate() {
        let (i, j, k, l) = (ai as usize, aj as usize, ak as usize, al as usize);

        let b1 = delta(&positions[i], &positions[j]);
        let b2 = delta(&positions[j], &positions[k]);
        let b3 = delta(&positions[k], &positions[l]);

        let n1 = cross(&b1, &b2);
        let n2 = cross(&b2, &b3);
        let n1_len = norm(&n1);
        let n2_len = norm(&n2);
        if n1_len < 1e-10 || n2_len < 1e-10 {
            continue;
        }

        let m1 = cross(&n1, &b2);
        if norm(&m1) < 1e-10 {
            continue;
        }
        let phi = dot(&m1, &n2).atan2(dot(&n1, &n2));

        let mut dv_dphi = 0.0;
        for term in &topo.torsion_params[idx] {
            let n = term.n as f64;
            dv_dphi += term.k as f64 * n * (n * phi - term.phase as f64).sin();
        }

        let b2_len = norm(&b2);
        if b2_len < 1e-10 {
            continue;
        }
        let scale = dv_dphi / (n1_len * n2_len * b2_len);
        for d in 0..3 {
            forces[i][d] -= scale * n1[d];
            forces[l][d] += scale * n2[d];
            forces[j][d] += scale * (n1[d] - n2[d]) * 0.5;
            forces[k][d] += scale * (n2[d] - n1[d]) * 0.5;
        }
    }
}

/// Soft-core LJ + Coulomb force magnitude along r̂ for one pair.
///
/// Returns the signed magnitude such that positive pushes j away from i.
fn pair_force_magnitude(
    dist_sq: f64,
    sig: f64,
    eps: f64,
    qi: f64,
    qj: f64,
    nb: &NonbondedSettings,
) -> f64 {
    let eff_sq = dist_sq.max(nb.min_dist_sq) + nb.softcore_delta_sq;
    let inv_eff = 1.0 / eff_sq.sqrt();

    let s2 = sig * sig / eff_sq;
    let t6 = s2 * s2 * s2;
    let t12 = t6 * t6;

    let dist = dist_sq.sqrt().max(0.01);
    let chain = dist * inv_eff;

    let lj = 24.0 * eps * inv_eff * (2.0 * t12 - t6) * chain;
    let coul = COULOMB_KCAL * qi * qj * inv_eff * inv_eff * chain;
    lj + coul
}

/// Soft-core LJ + Coulomb energy for one pair.
fn pair_energy(
    dist_sq: f64,
    sig: f64,
    eps: f64,
    qi: f64,
    qj: f64,
    nb: &NonbondedSettings,
) -> (f64, f64) {
    let eff_sq = dist_sq.max(nb.min_dist_sq) + nb.softcore_delta_sq;
    let s2 = sig * sig / eff_sq;
    let t6 = s2 * s2 * s2;
    let t12 = t6 * t6;
    let lj = 4.0 * eps * (t12 - t6);
    let coul = COULOMB_KCAL * qi * qj / eff_sq.sqrt();
    (lj, coul)
}

/// Adds nonbonded forces, rayon-parallel over target atoms.
///
/// Each atom accumulates its full interaction sum independently (no shared
/// writes), trading a doubled pair count for lock-free parallelism. This is
/// the loop the CPU `Threads` option actually scales.
pub fn add_nonbonded_forces(
    topo: &Topology,
    nb: &NonbondedSettings,
    positions: &[[f64; 3]],
    forces: &mut [[f64; 3]],
) {
    let cutoff_sq = nb.cutoff * nb.cutoff;
    let n = positions.len();

    let contributions: Vec<[f64; 3]> = (0..n)
        .into_par_iter()
        .map(|i| {
            let (sig_i, eps_i) = sigma_epsilon(topo, i);
            let qi = topo.charges[i] as f64;
            let pi = positions[i];
            let mut f = [0.0_f64; 3];

            for j in 0..n {
                if j == i || topo.is_excluded(i, j) {
                    continue;
                }
                let r_ij = delta(&pi, &positions[j]);
                let dist_sq = dot(&r_ij, &r_ij);
                if dist_sq > cutoff_sq {
                    continue;
                }

                let (sig_j, eps_j) = sigma_epsilon(topo, j);
                let sig = (sig_i + sig_j) / 2.0;
                let eps = (eps_i * eps_j).sqrt();
                let qj = topo.charges[j] as f64;

                let mag = pair_force_magnitude(dist_sq, sig, eps, qi, qj, nb);
                let dist = dist_sq.sqrt().max(0.01);
                for d in 0..3 {
                    // force on i points away from j for repulsive pairs
                    f[d] -= mag * r_ij[d] / dist;
                }
            }
            f
        })
        .collect();

    for (f, c) in forces.iter_mut().zip(contributions) {
        for d in 0..3 {
            f[d] += c[d];
        }
    }
}

/// Adds the scaled 1-4 interactions excluded from the plain nonbonded loop.
pub fn add_pair14_forces(
    topo: &Topology,
    nb: &NonbondedSettings,
    positions: &[[f64; 3]],
    forces: &mut [[f64; 3]],
) {
    for &(ai, aj) in &topo.pairs_14 {
        let (i, j) = (ai as usize, aj as usize);
        let (sig_i, eps_i) = sigma_epsilon(topo, i);
        let (sig_j, eps_j) = sigma_epsilon(topo, j);
        let sig = (sig_i + sig_j) / 2.0;
        let eps = (eps_i * eps_j).sqrt();
        // Scaling the charge product by √s·√s applies the 1-4 electrostatic
        // factor inside the combined LJ+Coulomb magnitude.
        let qi = topo.charges[i] as f64 * SCALE_14_COUL.sqrt();
        let qj = topo.charges[j] as f64 * SCALE_14_COUL.sqrt();

        let r_ij = delta(&positions[i], &positions[j]);
        let dist_sq = dot(&r_ij, &r_ij);
        let mag = pair_force_magnitude(dist_sq, sig, eps * SCALE_14_LJ, qi, qj, nb);
        let dist = dist_sq.sqrt().max(0.01);
        for d in 0..3 {
            let f = mag * r_ij[d] / dist;
            forces[i][d] -= f;
            forces[j][d] += f;
        }
    }
}

/// Clamps per-atom force magnitudes to [`MAX_FORCE`].
pub fn clamp_forces(forces: &mut [[f64; 3]]) {
    const MAX_SQ: f64 = MAX_FORCE * MAX_FORCE;
    for f in forces.iter_mut() {
        let mag_sq = dot(f, f);
        if mag_sq > MAX_SQ {
            let scale = MAX_FORCE / mag_sq.sqrt();
            for d in 0..3 {
                f[d] *= scale;
            }
        }
    }
}

/// Total potential energy (kcal/mol): bonded + nonbonded + scaled 1-4.
pub fn potential_energy(
    topo: &Topology,
    nb: &NonbondedSettings,
    positions: &[[f64; 3]],
) -> f64 {
    let mut energy = 0.0;

    for (idx, &(ai, aj)) in topo.bonds.iter().enumerate() {
        let p = topo.bond_params[idx];
        let r = norm(&delta(&positions[ai as usize], &positions[aj as usize]));
        energy += p.k as f64 * (r - p.r0 as f64).powi(2);
    }

    for (idx, &(ai, aj, ak)) in topo.angles.iter().enumerate() {
        let p = topo.angle_params[idx];
        let r_ji = delta(&positions[aj as usize], &positions[ai as usize]);
        let r_jk = delta(&positions[aj as usize], &positions[ak as usize]);
        let cos_theta =
            (dot(&r_ji, &r_jk) / (norm(&r_ji) * norm(&r_jk)).max(1e-10)).clamp(-1.0, 1.0);
        energy += p.k as f64 * (cos_theta.acos() - p.theta0 as f64).powi(2);
    }

    for (idx, &(ai, aj, ak, al)) in topo.torsions.iter().enumerate() {
        let b1 = delta(&positions[ai as usize], &positions[aj as usize]);
        let b2 = delta(&positions[aj as usize], &positions[ak as usize]);
        let b3 = delta(&positions[ak as usize], &positions[al as usize]);
        let n1 = cross(&b1, &b2);
        let n2 = cross(&b2, &b3);
        let m1 = cross(&n1, &b2);
        let phi = dot(&m1, &n2).atan2(dot(&n1, &n2));
        for term in &topo.torsion_params[idx] {
            let n = term.n as f64;
            energy += term.k as f64 * (1.0 + (n * phi - term.phase as f64).cos());
        }
    }

    let cutoff_sq = nb.cutoff * nb.cutoff;
    let n = positions.len();
    energy += (0..n)
        .into_par_iter()
        .map(|i| {
            let (sig_i, eps_i) = sigma_epsilon(topo, i);
            let qi = topo.charges[i] as f64;
            let mut e = 0.0;
            for j in (i + 1)..n {
                if topo.is_excluded(i, j) {
                    continue;
                }
                let dist_sq = {
                    let r = delta(&positions[i], &positions[j]);
                    dot(&r, &r)
                };
                if dist_sq > cutoff_sq {
                    continue;
                }
                let (sig_j, eps_j) = sigma_epsilon(topo, j);
                let (lj, coul) = pair_energy(
                    dist_sq,
                    (sig_i + sig_j) / 2.0,
                    (eps_i * eps_j).sqrt(),
                    qi,
                    topo.charges[j] as f64,
                    nb,
                );
                e += lj + coul;
            }
            e
        })
        .sum::<f64>();

    for &(ai, aj) in &topo.pairs_14 {
        let (i, j) = (ai as usize, aj as usize);
        let (sig_i, eps_i) = sigma_epsilon(topo, i);
        let (sig_j, eps_j) = sigma_epsilon(topo, j);
        let dist_sq = {
            let r = delta(&positions[i], &positions[j]);
            dot(&r, &r)
        };
        let (lj, coul) = pair_energy(
            dist_sq,
            (sig_i + sig_j) / 2.0,
            (eps_i * eps_j).sqrt(),
            topo.charges[i] as f64,
            topo.charges[j] as f64,
            nb,
        );
        energy += lj * SCALE_14_LJ + coul * SCALE_14_COUL;
    }

    energy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::StructureAtom;
    use crate::topology::Topology;

    fn atom(name: &str, res: &str, id: i32, pos: [f64; 3]) -> StructureAtom {
        StructureAtom {
            name: name.to_string(),
            residue_name: res.to_string(),
            residue_id: id,
            chain_id: 'A',
            position: pos,
        }
    }

    fn gly() -> (Topology, Vec<[f64; 3]>) {
        let atoms = vec![
            atom("N", "GLY", 1, [0.0, 0.0, 0.0]),
            atom("CA", "GLY", 1, [1.6, 0.0, 0.0]), // stretched N-CA bond
            atom("C", "GLY", 1, [2.1, 1.4, 0.0]),
            atom("O", "GLY", 1, [1.5, 2.4, 0.0]),
        ];
        let positions = atoms.iter().map(|a| a.position).collect();
        (Topology::from_atoms(&atoms).expect("topology"), positions)
    }

    #[test]
    fn cross_product_basis() {
        let c = cross(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!((c[2] - 1.0).abs() < 1e-12);
        assert!(c[0].abs() < 1e-12 && c[1].abs() < 1e-12);
    }

    #[test]
    fn stretched_bond_pulls_atoms_together() {
        let (topo, positions) = gly();
        let mut forces = vec![[0.0; 3]; positions.len()];
        add_bond_forces(&topo, &positions, &mut forces);
        // N-CA stretched past r0=1.449 Å: force on N points toward CA (+x).
        assert!(forces[0][0] > 0.0);
        assert!(forces[1][0] < forces[0][0]);
    }

    #[test]
    fn forces_sum_to_zero_for_bonded_terms() {
        let (topo, positions) = gly();
        let mut forces = vec![[0.0; 3]; positions.len()];
        add_bond_forces(&topo, &positions, &mut forces);
        add_angle_forces(&topo, &positions, &mut forces);
        let net: [f64; 3] = forces.iter().fold([0.0; 3], |mut acc, f| {
            for d in 0..3 {
                acc[d] += f[d];
            }
            acc
        });
        for d in 0..3 {
            assert!(net[d].abs() < 1e-8, "net bonded force must vanish");
        }
    }

    #[test]
    fn clamping_caps_magnitude() {
        let mut forces = vec![[300.0, 0.0, 0.0], [0.1, 0.1, 0.0]];
        clamp_forces(&mut forces);
        let mag = norm(&forces[0]);
        assert!(mag <= MAX_FORCE + 1e-9);
        assert!((forces[1][0] - 0.1).abs() < 1e-12, "small forces untouched");
    }

    #[test]
    fn potential_energy_is_finite() {
        let (topo, positions) = gly();
        let nb = NonbondedSettings::default();
        let e = potential_energy(&topo, &nb, &positions);
        assert!(e.is_finite());
    }

    #[test]
    fn excluded_pairs_skip_nonbonded() {
        let (topo, positions) = gly();
        let nb = NonbondedSettings::default();
        let mut forces = vec![[0.0; 3]; positions.len()];
        add_nonbonded_forces(&topo, &nb, &positions, &mut forces);
        // All four atoms are within 1-2/1-3 of each other in GLY backbone,
        // so plain nonbonded contributes nothing.
        for f in &forces {
            assert!(norm(f) < 1e-9, "excluded pair leaked into nonbonded loop");
        }
    }
}
