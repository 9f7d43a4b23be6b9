//! Physical constants and unit conversions.
//!
//! Internal unit system: lengths in Å, time in fs, masses in Da (g/mol),
//! energies in kcal/mol, charges in elementary charge units. Public
//! interfaces quote conventional MD units (K, ps⁻¹, fs, kJ/(mol·nm)) and
//! convert at the boundary.

/// Boltzmann constant in kcal/(mol·K).
pub const KB_KCAL: f64 = 0.001987204;

/// Converts kcal/(mol·Å·Da) to acceleration in Å/fs².
///
/// 1 kcal = 4184 J; expressing J/(g·Å) in Å/fs² gives
/// 4184 · 1000 · 1e-20 / 1e-30-adjusted = 4.184e-4.
pub const ACCEL_PER_FORCE: f64 = 4.184e-4;

/// Coulomb constant in kcal·Å/(mol·e²).
pub const COULOMB_KCAL: f64 = 332.0636;

/// kcal per kJ.
pub const KCAL_PER_KJ: f64 = 1.0 / 4.184;

/// Å per nm.
pub const ANGSTROM_PER_NM: f64 = 10.0;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: f64 = 1000.0;

/// Amber ff14SB 1-4 Lennard-Jones scaling factor.
pub const SCALE_14_LJ: f64 = 0.5;

/// Amber ff14SB 1-4 electrostatic scaling factor (1/1.2).
pub const SCALE_14_COUL: f64 = 0.8333333;

/// Converts a minimization tolerance quoted in kJ/(mol·nm) to the internal
/// kcal/(mol·Å) force units.
pub fn tolerance_kj_per_nm_to_internal(tol: f64) -> f64 {
    tol * KCAL_PER_KJ / ANGSTROM_PER_NM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_conversion() {
        // 1 kJ/(mol·nm) = 0.0239 kcal/(mol·Å)
        let t = tolerance_kj_per_nm_to_internal(1.0);
        assert!((t - 0.0239).abs() < 1e-4);
    }

    #[test]
    fn kb_thermal_energy_at_room_temperature() {
        // kT at 300 K ≈ 0.596 kcal/mol
        let kt = KB_KCAL * 300.0;
        assert!((kt - 0.596).abs() < 0.001);
    }
}
