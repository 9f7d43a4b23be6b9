//! End-to-end sweep: inline dipeptide PDB → hydrogenation → solvation →
//! parameterization → benchmark loop over good and bad platforms → report.

use std::fmt::Write as _;

use velo_bench::harness::{run_benchmark, write_report, PlatformConfig};
use velo_bench::modeller::Modeller;
use velo_bench::pdb;
use velo_physics::solvate::SolventConfig;
use velo_physics::MolecularSystem;

fn pdb_line(serial: usize, name: &str, res: &str, resid: i32, pos: [f64; 3]) -> String {
    format!(
        "ATOM  {serial:>5} {name:<4} {res:<3} A{resid:>4}    {:>8.3}{:>8.3}{:>8.3}  1.00  0.00",
        pos[0], pos[1], pos[2]
    )
}

fn dipeptide_pdb() -> String {
    let atoms = [
        (1, "N", "ALA", 1, [0.000, 0.000, 0.000]),
        (2, "CA", "ALA", 1, [1.458, 0.000, 0.000]),
        (3, "C", "ALA", 1, [2.009, 1.420, 0.000]),
        (4, "O", "ALA", 1, [1.383, 2.339, 0.530]),
        (5, "CB", "ALA", 1, [2.010, -0.900, 1.150]),
        (6, "N", "GLY", 2, [3.332, 1.536, 0.000]),
        (7, "CA", "GLY", 2, [3.992, 2.807, 0.120]),
        (8, "C", "GLY", 2, [5.480, 2.700, 0.100]),
        (9, "O", "GLY", 2, [6.150, 1.700, 0.000]),
    ];
    let mut out = String::new();
    for (serial, name, res, resid, pos) in atoms {
        writeln!(out, "{}", pdb_line(serial, name, res, resid, pos)).unwrap();
    }
    out.push_str("END\n");
    out
}

fn build_test_system() -> MolecularSystem {
    let atoms = pdb::parse_structure(&dipeptide_pdb()).expect("dipeptide parses");
    let mut modeller = Modeller::new(atoms);
    let added = modeller.add_hydrogens();
    assert!(added > 0, "heavy-atom-only input must gain hydrogens");

    // Small box keeps the sweep fast while still exercising solvation.
    let config = SolventConfig {
        padding: 4.0,
        max_box_dimension: 14.0,
        ..Default::default()
    };
    let solvent = modeller.add_solvent(&config).expect("solvation");
    MolecularSystem::build(modeller.atoms(), &solvent).expect("parameterization")
}

#[test]
fn sweep_reports_every_configuration_in_order() {
    let system = build_test_system();

    let configs = vec![
        PlatformConfig::new("CPU", &[("Threads", "1")]),
        PlatformConfig::new("QUANTUM", &[]),
        PlatformConfig::new("OpenCL", &[("DeviceIndex", "0"), ("Precision", "single")]),
    ];

    let results: Vec<_> = configs
        .iter()
        .map(|config| run_benchmark(&system, config, 30))
        .collect();

    // A bad platform mid-list must not stop the sweep.
    assert_eq!(results.len(), 3);
    assert!(
        results[0].steps_per_sec > 0.0,
        "CPU run failed: {:?}",
        results[0]
    );
    assert!(results[0].steps_per_sec.is_finite());
    assert_eq!(results[1].steps_per_sec, 0.0);
    assert_eq!(results[1].label, "QUANTUM {}");
    assert_eq!(results[2].steps_per_sec, 0.0);

    let path = std::env::temp_dir().join("velo_platform_sweep.txt");
    write_report(&path, &results).expect("report");
    let content = std::fs::read_to_string(&path).expect("read back");
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines.len(), results.len(), "one line per configuration");

    // CPU {"Threads": "1"}: <rate with two decimals> steps/sec
    let cpu_line = lines[0];
    let prefix = r#"CPU {"Threads": "1"}: "#;
    assert!(cpu_line.starts_with(prefix), "unexpected line: {cpu_line}");
    assert!(cpu_line.ends_with(" steps/sec"));
    let rate_text = &cpu_line[prefix.len()..cpu_line.len() - " steps/sec".len()];
    let rate: f64 = rate_text.parse().expect("rate parses");
    assert!(rate > 0.0);
    let decimals = rate_text.split('.').nth(1).expect("decimal point");
    assert_eq!(decimals.len(), 2, "two decimal places: {rate_text}");

    assert_eq!(lines[1], "QUANTUM {}: 0.00 steps/sec");
    assert_eq!(
        lines[2],
        r#"OpenCL {"DeviceIndex": "0", "Precision": "single"}: 0.00 steps/sec"#
    );

    std::fs::remove_file(&path).ok();
}

#[test]
fn repeated_cpu_runs_stay_finite_and_nonnegative() {
    let system = build_test_system();
    let config = PlatformConfig::new("CPU", &[("Threads", "2")]);

    let mut rates = Vec::new();
    for _ in 0..2 {
        let result = run_benchmark(&system, &config, 20);
        assert!(result.steps_per_sec.is_finite());
        assert!(result.steps_per_sec >= 0.0);
        rates.push(result.steps_per_sec);
    }
    assert!(rates.iter().all(|&r| r > 0.0), "CPU runs must succeed: {rates:?}");
}
