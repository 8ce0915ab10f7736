//! End-to-end runs writing real files.

use std::fs;

use linesim_core::LineConfig;
use linesim_runner::{MERGED_FILE, OutputOptions, Overrides, load_config, logs::STEP_HEADER, run};

fn short_config(horizon: u64) -> LineConfig {
    load_config(None, Overrides { seed: Some(5), horizon: Some(horizon) }).unwrap()
}

#[test]
fn run_writes_every_log() {
    let dir = tempfile::tempdir().unwrap();
    let output = OutputOptions { dir: dir.path().join("logs"), merge: true };

    let report = run(short_config(1_000), &output).unwrap();
    assert_eq!(report.time, 1_000);

    for machine in ["Machine_A", "Machine_B", "Machine_C"] {
        let steps = fs::read_to_string(output.dir.join(machine).join("log.csv")).unwrap();
        let mut lines = steps.lines();
        assert_eq!(lines.next(), Some(STEP_HEADER));
        // every machine logs its first cycle start at t=0
        assert!(lines.next().is_some_and(|row| row.starts_with("0.0,")));

        let flags = fs::read_to_string(output.dir.join(machine).join("exp_prod_flag.csv")).unwrap();
        assert_eq!(flags.lines().count(), 1 + 1_001);
    }

    let merged = fs::read_to_string(output.dir.join(MERGED_FILE)).unwrap();
    let mut lines = merged.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("step,input A,"));
    assert!(header.ends_with(",flag C"));

    // time never goes back down the merged file
    let times: Vec<u64> = lines
        .map(|row| row.split(['.', ',']).next().unwrap().parse().unwrap())
        .collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(times.last(), Some(&1_000));
}

#[test]
fn no_merge_skips_timeline() {
    let dir = tempfile::tempdir().unwrap();
    let output = OutputOptions { dir: dir.path().to_path_buf(), merge: false };

    run(short_config(50), &output).unwrap();

    assert!(dir.path().join("Machine_A").join("log.csv").exists());
    assert!(!dir.path().join(MERGED_FILE).exists());
}

#[test]
fn same_seed_writes_identical_files() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    for dir in [&first, &second] {
        let output = OutputOptions { dir: dir.path().to_path_buf(), merge: true };
        run(short_config(2_000), &output).unwrap();
    }

    let read = |dir: &tempfile::TempDir| fs::read_to_string(dir.path().join(MERGED_FILE)).unwrap();
    assert_eq!(read(&first), read(&second));
}

#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("line.toml");
    fs::write(&path, "seed = 11\nhorizon = 300\n").unwrap();

    let overrides = Overrides { seed: None, horizon: Some(200) };
    let config = load_config(Some(path.as_path()), overrides).unwrap();

    assert_eq!(config.seed, 11);
    assert_eq!(config.horizon, 200);
}

#[test]
fn shipped_config_is_the_reference_line() {
    let text = include_str!("../config/line.toml");
    let config =
        linesim_runner::parse_config(text, std::path::Path::new("config/line.toml")).unwrap();
    assert_eq!(config, LineConfig::default());
}
