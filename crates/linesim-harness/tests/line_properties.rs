//! Property tests: standard invariants hold for any seed and buffer sizing.

use linesim_core::{LineConfig, ProductionLine, Recorder};
use linesim_harness::{
    CheckedObserver, InvariantRegistry, PlantSnapshot, Scenario, Station, SystemSnapshot,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn invariants_hold_for_any_seed(seed in any::<u64>()) {
        let config = LineConfig { seed, horizon: 3_000, ..LineConfig::default() };
        let mut line = ProductionLine::build(config).unwrap();
        let mut observer = CheckedObserver::new(InvariantRegistry::standard());

        line.run(&mut observer).unwrap();

        prop_assert!(observer.is_clean(), "{:?}", observer.violations());
    }

    #[test]
    fn invariants_hold_with_tight_buffers(
        seed in any::<u64>(),
        finished_capacity in 1u64..4,
        transfer_capacity in 1u64..4,
    ) {
        // small buffers force blocking on full outputs
        let mut config = LineConfig { seed, horizon: 3_000, ..LineConfig::default() };
        config.finished_a.capacity = finished_capacity;
        config.finished_b.capacity = finished_capacity;
        config.raw_c.capacity = transfer_capacity;

        let outcome = Scenario::with_config(config).run();
        prop_assert!(
            outcome.is_ok(),
            "{}",
            outcome.err().map(|e| e.to_string()).unwrap_or_default()
        );
    }

    #[test]
    fn injected_breakdowns_keep_invariants(
        seed in any::<u64>(),
        times in prop::collection::vec(0u64..2_000, 1..6),
    ) {
        let mut scenario = Scenario::new().with_seed(seed).with_horizon(2_500);
        for (i, time) in times.iter().enumerate() {
            let station = [Station::A, Station::B, Station::C][i % 3];
            scenario = scenario.with_breakdown_at(*time, station);
        }

        let outcome = scenario.run();
        prop_assert!(
            outcome.is_ok(),
            "{}",
            outcome.err().map(|e| e.to_string()).unwrap_or_default()
        );
    }
}

#[test]
fn recorded_and_checked_runs_agree() {
    let config = LineConfig { seed: 99, horizon: 4_000, ..LineConfig::default() };

    let mut plain = Recorder::new();
    ProductionLine::build(config.clone()).unwrap().run(&mut plain).unwrap();

    let mut checked = CheckedObserver::wrapping(Recorder::new(), InvariantRegistry::standard());
    ProductionLine::build(config).unwrap().run(&mut checked).unwrap();

    assert!(checked.is_clean());
    assert_eq!(plain.observations(), checked.into_inner().observations());
}

#[test]
fn invariants_hold_between_coarse_checkpoints() {
    // without breakdowns every pair of checkpoints is comparable
    let mut config = LineConfig { seed: 3, horizon: 6_000, ..LineConfig::default() };
    for machine in [&mut config.machine_a, &mut config.machine_b, &mut config.machine_c] {
        machine.mttf = 1e12;
    }
    let mut line = ProductionLine::build(config).unwrap();
    let registry = InvariantRegistry::standard();

    let mut previous = PlantSnapshot::capture(line.now(), line.plant());
    for end in (500..=6_000).step_by(500) {
        line.run_until(end, &mut Recorder::new()).unwrap();
        let current = PlantSnapshot::capture(line.now(), line.plant());
        let state = SystemSnapshot::transition(previous, current.clone());
        registry.assert_all(&state, &format!("at t={end}"));
        previous = current;
    }
}
