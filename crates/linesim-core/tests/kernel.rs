//! Scheduler ordering and interrupt accounting properties.

use std::{cell::RefCell, rc::Rc};

use linesim_core::{
    Context, Delivery, FixedSampler, Interrupt, Machine, MachinePorts, MachineSettings,
    NullObserver, Plant, Process, ProcessId, Recorder, ScriptedSampler, SimError, SimTime,
    Simulation, StepCode, Wake, Yield,
};
use proptest::prelude::*;

/// Waits once for `delay`, then logs its wake-up.
struct Sleeper {
    name: String,
    delay: SimTime,
    log: Rc<RefCell<Vec<(usize, SimTime)>>>,
}

impl Process for Sleeper {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        match wake {
            Wake::Start => Ok(Yield::timeout(self.delay)),
            _ => {
                self.log.borrow_mut().push((ctx.me().index(), ctx.now()));
                Ok(Yield::Finished)
            },
        }
    }
}

fn machine_rig(
    process_time: SimTime,
    repairs: Vec<SimTime>,
) -> (Simulation, MachinePorts, ProcessId) {
    let mut plant = Plant::new();
    let input = plant.add_container("input", 100, 100).unwrap();
    let output = plant.add_container("output", 100, 0).unwrap();
    let machine = plant.add_machine("Machine P");
    let ports = MachinePorts { machine, input, output };

    let mut sim = Simulation::new(plant);
    let pid = sim.spawn(Box::new(Machine::new(
        "Machine P",
        ports,
        MachineSettings::default(),
        Box::new(FixedSampler(process_time)),
        Box::new(ScriptedSampler::new("repair", repairs)),
    )));

    (sim, ports, pid)
}

#[test]
fn reference_interrupt_scenario() {
    // D=10, interrupted after E=4, repair 3: done 13 ticks after processing starts
    let (mut sim, ports, pid) = machine_rig(10, vec![3]);
    let mut recorder = Recorder::new();

    sim.run_until(1 + 4, &mut recorder).unwrap();
    assert_eq!(sim.interrupt(pid, Interrupt::Breakdown), Delivery::Delivered { elapsed: 4 });
    sim.run_until(40, &mut recorder).unwrap();

    let completed: Vec<_> = recorder
        .steps(ports.machine)
        .filter(|r| r.code == StepCode::PartCompleted)
        .map(|r| r.time)
        .collect();
    assert_eq!(completed.first(), Some(&(1 + 13)));

    // every restart of processing logs what was left
    let restarts: Vec<_> = recorder
        .steps(ports.machine)
        .filter(|r| r.code == StepCode::ProcessingStarted && r.time < 14)
        .map(|r| (r.time, r.remaining))
        .collect();
    assert_eq!(restarts, vec![(1, 10), (8, 6)]);
}

#[test]
fn repeated_interrupts_in_one_phase_accumulate() {
    let (mut sim, ports, pid) = machine_rig(10, vec![2, 5]);
    let mut recorder = Recorder::new();

    // processing starts at t=1: 3 ticks done, repair 2, 4 more ticks, repair 5
    sim.run_until(4, &mut recorder).unwrap();
    sim.interrupt(pid, Interrupt::Breakdown);
    sim.run_until(10, &mut recorder).unwrap();
    assert_eq!(sim.interrupt(pid, Interrupt::Breakdown), Delivery::Delivered { elapsed: 4 });
    sim.run_until(40, &mut recorder).unwrap();

    let completed = recorder
        .steps(ports.machine)
        .find(|r| r.code == StepCode::PartCompleted)
        .map(|r| r.time);
    assert_eq!(completed, Some(1 + 10 + 2 + 5));

    let status = sim.plant().machine(ports.machine);
    assert_eq!(status.breakdowns, 2);
    assert_eq!(status.downtime, 7);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn equal_times_resume_in_schedule_order(delays in prop::collection::vec(0u64..8, 1..24)) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut sim = Simulation::new(Plant::new());
        for (i, &delay) in delays.iter().enumerate() {
            let name = format!("sleeper {i}");
            sim.spawn(Box::new(Sleeper { name, delay, log: Rc::clone(&log) }));
        }
        sim.run_until(100, &mut NullObserver).unwrap();

        let mut expected: Vec<_> = delays.iter().copied().enumerate().collect();
        expected.sort_by_key(|&(_, delay)| delay);

        prop_assert_eq!(log.borrow().clone(), expected);
    }

    #[test]
    fn interrupted_phase_resumes_with_exact_remainder(
        duration in 2u64..200,
        elapsed_fraction in 0.0f64..1.0,
        repair in 0u64..50,
    ) {
        let elapsed = 1 + ((duration - 1) as f64 * elapsed_fraction) as u64;
        prop_assume!(elapsed < duration);

        let (mut sim, ports, pid) = machine_rig(duration, vec![repair]);
        let mut recorder = Recorder::new();

        sim.run_until(1 + elapsed, &mut recorder).unwrap();
        prop_assert_eq!(sim.interrupt(pid, Interrupt::Breakdown), Delivery::Delivered { elapsed });
        sim.run_until(1 + duration + repair, &mut recorder).unwrap();

        let completed = recorder
            .steps(ports.machine)
            .find(|r| r.code == StepCode::PartCompleted)
            .map(|r| r.time);
        prop_assert_eq!(completed, Some(1 + duration + repair));
    }
}
