//! Cooperative scheduler.
//!
//! `Simulation` owns the clock, the process table and the plant. Each call to
//! [`Simulation::step`] pops one due event, resumes its target, and then
//! applies the step's side effects in a fixed order:
//!
//! 1. the yielded wait is scheduled (or the process is marked finished)
//! 2. observations are handed to the observer in emission order
//! 3. queued interrupts are delivered in issue order
//! 4. the observer's `after_step` hook sees the plant
//!
//! Processes are never preempted. The only way a suspended process wakes early
//! is an interrupt aimed at an interruptible wait.

use tracing::{debug, trace};

use crate::{
    clock::{Clock, EventToken, SimTime},
    error::SimError,
    plant::Plant,
    process::{Context, Interrupt, Process, ProcessId, Wake, Yield},
    record::Observer,
};

/// Outcome of an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The target's wait was cut short after `elapsed` ticks.
    Delivered {
        /// Ticks the target had waited
        elapsed: SimTime,
    },
    /// The target was not in an interruptible wait; nothing happened.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessState {
    Ready { token: EventToken },
    Running,
    Waiting { since: SimTime, token: EventToken, interruptible: bool },
    Interrupted { elapsed: SimTime, cause: Interrupt, token: EventToken },
    Finished,
}

struct ProcessSlot {
    process: Box<dyn Process>,
    state: ProcessState,
}

/// Discrete-event simulation over a [`Plant`].
pub struct Simulation {
    clock: Clock,
    plant: Plant,
    processes: Vec<ProcessSlot>,
    steps: u64,
}

impl Simulation {
    /// Simulation at time zero over `plant`, with no processes.
    pub fn new(plant: Plant) -> Self {
        Self { clock: Clock::new(), plant, processes: Vec::new(), steps: 0 }
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Shared plant state.
    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    /// Shared plant state, for setup and tests.
    pub fn plant_mut(&mut self) -> &mut Plant {
        &mut self.plant
    }

    /// Scheduler steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of spawned processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Name of a spawned process.
    pub fn process_name(&self, id: ProcessId) -> Option<&str> {
        self.processes.get(id.index()).map(|slot| slot.process.name())
    }

    /// Whether a process has returned [`Yield::Finished`].
    pub fn is_finished(&self, id: ProcessId) -> bool {
        self.processes.get(id.index()).is_some_and(|slot| slot.state == ProcessState::Finished)
    }

    /// Live events in the queue.
    pub fn pending_events(&self) -> usize {
        self.clock.pending()
    }

    /// Add a process. It first runs with [`Wake::Start`] at the current time,
    /// after everything already scheduled for that time.
    pub fn spawn(&mut self, process: Box<dyn Process>) -> ProcessId {
        let id = ProcessId::new(self.processes.len());
        let token = self.clock.schedule(id, 0);

        debug!(process = %id, name = process.name(), time = self.clock.now(), "spawned");
        self.processes.push(ProcessSlot { process, state: ProcessState::Ready { token } });

        id
    }

    /// Interrupt `target`.
    ///
    /// A target suspended in an interruptible wait has that wait cancelled
    /// and resumes at the current time, ahead of every normal event due now,
    /// with [`Wake::Interrupted`]. In every other state the interrupt is dropped.
    pub fn interrupt(&mut self, target: ProcessId, cause: Interrupt) -> Delivery {
        let now = self.clock.now();
        let Some(slot) = self.processes.get_mut(target.index()) else {
            debug!(process = %target, ?cause, "interrupt for unknown process dropped");
            return Delivery::Dropped;
        };

        match slot.state {
            ProcessState::Waiting { since, token, interruptible: true } => {
                self.clock.cancel(token);
                let elapsed = now - since;
                let token = self.clock.schedule_urgent(target);
                slot.state = ProcessState::Interrupted { elapsed, cause, token };

                debug!(
                    process = %target,
                    name = slot.process.name(),
                    time = now,
                    elapsed,
                    ?cause,
                    "interrupt delivered"
                );
                Delivery::Delivered { elapsed }
            },
            state => {
                debug!(
                    process = %target,
                    name = slot.process.name(),
                    time = now,
                    ?state,
                    ?cause,
                    "interrupt dropped"
                );
                Delivery::Dropped
            },
        }
    }

    /// Run one due event.
    ///
    /// Returns `Ok(false)` once no event is due at or before `end_time`.
    ///
    /// # Errors
    ///
    /// Any process error, wrapped in [`SimError::Process`].
    pub fn step(
        &mut self,
        end_time: SimTime,
        observer: &mut dyn Observer,
    ) -> Result<bool, SimError> {
        let Some(event) = self.clock.pop_due(end_time) else {
            return Ok(false);
        };
        let now = self.clock.now();
        let target = event.target;
        let slot = &mut self.processes[target.index()];

        let wake = match slot.state {
            ProcessState::Ready { token } if token == event.token() => Wake::Start,
            ProcessState::Waiting { token, .. } if token == event.token() => Wake::TimerElapsed,
            ProcessState::Interrupted { elapsed, cause, token } if token == event.token() => {
                Wake::Interrupted { elapsed, cause }
            },
            state => {
                debug!(process = %target, ?state, time = now, "stale event skipped");
                return Ok(true);
            },
        };

        trace!(process = %target, name = slot.process.name(), time = now, ?wake, "resume");
        slot.state = ProcessState::Running;

        let mut observations = Vec::new();
        let mut interrupts = Vec::new();
        let result = {
            let mut ctx =
                Context::new(now, target, &mut self.plant, &mut observations, &mut interrupts);
            slot.process.resume(wake, &mut ctx)
        };

        for observation in &observations {
            observer.observe(observation);
        }

        let yielded = result.map_err(|source| SimError::Process {
            process: slot.process.name().to_string(),
            time: now,
            source: Box::new(source),
        })?;

        slot.state = match yielded {
            Yield::Wait { delay, interruptible } => {
                let token = self.clock.schedule(target, delay);
                ProcessState::Waiting { since: now, token, interruptible }
            },
            Yield::Finished => {
                debug!(process = %target, name = slot.process.name(), time = now, "finished");
                ProcessState::Finished
            },
        };

        for (interrupted, cause) in interrupts {
            self.interrupt(interrupted, cause);
        }

        self.steps += 1;
        observer.after_step(now, &self.plant);

        Ok(true)
    }

    /// Run every event due at or before `end_time`, then move the clock to
    /// `end_time`.
    ///
    /// # Errors
    ///
    /// The first process error, wrapped in [`SimError::Process`]. The clock
    /// stays at the failing step's time.
    pub fn run_until(
        &mut self,
        end_time: SimTime,
        observer: &mut dyn Observer,
    ) -> Result<(), SimError> {
        while self.step(end_time, observer)? {}
        self.clock.advance_to(end_time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::VecDeque, rc::Rc};

    use super::*;
    use crate::{
        process::Interrupter,
        record::{NullObserver, Observation},
    };

    type WakeLog = Rc<RefCell<Vec<(usize, SimTime, Wake)>>>;

    /// Logs every wake and replays a fixed list of yields.
    struct Scripted {
        name: String,
        log: WakeLog,
        plan: VecDeque<Yield>,
    }

    impl Scripted {
        fn boxed(name: &str, log: &WakeLog, plan: impl IntoIterator<Item = Yield>) -> Box<Self> {
            Box::new(Self {
                name: name.to_string(),
                log: Rc::clone(log),
                plan: plan.into_iter().collect(),
            })
        }
    }

    impl Process for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
            self.log.borrow_mut().push((ctx.me().index(), ctx.now(), wake));
            Ok(self.plan.pop_front().unwrap_or(Yield::Finished))
        }
    }

    /// Interrupts `target` after `after` ticks.
    struct Poker {
        target: ProcessId,
        after: SimTime,
    }

    impl Process for Poker {
        fn name(&self) -> &str {
            "poker"
        }

        fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
            match wake {
                Wake::Start => Ok(Yield::timeout(self.after)),
                _ => {
                    ctx.deliver_interrupt(self.target, Interrupt::Breakdown);
                    Ok(Yield::Finished)
                },
            }
        }
    }

    struct Failing;

    impl Process for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn resume(&mut self, wake: Wake, _ctx: &mut Context<'_>) -> Result<Yield, SimError> {
            match wake {
                Wake::Start => Ok(Yield::timeout(2)),
                _ => Err(SimError::SamplerExhausted("repair".to_string())),
            }
        }
    }

    fn new_log() -> WakeLog {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn equal_wake_times_resume_in_spawn_order() {
        let log = new_log();
        let mut sim = Simulation::new(Plant::new());
        let ids: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|name| sim.spawn(Scripted::boxed(name, &log, [Yield::timeout(5)])))
            .collect();
        assert_eq!(sim.process_name(ids[1]), Some("b"));
        assert_eq!(sim.process_name(ProcessId::new(3)), None);

        sim.run_until(10, &mut NullObserver).unwrap();

        let order: Vec<_> = log.borrow().iter().map(|(id, t, _)| (*id, *t)).collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (2, 0), (0, 5), (1, 5), (2, 5)]);
    }

    #[test]
    fn interrupted_wait_reports_elapsed() {
        let log = new_log();
        let mut sim = Simulation::new(Plant::new());
        let worker = sim.spawn(Scripted::boxed(
            "worker",
            &log,
            [Yield::interruptible(10), Yield::timeout(3), Yield::interruptible(6)],
        ));

        sim.run_until(4, &mut NullObserver).unwrap();
        assert_eq!(sim.interrupt(worker, Interrupt::Breakdown), Delivery::Delivered { elapsed: 4 });
        sim.run_until(100, &mut NullObserver).unwrap();

        let wakes: Vec<_> = log.borrow().iter().map(|(_, t, w)| (*t, *w)).collect();
        assert_eq!(
            wakes,
            vec![
                (0, Wake::Start),
                (4, Wake::Interrupted { elapsed: 4, cause: Interrupt::Breakdown }),
                (7, Wake::TimerElapsed),
                (13, Wake::TimerElapsed),
            ]
        );
        assert!(sim.is_finished(worker));
    }

    #[test]
    fn interrupt_from_another_process() {
        let log = new_log();
        let mut sim = Simulation::new(Plant::new());
        let worker = sim.spawn(Scripted::boxed("worker", &log, [Yield::interruptible(10)]));
        sim.spawn(Box::new(Poker { target: worker, after: 3 }));

        sim.run_until(20, &mut NullObserver).unwrap();

        let wakes: Vec<_> = log.borrow().iter().map(|(_, t, w)| (*t, *w)).collect();
        assert_eq!(
            wakes,
            vec![
                (0, Wake::Start),
                (3, Wake::Interrupted { elapsed: 3, cause: Interrupt::Breakdown })
            ]
        );
    }

    #[test]
    fn interrupted_process_resumes_before_the_rest_of_the_tick() {
        let log = new_log();
        let mut sim = Simulation::new(Plant::new());
        let worker = sim.spawn(Scripted::boxed("worker", &log, [Yield::interruptible(10)]));
        sim.spawn(Box::new(Poker { target: worker, after: 5 }));
        let other = sim.spawn(Scripted::boxed("other", &log, [Yield::timeout(5)]));

        sim.run_until(20, &mut NullObserver).unwrap();

        // the poker logs nothing; the worker wakes at 5 before `other`
        let order: Vec<_> = log.borrow().iter().map(|(id, t, _)| (*id, *t)).collect();
        assert_eq!(
            order,
            vec![(worker.index(), 0), (other.index(), 0), (worker.index(), 5), (other.index(), 5)]
        );
    }

    #[test]
    fn interrupts_outside_interruptible_waits_are_dropped() {
        let log = new_log();
        let mut sim = Simulation::new(Plant::new());
        let sleeper = sim.spawn(Scripted::boxed("sleeper", &log, [Yield::timeout(10)]));

        // not yet started
        assert_eq!(sim.interrupt(sleeper, Interrupt::Breakdown), Delivery::Dropped);

        sim.run_until(4, &mut NullObserver).unwrap();
        assert_eq!(sim.interrupt(sleeper, Interrupt::Breakdown), Delivery::Dropped);

        sim.run_until(20, &mut NullObserver).unwrap();
        assert!(sim.is_finished(sleeper));
        assert_eq!(sim.interrupt(sleeper, Interrupt::Breakdown), Delivery::Dropped);

        let times: Vec<_> = log.borrow().iter().map(|(_, t, _)| *t).collect();
        assert_eq!(times, vec![0, 10]);
    }

    #[test]
    fn second_interrupt_in_same_tick_is_dropped() {
        let log = new_log();
        let mut sim = Simulation::new(Plant::new());
        let worker = sim.spawn(Scripted::boxed("worker", &log, [Yield::interruptible(10)]));

        sim.run_until(2, &mut NullObserver).unwrap();
        assert_eq!(sim.interrupt(worker, Interrupt::Breakdown), Delivery::Delivered { elapsed: 2 });
        assert_eq!(sim.interrupt(worker, Interrupt::Breakdown), Delivery::Dropped);
    }

    #[test]
    fn process_errors_carry_name_and_time() {
        let mut sim = Simulation::new(Plant::new());
        sim.spawn(Box::new(Failing));

        let err = sim.run_until(10, &mut NullObserver).unwrap_err();
        assert!(matches!(
            &err,
            SimError::Process { process, time: 2, .. } if process == "failing"
        ));
        assert_eq!(err.root(), &SimError::SamplerExhausted("repair".to_string()));
        assert_eq!(sim.now(), 2);
    }

    #[test]
    fn run_until_lands_on_end_time() {
        let mut sim = Simulation::new(Plant::new());
        sim.run_until(50, &mut NullObserver).unwrap();
        assert_eq!(sim.now(), 50);
        assert_eq!(sim.pending_events(), 0);
    }

    #[test]
    fn events_at_end_time_run() {
        let log = new_log();
        let mut sim = Simulation::new(Plant::new());
        sim.spawn(Scripted::boxed("edge", &log, [Yield::timeout(5), Yield::timeout(1)]));

        sim.run_until(5, &mut NullObserver).unwrap();
        let times: Vec<_> = log.borrow().iter().map(|(_, t, _)| *t).collect();
        assert_eq!(times, vec![0, 5]);
        assert_eq!(sim.pending_events(), 1);
    }

    #[test]
    fn observer_sees_every_step() {
        struct Counter(u64);
        impl Observer for Counter {
            fn observe(&mut self, _observation: &Observation) {}
            fn after_step(&mut self, _now: SimTime, _plant: &Plant) {
                self.0 += 1;
            }
        }

        let log = new_log();
        let mut sim = Simulation::new(Plant::new());
        sim.spawn(Scripted::boxed("a", &log, [Yield::timeout(1), Yield::timeout(1)]));

        let mut counter = Counter(0);
        sim.run_until(10, &mut counter).unwrap();
        assert_eq!(counter.0, 3);
        assert_eq!(sim.steps(), 3);
    }
}
