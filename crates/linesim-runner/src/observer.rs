//! Observers used by the runner.

use linesim_core::{LogisticsEvent, Observation, Observer, Plant};
use tracing::debug;

use crate::logs::LogCollector;

/// Renders observations as human-readable tracing events.
///
/// Step records and logistics are logged as they arrive. Expectation flags
/// arrive every tick, so only changes are logged.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    machines: Vec<String>,
    containers: Vec<String>,
    behind: Vec<bool>,
}

impl TracingObserver {
    /// Observer that names machines and containers as `plant` does.
    pub fn for_plant(plant: &Plant) -> Self {
        let machines: Vec<_> = plant.machines().map(|(_, m)| m.name.clone()).collect();
        let containers = plant.containers().map(|(_, c)| c.name().to_string()).collect();
        let behind = vec![false; machines.len()];
        Self { machines, containers, behind }
    }

    fn machine(&self, index: usize) -> &str {
        self.machines.get(index).map_or("?", String::as_str)
    }

    fn container(&self, index: usize) -> &str {
        self.containers.get(index).map_or("?", String::as_str)
    }

    /// One line of text for a logistics event.
    pub fn describe(&self, event: &LogisticsEvent) -> String {
        match *event {
            LogisticsEvent::SupplierCalled { container, level } => {
                format!("{}: supplier called at level {level}", self.container(container.index()))
            },
            LogisticsEvent::Refilled { container, quantity, level } => {
                let name = self.container(container.index());
                format!("{name}: supplier delivered {quantity}, level {level}")
            },
            LogisticsEvent::DispatcherCalled { container, level } => {
                format!("{}: dispatcher called at level {level}", self.container(container.index()))
            },
            LogisticsEvent::Dispatched { container, quantity } => {
                format!("{}: dispatcher took {quantity}", self.container(container.index()))
            },
            LogisticsEvent::Transferred { destination, quantity } => {
                format!("{}: transferred {quantity}", self.container(destination.index()))
            },
        }
    }
}

impl Observer for TracingObserver {
    fn observe(&mut self, observation: &Observation) {
        match observation {
            Observation::Step(record) => {
                debug!(
                    time = record.time,
                    input = record.input_level,
                    output = record.output_level,
                    produced = record.parts_made,
                    remaining = record.remaining,
                    "{}: {}",
                    self.machine(record.machine.index()),
                    record.code
                );
            },
            Observation::Expectation(sample) => {
                let index = sample.machine.index();
                if let Some(flag) = self.behind.get_mut(index) {
                    if *flag != sample.behind {
                        *flag = sample.behind;
                        let state = if sample.behind { "behind" } else { "back on" };
                        debug!(time = sample.time, "{}: {state} expectation", self.machine(index));
                    }
                }
            },
            Observation::Logistics { time, event } => {
                debug!(time, "{}", self.describe(event));
            },
        }
    }
}

/// Everything the runner observes during one run.
#[derive(Debug, Clone)]
pub struct RunObserver {
    /// CSV row collector
    pub logs: LogCollector,
    /// Text log
    pub text: TracingObserver,
}

impl RunObserver {
    /// Observers for the machines and containers of `plant`.
    pub fn for_plant(plant: &Plant) -> Self {
        Self { logs: LogCollector::for_plant(plant), text: TracingObserver::for_plant(plant) }
    }
}

impl Observer for RunObserver {
    fn observe(&mut self, observation: &Observation) {
        self.logs.observe(observation);
        self.text.observe(observation);
    }
}
