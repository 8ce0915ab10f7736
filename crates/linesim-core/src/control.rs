//! Buffer level controllers.
//!
//! A supplier keeps a raw buffer above its critical level, a dispatcher empties
//! a finished buffer once it reaches its critical level. Both start with a
//! zero-length wait so their first check sees the line after every process
//! has started. A disabled controller finishes on its first step.
//!
//! A delivery that arrives at a buffer without room for it is held, and the
//! supplier retries the put every tick until it fits. Only a buffer that
//! something else also fills, such as a transfer destination, can get there.

use tracing::{debug, trace};

use crate::{
    config::{DispatcherConfig, SupplierConfig},
    container::ContainerId,
    error::SimError,
    process::{Context, Process, Wake, Yield},
    record::{LogisticsEvent, Observation},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlPhase {
    Idle,
    Checking,
    AwaitingArrival,
}

impl ControlPhase {
    fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::AwaitingArrival => "awaiting arrival",
        }
    }
}

/// Refills a raw material buffer.
pub struct SupplierControl {
    name: String,
    container: ContainerId,
    config: SupplierConfig,
    phase: ControlPhase,
}

impl SupplierControl {
    /// Supplier for `container`.
    pub fn new(name: impl Into<String>, container: ContainerId, config: SupplierConfig) -> Self {
        Self { name: name.into(), container, config, phase: ControlPhase::Idle }
    }

    fn check(&mut self, ctx: &mut Context<'_>) -> Yield {
        let level = ctx.plant().container(self.container).level();
        if level > self.config.critical_level {
            self.phase = ControlPhase::Checking;
            return Yield::timeout(self.config.standard_check_time);
        }

        debug!(supplier = %self.name, time = ctx.now(), level, "supplier called");
        ctx.emit(Observation::Logistics {
            time: ctx.now(),
            event: LogisticsEvent::SupplierCalled { container: self.container, level },
        });

        self.phase = ControlPhase::AwaitingArrival;
        Yield::timeout(self.config.lead_time)
    }

    fn refill(&mut self, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        let quantity = self.config.standard_supply;
        let now = ctx.now();
        let container = ctx.plant_mut().container_mut(self.container);
        if container.space() < quantity {
            trace!(
                supplier = %self.name,
                time = now,
                quantity,
                space = container.space(),
                "waiting for space"
            );
            return Ok(Yield::timeout(1));
        }
        container.put(quantity)?;
        let level = container.level();

        debug!(supplier = %self.name, time = ctx.now(), quantity, level, "refilled");
        ctx.emit(Observation::Logistics {
            time: ctx.now(),
            event: LogisticsEvent::Refilled { container: self.container, quantity, level },
        });

        self.phase = ControlPhase::Checking;
        Ok(Yield::timeout(self.config.after_refill_check_time))
    }
}

impl Process for SupplierControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        match (self.phase, wake) {
            (ControlPhase::Idle, Wake::Start) if !self.config.enabled => {
                debug!(supplier = %self.name, "disabled");
                Ok(Yield::Finished)
            },
            (ControlPhase::Idle, Wake::Start) => {
                self.phase = ControlPhase::Checking;
                Ok(Yield::timeout(0))
            },
            (ControlPhase::Checking, Wake::TimerElapsed) => Ok(self.check(ctx)),
            (ControlPhase::AwaitingArrival, Wake::TimerElapsed) => self.refill(ctx),
            (phase, wake) => Err(SimError::UnexpectedWake { state: phase.label(), wake }),
        }
    }
}

/// Empties a finished goods buffer.
pub struct DispatcherControl {
    name: String,
    container: ContainerId,
    config: DispatcherConfig,
    phase: ControlPhase,
}

impl DispatcherControl {
    /// Dispatcher for `container`.
    pub fn new(name: impl Into<String>, container: ContainerId, config: DispatcherConfig) -> Self {
        Self { name: name.into(), container, config, phase: ControlPhase::Idle }
    }

    fn check(&mut self, ctx: &mut Context<'_>) -> Yield {
        let level = ctx.plant().container(self.container).level();
        if level < self.config.critical_level {
            self.phase = ControlPhase::Checking;
            return Yield::timeout(self.config.standard_check_time);
        }

        debug!(dispatcher = %self.name, time = ctx.now(), level, "dispatcher called");
        ctx.emit(Observation::Logistics {
            time: ctx.now(),
            event: LogisticsEvent::DispatcherCalled { container: self.container, level },
        });

        self.phase = ControlPhase::AwaitingArrival;
        Yield::timeout(self.config.lead_time)
    }

    fn collect(&mut self, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        let quantity = ctx.plant_mut().container_mut(self.container).dispatch_all()?;

        debug!(dispatcher = %self.name, time = ctx.now(), quantity, "dispatched");
        ctx.emit(Observation::Logistics {
            time: ctx.now(),
            event: LogisticsEvent::Dispatched { container: self.container, quantity },
        });

        self.phase = ControlPhase::Checking;
        Ok(Yield::timeout(self.config.retrieved_check_time))
    }
}

impl Process for DispatcherControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        match (self.phase, wake) {
            (ControlPhase::Idle, Wake::Start) if !self.config.enabled => {
                debug!(dispatcher = %self.name, "disabled");
                Ok(Yield::Finished)
            },
            (ControlPhase::Idle, Wake::Start) => {
                self.phase = ControlPhase::Checking;
                Ok(Yield::timeout(0))
            },
            (ControlPhase::Checking, Wake::TimerElapsed) => Ok(self.check(ctx)),
            (ControlPhase::AwaitingArrival, Wake::TimerElapsed) => self.collect(ctx),
            (phase, wake) => Err(SimError::UnexpectedWake { state: phase.label(), wake }),
        }
    }
}
