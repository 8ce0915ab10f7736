//! Transfer stage between nodes.

use tracing::trace;

use crate::{
    container::ContainerId,
    error::SimError,
    process::{Context, Process, Wake, Yield},
    record::{LogisticsEvent, Observation},
};

/// Moves one unit per tick from every source into one destination.
///
/// A tick either moves from all sources or from none: it only fires when
/// every source holds at least one unit and the destination has room.
pub struct Transference {
    name: String,
    sources: Vec<ContainerId>,
    destination: ContainerId,
}

impl Transference {
    /// Transfer from `sources` into `destination`.
    pub fn new(
        name: impl Into<String>,
        sources: Vec<ContainerId>,
        destination: ContainerId,
    ) -> Self {
        Self { name: name.into(), sources, destination }
    }

    fn tick(&self, ctx: &mut Context<'_>) -> Result<(), SimError> {
        let plant = ctx.plant();
        let ready = self.sources.iter().all(|&id| !plant.container(id).is_empty())
            && !plant.container(self.destination).is_full();
        if !ready {
            return Ok(());
        }

        let plant = ctx.plant_mut();
        for &source in &self.sources {
            plant.container_mut(source).get(1)?;
        }
        plant.container_mut(self.destination).put(1)?;

        trace!(transfer = %self.name, time = ctx.now(), "moved one unit");
        ctx.emit(Observation::Logistics {
            time: ctx.now(),
            event: LogisticsEvent::Transferred { destination: self.destination, quantity: 1 },
        });

        Ok(())
    }
}

impl Process for Transference {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        if let Wake::Interrupted { .. } = wake {
            return Err(SimError::UnexpectedWake { state: "transferring", wake });
        }

        self.tick(ctx)?;
        Ok(Yield::timeout(1))
    }
}
