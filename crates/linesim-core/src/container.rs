//! Bounded integer-level store shared between processes.
//!
//! `get`/`put` are immediate and never block: callers poll the level before
//! committing. A request that would drive the level below zero or above
//! capacity is a simulation bug and fails with [`ContainerError`] instead of
//! clamping.

use thiserror::Error;

/// Index of a container in the plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(pub(crate) usize);

impl ContainerId {
    /// Raw plant index.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Level invariant violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// `get` asked for more than the container holds.
    #[error("container '{container}' underflow: get({requested}) with level {level}")]
    Underflow {
        /// Container name
        container: String,
        /// Level before the request
        level: u64,
        /// Units requested
        requested: u64,
    },

    /// `put` would exceed capacity.
    #[error(
        "container '{container}' overflow: put({requested}) with level {level}/{capacity}"
    )]
    Overflow {
        /// Container name
        container: String,
        /// Level before the request
        level: u64,
        /// Maximum level
        capacity: u64,
        /// Units requested
        requested: u64,
    },
}

/// Raw or finished goods buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    name: String,
    level: u64,
    capacity: u64,
    picked: u64,
    stored: u64,
    delivered: u64,
}

impl Container {
    /// Create a container holding `initial` units.
    ///
    /// # Errors
    ///
    /// - `ContainerError::Overflow` if `initial > capacity`
    pub fn new(
        name: impl Into<String>,
        capacity: u64,
        initial: u64,
    ) -> Result<Self, ContainerError> {
        let name = name.into();
        if initial > capacity {
            return Err(ContainerError::Overflow {
                container: name,
                level: 0,
                capacity,
                requested: initial,
            });
        }

        Ok(Self { name, level: initial, capacity, picked: 0, stored: 0, delivered: 0 })
    }

    /// Container name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units currently held.
    pub fn level(&self) -> u64 {
        self.level
    }

    /// Maximum level.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Free slots.
    pub fn space(&self) -> u64 {
        self.capacity - self.level
    }

    /// Whether the level is zero.
    pub fn is_empty(&self) -> bool {
        self.level == 0
    }

    /// Whether the level equals capacity.
    pub fn is_full(&self) -> bool {
        self.level == self.capacity
    }

    /// Units taken by the consuming machine.
    pub fn picked(&self) -> u64 {
        self.picked
    }

    /// Units put by the producing machine.
    pub fn stored(&self) -> u64 {
        self.stored
    }

    /// Units removed by a dispatcher.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Remove `n` units.
    ///
    /// # Errors
    ///
    /// - `ContainerError::Underflow` if `n > level`
    pub fn get(&mut self, n: u64) -> Result<(), ContainerError> {
        if n > self.level {
            return Err(ContainerError::Underflow {
                container: self.name.clone(),
                level: self.level,
                requested: n,
            });
        }

        self.level -= n;
        Ok(())
    }

    /// Add `n` units.
    ///
    /// # Errors
    ///
    /// - `ContainerError::Overflow` if `level + n > capacity`
    pub fn put(&mut self, n: u64) -> Result<(), ContainerError> {
        if n > self.space() {
            return Err(ContainerError::Overflow {
                container: self.name.clone(),
                level: self.level,
                capacity: self.capacity,
                requested: n,
            });
        }

        self.level += n;
        debug_assert!(self.level <= self.capacity);
        Ok(())
    }

    /// Machine-side `get(1)`, counted in `picked`.
    pub fn pick(&mut self) -> Result<(), ContainerError> {
        self.get(1)?;
        self.picked += 1;
        Ok(())
    }

    /// Machine-side `put(1)`, counted in `stored`.
    pub fn store(&mut self) -> Result<(), ContainerError> {
        self.put(1)?;
        self.stored += 1;
        Ok(())
    }

    /// Empty the container into the `delivered` counter.
    ///
    /// Returns the number of units removed.
    pub fn dispatch_all(&mut self) -> Result<u64, ContainerError> {
        let quantity = self.level;
        self.delivered += quantity;
        self.get(quantity)?;
        Ok(quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_put_move_level() {
        let mut c = Container::new("raw", 10, 4).unwrap();
        c.put(6).unwrap();
        assert!(c.is_full());
        c.get(10).unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn underflow_is_an_error_not_a_clamp() {
        let mut c = Container::new("raw", 10, 2).unwrap();
        let err = c.get(3).unwrap_err();

        assert_eq!(
            err,
            ContainerError::Underflow { container: "raw".to_string(), level: 2, requested: 3 }
        );
        assert_eq!(c.level(), 2);
    }

    #[test]
    fn overflow_is_an_error_not_a_clamp() {
        let mut c = Container::new("finished", 5, 5).unwrap();
        let err = c.put(1).unwrap_err();

        assert!(matches!(err, ContainerError::Overflow { level: 5, capacity: 5, .. }));
        assert_eq!(c.level(), 5);
        assert_eq!(err.to_string(), "container 'finished' overflow: put(1) with level 5/5");
    }

    #[test]
    fn initial_level_above_capacity_rejected() {
        assert!(Container::new("raw", 5, 6).is_err());
    }

    #[test]
    fn counters_track_machine_and_dispatcher_traffic() {
        let mut c = Container::new("out", 10, 0).unwrap();
        c.store().unwrap();
        c.store().unwrap();
        c.put(3).unwrap();

        assert_eq!(c.stored(), 2);
        assert_eq!(c.dispatch_all().unwrap(), 5);
        assert_eq!(c.delivered(), 5);
        assert_eq!(c.level(), 0);

        let mut input = Container::new("in", 10, 2).unwrap();
        input.pick().unwrap();
        assert_eq!(input.picked(), 1);
        assert_eq!(input.level(), 1);
    }

    #[test]
    fn failed_pick_does_not_count() {
        let mut c = Container::new("in", 1, 0).unwrap();
        assert!(c.pick().is_err());
        assert_eq!(c.picked(), 0);
    }
}
