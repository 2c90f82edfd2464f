//! Regeneration state machine.
//!
//! One cycle walks `Idle -> GeneratingDensity -> GeneratingLight -> Idle`.
//! A cycle that cannot finish is aborted back to `Idle` and its fields are
//! never published.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// When the pipeline regenerates on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Regenerate every frame.
    #[default]
    Continuous,
    /// Regenerate only on explicit request.
    Manual,
}

/// What started a regeneration cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Tick,
    Manual,
}

impl Trigger {
    pub fn name(self) -> &'static str {
        match self {
            Self::Tick => "tick",
            Self::Manual => "manual",
        }
    }
}

/// Pick at most one trigger for a frame.
///
/// In continuous mode the tick already runs both phases, so a manual request
/// in the same frame is absorbed.
pub fn select_trigger(mode: UpdateMode, manual_requested: bool) -> Option<Trigger> {
    match mode {
        UpdateMode::Continuous => Some(Trigger::Tick),
        UpdateMode::Manual => manual_requested.then_some(Trigger::Manual),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenerationState {
    #[default]
    Idle,
    GeneratingDensity,
    GeneratingLight,
}

impl GenerationState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::GeneratingDensity => "generating_density",
            Self::GeneratingLight => "generating_light",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StateMachine {
    state: GenerationState,
    trigger: Option<Trigger>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    /// Trigger of the cycle in flight, if any
    pub fn trigger(&self) -> Option<Trigger> {
        self.trigger
    }

    pub fn is_idle(&self) -> bool {
        self.state == GenerationState::Idle
    }

    /// Idle -> GeneratingDensity
    pub fn begin(&mut self, trigger: Trigger) -> Result<()> {
        self.advance(GenerationState::Idle, GenerationState::GeneratingDensity, trigger.name())?;
        self.trigger = Some(trigger);
        Ok(())
    }

    /// GeneratingDensity -> GeneratingLight
    pub fn density_done(&mut self) -> Result<()> {
        self.advance(GenerationState::GeneratingDensity, GenerationState::GeneratingLight, "density_done")
    }

    /// GeneratingLight -> Idle; the cycle completed.
    pub fn light_done(&mut self) -> Result<()> {
        self.advance(GenerationState::GeneratingLight, GenerationState::Idle, "light_done")?;
        self.trigger = None;
        Ok(())
    }

    /// Drop the cycle in flight.
    pub fn abort(&mut self) {
        if self.state != GenerationState::Idle {
            log::debug!("Generation aborted in {}", self.state.name());
        }
        self.state = GenerationState::Idle;
        self.trigger = None;
    }

    fn advance(&mut self, from: GenerationState, to: GenerationState, trigger: &'static str) -> Result<()> {
        if self.state != from {
            return Err(Error::InvalidTransition { from: self.state.name(), trigger });
        }
        log::debug!("Generation state {} -> {} ({})", from.name(), to.name(), trigger);
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut sm = StateMachine::new();
        assert!(sm.is_idle());

        sm.begin(Trigger::Manual).unwrap();
        assert_eq!(sm.state(), GenerationState::GeneratingDensity);
        assert_eq!(sm.trigger(), Some(Trigger::Manual));

        sm.density_done().unwrap();
        assert_eq!(sm.state(), GenerationState::GeneratingLight);

        sm.light_done().unwrap();
        assert!(sm.is_idle());
        assert_eq!(sm.trigger(), None);
    }

    #[test]
    fn test_illegal_transitions() {
        let mut sm = StateMachine::new();
        assert!(matches!(
            sm.density_done(),
            Err(Error::InvalidTransition { from: "idle", trigger: "density_done" })
        ));
        assert!(sm.light_done().is_err());

        sm.begin(Trigger::Tick).unwrap();
        assert!(matches!(
            sm.begin(Trigger::Tick),
            Err(Error::InvalidTransition { from: "generating_density", trigger: "tick" })
        ));
        assert!(sm.light_done().is_err());
        // failed transitions leave the state alone
        assert_eq!(sm.state(), GenerationState::GeneratingDensity);
    }

    #[test]
    fn test_abort_returns_to_idle() {
        let mut sm = StateMachine::new();
        sm.begin(Trigger::Tick).unwrap();
        sm.density_done().unwrap();
        sm.abort();
        assert!(sm.is_idle());
        sm.begin(Trigger::Manual).unwrap();
    }

    #[test]
    fn test_select_trigger() {
        assert_eq!(select_trigger(UpdateMode::Continuous, false), Some(Trigger::Tick));
        assert_eq!(select_trigger(UpdateMode::Continuous, true), Some(Trigger::Tick));
        assert_eq!(select_trigger(UpdateMode::Manual, true), Some(Trigger::Manual));
        assert_eq!(select_trigger(UpdateMode::Manual, false), None);
    }
}
