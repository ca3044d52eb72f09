//! Device lifecycle phases with atomic, checked transitions.
//!
//! ```text
//!                 acquire                power_on
//! Unattached ───────────────> Acquired ───────────> Active
//!     ^  (failure: back)        │                   │  ^
//!     │                         │ release  power_off│  │ power_on
//!     │                         ▼                   ▼  │
//!     │                    Released <────────── PoweredOff
//!     │                       │       release
//!     └───── acquire ─────────┘ (re-acquire goes to Acquired)
//! ```
//!
//! [`PhaseCell::transition`] checks and changes the phase in one CAS. Entry
//! points that program hardware before transitioning take `&mut self` on the
//! device, so they never run concurrently.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::error::{EqosError, EqosResult};

/// Device lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecyclePhase {
    /// No resources held.
    Unattached = 0,
    /// Registers mapped, interrupt connected, controller reset and initialized.
    ResourcesAcquired = 1,
    /// Data path running.
    Active = 2,
    /// Left the active state; resources still held.
    PoweredOff = 3,
    /// Resources given back; may be acquired again.
    ResourcesReleased = 4,
}

impl LifecyclePhase {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Unattached,
            1 => Self::ResourcesAcquired,
            2 => Self::Active,
            3 => Self::PoweredOff,
            _ => Self::ResourcesReleased,
        }
    }

    /// Phases that hold the register mapping and interrupt.
    pub const fn holds_resources(self) -> bool {
        matches!(self, Self::ResourcesAcquired | Self::Active | Self::PoweredOff)
    }
}

/// Atomic holder of the current [`LifecyclePhase`].
pub struct PhaseCell(AtomicU8);

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(LifecyclePhase::Unattached as u8))
    }

    #[inline]
    pub fn get(&self) -> LifecyclePhase {
        LifecyclePhase::from_raw(self.0.load(Ordering::Acquire))
    }

    /// Moves from any of `from` to `to`.
    ///
    /// # Returns
    ///
    /// The phase left behind, or [`EqosError::InvalidPhase`] naming the first
    /// acceptable phase when the current one is not in `from`.
    pub fn transition(
        &self,
        from: &[LifecyclePhase],
        to: LifecyclePhase,
    ) -> EqosResult<LifecyclePhase> {
        loop {
            let current = self.get();
            if !from.contains(&current) {
                return Err(EqosError::InvalidPhase {
                    expected: from.first().copied().unwrap_or(to),
                    actual: current,
                });
            }
            if self
                .0
                .compare_exchange_weak(
                    current as u8,
                    to as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                debug!("lifecycle {current:?} -> {to:?}");
                return Ok(current);
            }
        }
    }

    /// Unconditionally sets the phase. Used to roll back a failed attach.
    pub fn force(&self, phase: LifecyclePhase) {
        self.0.store(phase as u8, Ordering::Release);
    }

    /// Checks that the current phase is one of `allowed`.
    pub fn expect(&self, allowed: &[LifecyclePhase]) -> EqosResult<LifecyclePhase> {
        let current = self.get();
        if allowed.contains(&current) {
            Ok(current)
        } else {
            Err(EqosError::InvalidPhase {
                expected: allowed.first().copied().unwrap_or(current),
                actual: current,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecyclePhase::*;

    #[test]
    fn test_phase_basic() {
        let phase = PhaseCell::new();
        assert_eq!(phase.get(), Unattached);
        assert!(!phase.get().holds_resources());

        assert_eq!(phase.transition(&[Unattached], ResourcesAcquired), Ok(Unattached));
        assert!(phase.get().holds_resources());
    }

    #[test]
    fn test_full_cycle() {
        let phase = PhaseCell::new();
        phase.transition(&[Unattached, ResourcesReleased], ResourcesAcquired).unwrap();
        phase.transition(&[ResourcesAcquired, PoweredOff], Active).unwrap();
        phase.transition(&[Active], PoweredOff).unwrap();
        phase.transition(&[ResourcesAcquired, PoweredOff], Active).unwrap();
        phase.transition(&[Active], PoweredOff).unwrap();
        phase.transition(&[ResourcesAcquired, PoweredOff], ResourcesReleased).unwrap();
        phase.transition(&[Unattached, ResourcesReleased], ResourcesAcquired).unwrap();
        assert_eq!(phase.get(), ResourcesAcquired);
    }

    #[test]
    fn test_invalid_transition() {
        let phase = PhaseCell::new();
        assert_eq!(
            phase.transition(&[Active], PoweredOff),
            Err(EqosError::InvalidPhase {
                expected: Active,
                actual: Unattached
            })
        );
        assert_eq!(phase.get(), Unattached);
        assert!(phase.expect(&[Active]).is_err());
        assert_eq!(phase.expect(&[Unattached]), Ok(Unattached));
    }

    #[test]
    fn test_force_rollback() {
        let phase = PhaseCell::new();
        phase.transition(&[Unattached], ResourcesAcquired).unwrap();
        phase.force(Unattached);
        assert_eq!(phase.get(), Unattached);
    }
}
