//! Guider lifecycle: Uninitialized -> Active -> Finalized.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::GuideError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Uninitialized = 0,
    Active = 1,
    Finalized = 2,
}

impl LifecycleState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => LifecycleState::Uninitialized,
            1 => LifecycleState::Active,
            _ => LifecycleState::Finalized,
        }
    }
}

/// Atomic lifecycle flag. Out-of-order calls are programmer errors and panic.
#[derive(Debug, Default)]
pub struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Panic unless the guider is active.
    #[inline]
    pub fn expect_active(&self, op: &str) {
        self.expect(LifecycleState::Active, op);
    }

    #[inline]
    pub fn expect(&self, expected: LifecycleState, op: &str) {
        let state = self.state();
        if state != expected {
            panic!("{}", GuideError::Lifecycle(format!("{} called while {:?}", op, state)));
        }
    }

    pub fn activate(&self) {
        self.transition(LifecycleState::Uninitialized, LifecycleState::Active, "init");
    }

    pub fn finalize(&self) {
        self.transition(LifecycleState::Active, LifecycleState::Finalized, "done");
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState, op: &str) {
        if let Err(current) =
            self.0
                .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
        {
            panic!(
                "{}",
                GuideError::Lifecycle(format!(
                    "{} called while {:?}",
                    op,
                    LifecycleState::from_u8(current)
                ))
            );
        }
    }
}
