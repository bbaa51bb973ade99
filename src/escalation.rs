//! Escalation state machine
//!
//! Applies temporal hysteresis to four-tier classifications. A lone danger
//! window only raises a strong-movement warning; `emergency_after` consecutive
//! danger windows enter Emergency, which is held for a fixed cooldown and then
//! reverts to Normal.
//!
//! The cooldown is a single deadline checked by the owner on its own execution
//! path (`poll_expiry`). Re-arming replaces the deadline, so there is never more
//! than one pending reset.

use crate::types::{AlertSignal, EscalationLevel, EscalationState};
use log::{debug, info};

/// Outcome of advancing the machine by one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub level: EscalationLevel,
    pub signal: AlertSignal,
    /// True only on the window that moved the machine into Emergency
    pub entered_emergency: bool,
}

#[derive(Debug, Clone)]
pub struct EscalationStateMachine {
    state: EscalationState,
    level: EscalationLevel,
    cooldown_ms: i64,
    emergency_after: u32,
}

impl EscalationStateMachine {
    pub fn new(cooldown_ms: i64, emergency_after: u32) -> Self {
        Self {
            state: EscalationState::default(),
            level: EscalationLevel::Normal,
            cooldown_ms,
            emergency_after: emergency_after.max(1),
        }
    }

    pub fn level(&self) -> EscalationLevel {
        self.level
    }

    pub fn state(&self) -> &EscalationState {
        &self.state
    }

    /// Revert to Normal if the pending cooldown has elapsed at `now_ms`.
    /// Returns true when an emergency was cleared.
    pub fn poll_expiry(&mut self, now_ms: i64) -> bool {
        match self.state.emergency_expiry_ms {
            Some(expiry) if self.state.emergency_active && now_ms >= expiry => {
                info!("emergency cooldown elapsed at {now_ms} ms, reverting to normal");
                self.state = EscalationState::default();
                self.level = EscalationLevel::Normal;
                true
            }
            _ => false,
        }
    }

    /// Advance by one evaluated window
    pub fn advance(
        &mut self,
        is_danger: bool,
        is_warning: bool,
        is_attention: bool,
        now_ms: i64,
    ) -> Transition {
        if is_danger {
            self.state.consecutive_danger_count =
                self.state.consecutive_danger_count.saturating_add(1);
        } else {
            self.state.consecutive_danger_count = 0;
        }
        let count = self.state.consecutive_danger_count;

        if count >= self.emergency_after {
            let entered_emergency = !self.state.emergency_active;
            self.state.emergency_active = true;
            self.state.emergency_expiry_ms = Some(now_ms.saturating_add(self.cooldown_ms));
            self.level = EscalationLevel::Emergency;

            if entered_emergency {
                info!("entering emergency after {count} consecutive danger windows");
            } else {
                debug!("emergency re-armed, danger streak {count}");
            }

            return Transition {
                level: self.level,
                signal: AlertSignal::Emergency,
                entered_emergency,
            };
        }

        // Lower-severity signals are suppressed while the cooldown runs
        if self.state.emergency_active {
            return Transition {
                level: EscalationLevel::Emergency,
                signal: AlertSignal::Emergency,
                entered_emergency: false,
            };
        }

        let (level, signal) = if count > 0 {
            (EscalationLevel::Warning, AlertSignal::StrongMovement)
        } else if is_warning || is_attention {
            (EscalationLevel::Normal, AlertSignal::Caution)
        } else {
            (EscalationLevel::Normal, AlertSignal::Safe)
        };
        self.level = level;

        Transition {
            level,
            signal,
            entered_emergency: false,
        }
    }

    /// Cancel any pending cooldown and return to the initial state
    pub fn reset(&mut self) {
        self.state = EscalationState::default();
        self.level = EscalationLevel::Normal;
    }
}
