//! Status state machine
//!
//! Callers arm a trigger with `set_trigger`, which is checked against the
//! legal set of the current status, and commit it later with `fire`. Firing
//! arms the next trigger in the same step, so a variable always carries the
//! input it expects to receive next.
//!
//! Two transitions are guarded by the variable's `user_is_boss` flag: a
//! pending write from the boss side cannot be overtaken by the other side.

use gxsync_core::{DataStatus, GxError, GxResult, Trigger};
use tracing::trace;

/// Target status for `trigger` fired in `status`, if the transition exists
pub fn transition(status: DataStatus, trigger: Trigger, user_is_boss: bool) -> Option<DataStatus> {
    use DataStatus::*;
    use Trigger::*;

    match (status, trigger) {
        (StatusNotSet, SimSendsUpdate) => Some(FromSimToClient),
        (StatusNotSet, ClientSendsUpdate) => Some(FromClientToSim),

        (Synchronized, SimSendsUpdate) => Some(FromSimToClientInProgress),
        (Synchronized, ClientSendsUpdate) => Some(FromClientToSimInProgress),

        (FromSimToClientInProgress, ClientAcknowledged) => Some(Synchronized),
        (FromSimToClientInProgress, ClientUpdateFailed) => Some(FailedCommunication),

        (FromClientToSimInProgress, SimAcknowledged) => Some(Synchronized),
        (FromClientToSimInProgress, SimUpdateFailed) => Some(FailedCommunication),

        (FromClientToSim, SimSendsUpdate) if !user_is_boss => Some(FromSimToClientInProgress),
        (FromClientToSim, ClientSendsUpdate) => Some(FromClientToSimInProgress),

        (FromSimToClient, SimSendsUpdate) => Some(FromSimToClientInProgress),
        (FromSimToClient, ClientSendsUpdate) if user_is_boss => Some(FromSimToClientInProgress),

        (FailedCommunication, Reset) => Some(StatusNotSet),

        _ => None,
    }
}

/// Triggers accepted in `status`
pub fn legal_triggers(status: DataStatus, user_is_boss: bool) -> Vec<Trigger> {
    Trigger::ALL
        .iter()
        .copied()
        .filter(|&t| transition(status, t, user_is_boss).is_some())
        .collect()
}

/// Per-variable status machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMachine {
    status: DataStatus,
    pending: Trigger,
    user_is_boss: bool,
}

impl StatusMachine {
    pub fn new(status: DataStatus, user_is_boss: bool) -> Self {
        StatusMachine {
            status,
            pending: Trigger::NoAction,
            user_is_boss,
        }
    }

    #[inline]
    pub fn status(&self) -> DataStatus {
        self.status
    }

    /// Trigger that the next `fire` will commit
    #[inline]
    pub fn pending(&self) -> Trigger {
        self.pending
    }

    #[inline]
    pub fn user_is_boss(&self) -> bool {
        self.user_is_boss
    }

    pub fn legal_triggers(&self) -> Vec<Trigger> {
        legal_triggers(self.status, self.user_is_boss)
    }

    /// Can `trigger` fire from the current status
    pub fn can_fire(&self, trigger: Trigger) -> bool {
        transition(self.status, trigger, self.user_is_boss).is_some()
    }

    /// Arm a trigger
    pub fn set_trigger(&mut self, trigger: Trigger) -> GxResult<()> {
        if !self.can_fire(trigger) {
            return Err(GxError::IllegalTrigger {
                trigger,
                status: self.status,
            });
        }
        self.pending = trigger;
        Ok(())
    }

    /// Fire the pending trigger and arm `next`
    ///
    /// Nothing changes when either step is illegal.
    pub fn fire(&mut self, next: Trigger) -> GxResult<DataStatus> {
        let target = transition(self.status, self.pending, self.user_is_boss).ok_or(
            GxError::IllegalTrigger {
                trigger: self.pending,
                status: self.status,
            },
        )?;

        if transition(target, next, self.user_is_boss).is_none() {
            return Err(GxError::IllegalTrigger {
                trigger: next,
                status: target,
            });
        }

        trace!(from = ?self.status, to = ?target, fired = ?self.pending, armed = ?next, "status transition");
        self.status = target;
        self.pending = next;
        Ok(target)
    }
}
