//! Synchronization status and trigger definitions
//!
//! Every exchanged variable carries a status describing where its
//! authoritative value currently lives:
//! - StatusNotSet: freshly created, no side has claimed it
//! - FromSimToClient / FromClientToSim: a side produced a new value
//! - ...InProgress: that value is on the wire, waiting for acknowledgement
//! - Synchronized: both sides agree
//! - FailedCommunication: the peer reported a failed update

/// Synchronization status of a variable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DataStatus {
    /// Initial status
    #[default]
    StatusNotSet,
    /// Simulator produced a value for the client
    FromSimToClient,
    /// Client produced a value for the simulator
    FromClientToSim,
    /// Simulator value sent, awaiting client acknowledgement
    FromSimToClientInProgress,
    /// Client value sent, awaiting simulator acknowledgement
    FromClientToSimInProgress,
    /// Both sides hold the same value
    Synchronized,
    /// The receiving side reported a failed update
    FailedCommunication,
}

impl DataStatus {
    /// All statuses, in declaration order
    pub const ALL: [DataStatus; 7] = [
        DataStatus::StatusNotSet,
        DataStatus::FromSimToClient,
        DataStatus::FromClientToSim,
        DataStatus::FromSimToClientInProgress,
        DataStatus::FromClientToSimInProgress,
        DataStatus::Synchronized,
        DataStatus::FailedCommunication,
    ];

    /// Waiting for the peer to acknowledge
    pub fn is_in_progress(self) -> bool {
        matches!(
            self,
            DataStatus::FromSimToClientInProgress | DataStatus::FromClientToSimInProgress
        )
    }
}

/// Input symbol of the status state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Trigger {
    SimSendsUpdate,
    ClientSendsUpdate,
    SimAcknowledged,
    ClientAcknowledged,
    SimUpdateFailed,
    ClientUpdateFailed,
    /// Leaves FailedCommunication
    Reset,
    /// Idle default, never legal
    #[default]
    NoAction,
}

impl Trigger {
    /// All triggers, in declaration order
    pub const ALL: [Trigger; 8] = [
        Trigger::SimSendsUpdate,
        Trigger::ClientSendsUpdate,
        Trigger::SimAcknowledged,
        Trigger::ClientAcknowledged,
        Trigger::SimUpdateFailed,
        Trigger::ClientUpdateFailed,
        Trigger::Reset,
        Trigger::NoAction,
    ];
}

/// The two peers of an exchange
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Sim,
    Client,
}

impl Side {
    /// Trigger raised when this side produces a new value
    pub fn send_trigger(self) -> Trigger {
        match self {
            Side::Sim => Trigger::SimSendsUpdate,
            Side::Client => Trigger::ClientSendsUpdate,
        }
    }

    /// Trigger raised when this side confirms a value from its peer
    pub fn ack_trigger(self) -> Trigger {
        match self {
            Side::Sim => Trigger::SimAcknowledged,
            Side::Client => Trigger::ClientAcknowledged,
        }
    }

    /// Status a value produced by this side starts out with
    pub fn origin_status(self) -> DataStatus {
        match self {
            Side::Sim => DataStatus::FromSimToClient,
            Side::Client => DataStatus::FromClientToSim,
        }
    }

    /// Side that produced a value with the given status, if any
    pub fn of_status(status: DataStatus) -> Option<Side> {
        match status {
            DataStatus::FromSimToClient | DataStatus::FromSimToClientInProgress => Some(Side::Sim),
            DataStatus::FromClientToSim | DataStatus::FromClientToSimInProgress => {
                Some(Side::Client)
            }
            _ => None,
        }
    }
}
