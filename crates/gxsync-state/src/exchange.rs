//! Write arbitration between a stored variable and an incoming one
//!
//! The store consults `admit` before overwriting. The rule is a filter on top
//! of the status machine: everything it accepts on status grounds is a
//! transition the machine permits from the existing status.

use gxsync_core::{DataStatus, GxError, GxResult, VariableAttributes};

use crate::Variable;

/// Outcome of arbitration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Values are bit-identical, nothing to write
    Unchanged,
    /// Incoming variable replaces the existing one
    Accept,
    /// Existing variable must stay
    Reject,
}

/// Same status, or the existing value is settled
pub fn is_status_change_allowed(existing: DataStatus, new: DataStatus) -> bool {
    existing == new || existing == DataStatus::Synchronized
}

/// Decide whether `incoming` may overwrite `existing`
pub fn admit(
    existing: &Variable,
    incoming: &Variable,
    attrs: &VariableAttributes,
) -> GxResult<Admission> {
    if existing.name() != incoming.name() || incoming.name() != attrs.name {
        return Err(GxError::InvalidArgument(format!(
            "variable name mismatch: {} vs {}",
            existing.name(),
            incoming.name()
        )));
    }

    if existing.same_value(incoming) {
        return Ok(Admission::Unchanged);
    }

    if is_status_change_allowed(existing.status(), incoming.status()) {
        return Ok(Admission::Accept);
    }

    // The losing side's pending write gives way
    let overridable = match existing.status() {
        DataStatus::FromClientToSim => !attrs.user_is_boss,
        DataStatus::FromSimToClient => attrs.user_is_boss,
        _ => false,
    };

    if overridable {
        Ok(Admission::Accept)
    } else {
        Ok(Admission::Reject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::transition;
    use gxsync_core::{Registry, Side, FIRST_LONG, FIRST_NUMBER};

    fn pair(name: &str, existing: DataStatus, incoming: DataStatus, changed: bool) -> (Variable, Variable) {
        let registry = Registry::builtin();
        let (a, b) = if changed { (10, 11) } else { (10, 10) };
        if name == FIRST_NUMBER {
            (
                Variable::int32(&registry, name, existing, a).unwrap(),
                Variable::int32(&registry, name, incoming, b).unwrap(),
            )
        } else {
            (
                Variable::int64(&registry, name, existing, a as i64).unwrap(),
                Variable::int64(&registry, name, incoming, b as i64).unwrap(),
            )
        }
    }

    fn decide(name: &str, existing: DataStatus, incoming: DataStatus, changed: bool) -> Admission {
        let registry = Registry::builtin();
        let (old, new) = pair(name, existing, incoming, changed);
        admit(&old, &new, registry.find(name).unwrap()).unwrap()
    }

    #[test]
    fn test_status_change_allowed() {
        assert!(is_status_change_allowed(DataStatus::FromClientToSim, DataStatus::FromClientToSim));
        assert!(is_status_change_allowed(DataStatus::FromSimToClient, DataStatus::FromSimToClient));
        assert!(is_status_change_allowed(DataStatus::Synchronized, DataStatus::FromClientToSim));
        assert!(!is_status_change_allowed(DataStatus::FromClientToSim, DataStatus::FromSimToClient));
    }

    #[test]
    fn test_equal_values_unchanged() {
        assert_eq!(
            decide(FIRST_NUMBER, DataStatus::FromClientToSim, DataStatus::FromSimToClient, false),
            Admission::Unchanged
        );
    }

    #[test]
    fn test_synchronized_accepts() {
        assert_eq!(
            decide(FIRST_NUMBER, DataStatus::Synchronized, DataStatus::Synchronized, true),
            Admission::Accept
        );
    }

    #[test]
    fn test_non_boss_client_value_gives_way() {
        assert_eq!(
            decide(FIRST_NUMBER, DataStatus::FromClientToSim, DataStatus::FromSimToClient, true),
            Admission::Accept
        );
    }

    #[test]
    fn test_non_boss_sim_value_holds() {
        assert_eq!(
            decide(FIRST_NUMBER, DataStatus::FromSimToClient, DataStatus::FromClientToSim, true),
            Admission::Reject
        );
    }

    #[test]
    fn test_boss_sim_value_gives_way() {
        assert_eq!(
            decide(FIRST_LONG, DataStatus::FromSimToClient, DataStatus::FromClientToSim, true),
            Admission::Accept
        );
    }

    #[test]
    fn test_boss_client_value_holds() {
        assert_eq!(
            decide(FIRST_LONG, DataStatus::FromClientToSim, DataStatus::FromSimToClient, true),
            Admission::Reject
        );
    }

    #[test]
    fn test_in_flight_value_holds() {
        assert_eq!(
            decide(
                FIRST_NUMBER,
                DataStatus::FromSimToClientInProgress,
                DataStatus::FromClientToSim,
                true
            ),
            Admission::Reject
        );
    }

    #[test]
    fn test_name_mismatch() {
        let registry = Registry::builtin();
        let number = Variable::int32(&registry, FIRST_NUMBER, DataStatus::Synchronized, 1).unwrap();
        let long = Variable::int64(&registry, FIRST_LONG, DataStatus::Synchronized, 1).unwrap();
        assert!(matches!(
            admit(&number, &long, registry.find(FIRST_NUMBER).unwrap()),
            Err(GxError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_agrees_with_state_machine() {
        // Every acceptance of a side's value maps to a trigger the machine permits
        for name in [FIRST_NUMBER, FIRST_LONG] {
            let boss = Registry::builtin().find(name).unwrap().user_is_boss;
            for existing in [
                DataStatus::Synchronized,
                DataStatus::FromSimToClient,
                DataStatus::FromClientToSim,
            ] {
                for side in [Side::Sim, Side::Client] {
                    let admission = decide(name, existing, side.origin_status(), true);
                    let permitted = transition(existing, side.send_trigger(), boss).is_some();
                    assert_eq!(
                        admission == Admission::Accept,
                        permitted,
                        "{name}: {existing:?} <- {side:?}"
                    );
                }
            }
        }
    }
}
