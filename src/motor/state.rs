//! Five-state motor lifecycle (§4.4).
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MotorState {
    Standby = 0,
    Stopped = 1,
    Starting = 2,
    Running = 3,
    Stopping = 4,
}

impl MotorState {
    /// Initial state per §4.4: Standby unless `auto_boot`, then Stopped (and
    /// immediately Starting if `auto_start` is also set -- the caller
    /// performs that second transition once hardware setup completes).
    pub fn initial(auto_boot: bool) -> Self {
        if auto_boot {
            MotorState::Stopped
        } else {
            MotorState::Standby
        }
    }
}

impl Default for MotorState {
    fn default() -> Self {
        MotorState::Standby
    }
}
