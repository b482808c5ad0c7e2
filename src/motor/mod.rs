//! Motor State Machine (C4, §4.4): lifecycle, ramps, kick, FDA, braking
//! and relay sequencing. `controller` holds the `tick`-driven state
//! machine itself; the other modules are the pure helpers it calls into.
pub mod braking;
pub mod controller;
pub mod pitch;
pub mod ramps;
pub mod relay;
pub mod state;

pub use controller::MotorController;
pub use relay::{RelayOutput, RelaySequencer};
pub use state::MotorState;
