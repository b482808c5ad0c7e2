//! Hardware-free DSP core for the turntable DDS engine.
//!
//! Split out of the firmware binary the way the teacher splits its `idsp`
//! math crate out of `stabilizer`: everything here is pure, host-testable
//! logic with no peripheral access, so `cargo test -p dsp` runs on a
//! developer's workstation without a target chip attached.
#![cfg_attr(not(test), no_std)]

pub mod accu;
pub mod design_parameters;
pub mod engine;
pub mod filter;
pub mod fir;
pub mod iir;
pub mod lut;

pub use accu::{phase_increment, Accu};
pub use engine::{DdsEngine, SliceBuffer, SynthesisParams};
pub use filter::{ChannelFilter, FilterKind};
pub use fir::FirProfile;
pub use lut::Lut;
