//! Stack-machine interpreter for linked QSM objects.
//!
//! The engine loads a fully linked object into a flat byte-addressable
//! memory image and runs a fetch-decode-execute loop over it. Programs see
//! an operand stack, a call stack of frames, a flag register, and a
//! bump-allocated heap growing past the image.

pub mod engine;

pub use engine::{DebugLog, Limits, RuntimeError, Vm};
