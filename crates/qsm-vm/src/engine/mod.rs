//! Runtime engine: frames, faults, and the interpreter loop.

mod error;
mod frame;
mod vm;


pub use error::RuntimeError;
pub use frame::Frame;
pub use vm::{DebugLog, Limits, Vm};
