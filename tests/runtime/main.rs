//! Runtime integration tests
//!
//! Whole-VM tests: programs assembled with the image builder, loaded, and
//! executed through the public `Vm` surface.

mod entities;
mod exec;
mod faults;
mod util;
