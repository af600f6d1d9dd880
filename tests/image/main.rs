//! Image format integration tests
//!
//! Tests that exercise the builder and loader together over whole images.

mod loader;
mod roundtrip;
