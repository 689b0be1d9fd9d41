//! Ports - Trait definitions for the I/O seams.

pub mod stream;
pub mod upload;
