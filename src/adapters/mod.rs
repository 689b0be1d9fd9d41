//! Adapters - Concrete implementations of ports.

pub mod http;
pub mod ws;
