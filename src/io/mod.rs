//! Encoding chunks for transmission.

pub mod ipc;
