//! Client side of the external load-test engine's HTTP contract.

mod client;
pub mod wire;

pub use client::EngineClient;
