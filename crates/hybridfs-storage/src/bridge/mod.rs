//! Bridge host access over its HTTP tunnel.

pub mod client;

pub use client::HttpBridgeClient;
