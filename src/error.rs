//! Control-plane error types.
//!
//! Realtime-path functions (`process`, `put_get`) never return `Result` —
//! see the crate-level docs. These types cover only the setup/reconfigure
//! calls that a control thread makes.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    #[error("ring must have at least one slot")]
    ZeroCapacity,
    #[error("slot capacity must be greater than zero samples")]
    ZeroSlotLength,
    #[error("channel count must be greater than zero")]
    ZeroChannels,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PannerError {
    #[error("unknown source id: {0:?}")]
    UnknownSource(Vec<u8>),
}
