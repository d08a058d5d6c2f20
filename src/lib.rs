//! Realtime audio core for a multimedia player: a decoder-to-callback
//! transfer buffer, a 2-D spatial panner, and a look-ahead peak limiter,
//! composed into a single [`graph::GraphRoot`] that a hardware callback
//! driver can drive directly.

pub mod atomic_float;
pub mod buffer;
pub mod error;
pub mod graph;
pub mod limiter;
pub mod panner;
pub mod ring;
pub mod timestamp;
pub mod transfer;

#[cfg(feature = "cpal-backend")]
pub mod backend;

pub use buffer::DecodedBuffer;
pub use error::{PannerError, TransferError};
pub use graph::GraphRoot;
pub use limiter::ChannelLimiter;
pub use panner::{Mode, Panner, PannerConfig};
pub use timestamp::Timestamp;
pub use transfer::{AudioTransfer, CallbackTime, PlayMode};
