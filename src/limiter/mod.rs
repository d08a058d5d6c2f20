pub mod channel_limiter;
pub mod delay_line;
pub mod level_meter;

pub use channel_limiter::ChannelLimiter;
pub use level_meter::LevelMeter;
