pub mod config;
pub mod geometry;
pub mod panner;
pub mod rectangle;
pub mod speaker;

pub use config::PannerConfig;
pub use geometry::Point2D;
pub use panner::{Mode, Panner};
pub use rectangle::SoundRectangle;
pub use speaker::Loudspeaker;
