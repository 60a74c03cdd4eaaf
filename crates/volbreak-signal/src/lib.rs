//! Volume breakout signal detection.
//!
//! Provides the candle filters (body size relative to close, body share of
//! the range, volume spike against a trailing window), the session gate that
//! holds evaluation back until the window is populated, and the detector
//! combining them.

pub mod filters;
pub mod session;
mod volume_breakout;

pub use filters::{body_percent, candle_size_percent, RollingVolumeWindow};
pub use session::{SessionConfig, SessionGate};
pub use volume_breakout::{Assessment, VolumeBreakoutConfig, VolumeBreakoutDetector};
