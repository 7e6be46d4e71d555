//! Rolling-window statistics over noisy, timestamped vision measurements.
//!
//! Samples are kept in [`TimedBuffer`]s that only retain the last `window` seconds. Every update
//! recomputes the mean and the population standard deviation over what is retained and pushes the
//! results to the telemetry bus (if one was attached).

mod buffer;
mod corner;
pub mod math;
mod pose;
mod target;

pub use buffer::{TimedBuffer, DEFAULT_WINDOW_SECONDS};
pub use corner::CornerStatistics;
pub use pose::PoseStatistics;
pub use target::TargetStatistics;

/// Something that aggregates timestamped samples over a sliding window.
pub trait Statistics {
    type Input: ?Sized;

    /// Adds a sample, recomputes the aggregates and publishes them. `None` (or an input without any
    /// data) leaves everything untouched and publishes nothing.
    fn update(&mut self, input: Option<&Self::Input>, timestamp: f64);

    /// The retention window in seconds.
    fn window(&self) -> f64;

    /// Changes the retention window of every owned buffer. Applies from the next update on.
    fn set_window(&mut self, seconds: f64);

    /// Pushes the most recently computed values to the telemetry bus.
    fn publish(&mut self);
}
