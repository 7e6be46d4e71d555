mod flat_estimate;
mod replay;
mod telemetry_log;
mod vision_stats;

pub use flat_estimate::{FlatEstimateStatisticsNode, FlatEstimateStatisticsNodeConfig};
pub use replay::{load_recording, parse_recording, Record, ReplayNode, ReplayNodeConfig};
pub use telemetry_log::{TelemetryLogNode, TelemetryLogNodeConfig};
pub use vision_stats::{VisionStatisticsNode, VisionStatisticsNodeConfig};

fn default_window_seconds() -> f64 {
    20.0
}

/// A zero window is allowed and keeps only the samples of the latest timestamp.
fn valid_window(seconds: f64) -> bool {
    seconds.is_finite() && seconds >= 0.0
}
