//! Profiler section markers emitted around scaling transitions.

/// Section marker emitted when scaling turns on.
pub const START_SCALING: &str = "startScaling";
/// Section marker emitted when scaling turns off.
pub const FINISH_SCALING: &str = "finishScaling";
/// Section marker emitted after either transition.
pub const LEVEL: &str = "level";

/// Host profiler. Purely observational.
pub trait Profiler {
    /// End the current section and start `section`.
    fn swap(&mut self, section: &str);
}

/// Profiler that ignores all markers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProfiler;

impl Profiler for NullProfiler {
    fn swap(&mut self, _section: &str) {}
}

/// Profiler that writes markers to the log at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProfiler;

impl Profiler for LogProfiler {
    fn swap(&mut self, section: &str) {
        log::trace!("profiler section: {}", section);
    }
}
