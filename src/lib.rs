// Resolution control library
// Renders the world pass at a different resolution than the window and
// resamples it onto the output.

pub mod cli;
pub mod config;
pub mod controller;
pub mod graphics;
pub mod input;
pub mod logging;
pub mod store;

pub use cli::Cli;
pub use config::{Options, ScaleConfig};
pub use controller::{HostServices, ScalingController, ScalingError, ScalingResult};
pub use graphics::{
    BufferError, BufferFactory, BufferRef, RenderBuffer, ScaleState, ScaledWindow,
    ScalingAlgorithm, Window, WriteTargetSlot,
};
pub use logging::LogLevel;
pub use store::{ConfigStore, MemoryStore, NullStore, PropFileStore, StoreError};

/// Namespace of every identifier this crate registers with the host.
pub const MOD_ID: &str = "resolutioncontrol";

/// Namespaced identifier, `resolutioncontrol:<path>`.
pub fn identifier(path: &str) -> String {
    format!("{}:{}", MOD_ID, path)
}
