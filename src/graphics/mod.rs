//! Render-side building blocks: buffers, the write target slot, the window
//! contract and the shared scale state.

pub mod algorithm;
pub mod buffer;
#[cfg(feature = "sdl")]
pub mod gl;
pub mod profiler;
pub mod soft;
pub mod state;
pub mod target;
pub mod window;

pub use algorithm::ScalingAlgorithm;
pub use buffer::{
    check_dimensions, same_buffer, share, BufferError, BufferFactory, BufferRef, BufferResult,
    BufferSpec, PlatformFlags, RenderBuffer, MAX_DIMENSION,
};
pub use profiler::{LogProfiler, NullProfiler, Profiler};
pub use state::ScaleState;
pub use target::WriteTargetSlot;
pub use window::{FixedWindow, ScaledWindow, Window};
