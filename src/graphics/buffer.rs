//! Render buffer contract shared by the controller and the backends.
//!
//! A render buffer is an off-screen color target. The controller never looks
//! at pixels; it only creates, resizes, binds and draws buffers through the
//! traits below. Backends live in `graphics::soft` and `graphics::gl`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graphics::algorithm::ScalingAlgorithm;

/// Error types for render buffer operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// Width or height is zero or exceeds what the backend can allocate.
    #[error("invalid buffer dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A draw was issued with no write target bound.
    #[error("no write target is bound")]
    NoBoundTarget,

    /// A buffer was drawn onto itself.
    #[error("cannot draw a buffer onto itself")]
    FeedbackLoop,

    /// Backend specific failure (GL error, incomplete framebuffer...).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for render buffer operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Platform flag forwarded to buffer create and resize calls.
///
/// The client passes its "is macOS" flag here so the backend checks for
/// driver errors after (re)allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformFlags {
    /// Query the driver error state after allocation.
    pub check_errors: bool,
}

impl PlatformFlags {
    /// Flags for the platform this crate was compiled for.
    pub const CURRENT: PlatformFlags = PlatformFlags {
        check_errors: cfg!(target_os = "macos"),
    };
}

impl Default for PlatformFlags {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Creation parameters for a render buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSpec {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Attach a depth buffer.
    pub use_depth: bool,
    /// Platform flags.
    pub platform: PlatformFlags,
}

impl BufferSpec {
    /// Spec for a color + depth target on the current platform.
    #[must_use]
    pub const fn with_depth(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            use_depth: true,
            platform: PlatformFlags::CURRENT,
        }
    }

    /// Reject zero-area or oversized specs.
    pub fn validate(&self) -> BufferResult<()> {
        check_dimensions(self.width, self.height)
    }
}

/// Largest width or height any backend is asked to allocate.
pub const MAX_DIMENSION: u32 = 16384;

/// Reject a size that is zero or larger than [`MAX_DIMENSION`] on either axis.
pub fn check_dimensions(width: u32, height: u32) -> BufferResult<()> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(BufferError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Trait for render buffers.
///
/// Implementations wrap whatever the host uses as a framebuffer. All calls
/// happen on the render thread.
pub trait RenderBuffer {
    /// Current width in pixels.
    fn width(&self) -> u32;

    /// Current height in pixels.
    fn height(&self) -> u32;

    /// Reallocate the backing storage at a new size.
    ///
    /// Contents are undefined afterwards.
    fn resize(&mut self, width: u32, height: u32, platform: PlatformFlags) -> BufferResult<()>;

    /// Bind this buffer as the destination for subsequent draw commands.
    ///
    /// When `update_viewport` is set the viewport is reset to cover the
    /// whole buffer.
    fn begin_write(&mut self, update_viewport: bool) -> BufferResult<()>;

    /// Resample this buffer's contents onto the currently bound target,
    /// covering `width` x `height` pixels of it.
    fn draw(&mut self, width: u32, height: u32, algorithm: ScalingAlgorithm) -> BufferResult<()>;

    /// Short name used in log output.
    fn label(&self) -> &str {
        "buffer"
    }
}

/// Shared handle to a render buffer.
pub type BufferRef = Rc<RefCell<dyn RenderBuffer>>;

/// Wrap a concrete buffer into a shared handle.
pub fn share<B: RenderBuffer + 'static>(buffer: B) -> BufferRef {
    Rc::new(RefCell::new(buffer))
}

/// Check whether two handles point at the same buffer.
///
/// Compares addresses only so handles coerced from different concrete
/// types still match.
#[must_use]
pub fn same_buffer(a: &BufferRef, b: &BufferRef) -> bool {
    std::ptr::eq(
        Rc::as_ptr(a) as *const u8,
        Rc::as_ptr(b) as *const u8,
    )
}

/// Creates render buffers for the controller.
pub trait BufferFactory {
    /// Allocate a new buffer.
    fn create(&mut self, spec: BufferSpec) -> BufferResult<BufferRef>;
}
