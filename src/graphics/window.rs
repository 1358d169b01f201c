//! Window contract and adapters.

use std::cell::Cell;
use std::rc::Rc;

use crate::graphics::state::ScaleState;

/// Host window as seen by the controller.
pub trait Window {
    /// Framebuffer size in pixels, or `None` before the window exists.
    fn framebuffer_size(&self) -> Option<(u32, u32)>;
}

impl<W: Window + ?Sized> Window for Rc<W> {
    fn framebuffer_size(&self) -> Option<(u32, u32)> {
        (**self).framebuffer_size()
    }
}

/// Window with a settable size, for headless hosts and tests.
#[derive(Debug, Default)]
pub struct FixedWindow {
    size: Cell<Option<(u32, u32)>>,
}

impl FixedWindow {
    /// Window that already reports `width` x `height`.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Cell::new(Some((width, height))),
        }
    }

    /// Window that has not been created yet.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// Change the reported size. The host must follow up with
    /// `on_resolution_changed`.
    pub fn set_size(&self, width: u32, height: u32) {
        self.size.set(Some((width, height)));
    }
}

impl Window for FixedWindow {
    fn framebuffer_size(&self) -> Option<(u32, u32)> {
        self.size.get()
    }
}

/// Reports the inner window's size multiplied by the current scale factor.
///
/// Installing this as the controller's window makes the internal buffer
/// track the scaled resolution, since the controller reads the size while
/// the active flag is forced on.
#[derive(Debug)]
pub struct ScaledWindow<W> {
    inner: W,
    state: Rc<ScaleState>,
}

impl<W: Window> ScaledWindow<W> {
    pub fn new(inner: W, state: Rc<ScaleState>) -> Self {
        Self { inner, state }
    }

    /// Unscaled size of the wrapped window.
    pub fn real_size(&self) -> Option<(u32, u32)> {
        self.inner.framebuffer_size()
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }
}

impl<W: Window> Window for ScaledWindow<W> {
    /// A scaled axis that overflows `u32` is reported as `u32::MAX`, which
    /// every backend rejects as [`crate::graphics::BufferError::InvalidDimensions`].
    fn framebuffer_size(&self) -> Option<(u32, u32)> {
        let (width, height) = self.inner.framebuffer_size()?;
        match (self.state.scale(width), self.state.scale(height)) {
            (Some(w), Some(h)) => Some((w, h)),
            (w, h) => {
                log::warn!(
                    "{}x{} scaled by {} is out of range",
                    width,
                    height,
                    self.state.current_scale_factor()
                );
                Some((w.unwrap_or(u32::MAX), h.unwrap_or(u32::MAX)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_window() {
        let window = FixedWindow::uninitialized();
        assert_eq!(window.framebuffer_size(), None);
        window.set_size(640, 480);
        assert_eq!(window.framebuffer_size(), Some((640, 480)));
    }

    #[test]
    fn test_scaled_window_inactive_reports_real_size() {
        let state = ScaleState::shared(2.0);
        let window = ScaledWindow::new(FixedWindow::new(800, 600), Rc::clone(&state));
        assert_eq!(window.framebuffer_size(), Some((800, 600)));
    }

    #[test]
    fn test_scaled_window_active_reports_scaled_size() {
        let state = ScaleState::shared(0.5);
        let window = ScaledWindow::new(FixedWindow::new(801, 600), Rc::clone(&state));
        let _forced = state.force_active();
        assert_eq!(window.framebuffer_size(), Some((401, 300)));
        assert_eq!(window.real_size(), Some((801, 600)));
    }

    #[test]
    fn test_scaled_window_overflow_is_out_of_range() {
        let state = ScaleState::shared(1e9);
        let window = ScaledWindow::new(FixedWindow::new(800, 4), Rc::clone(&state));
        let _forced = state.force_active();
        assert_eq!(window.framebuffer_size(), Some((u32::MAX, 4_000_000_000)));
    }

    #[test]
    fn test_scaled_window_uninitialized() {
        let state = ScaleState::shared(2.0);
        let window = ScaledWindow::new(FixedWindow::uninitialized(), state);
        assert_eq!(window.framebuffer_size(), None);
    }

    #[test]
    fn test_rc_window_forwards() {
        let window = Rc::new(FixedWindow::new(3, 4));
        assert_eq!(Window::framebuffer_size(&window), Some((3, 4)));
    }
}
