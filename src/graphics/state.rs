//! Scale state shared between the controller and host collaborators.
//!
//! Window and buffer implementations may consult this to report scaled
//! dimensions while scaling is active. The controller is the only writer.

use std::cell::Cell;
use std::rc::Rc;

/// Active flag plus configured factor.
#[derive(Debug)]
pub struct ScaleState {
    active: Cell<bool>,
    factor: Cell<f64>,
}

impl ScaleState {
    /// Create an inactive state with the given configured factor.
    #[must_use]
    pub fn new(factor: f64) -> Self {
        Self {
            active: Cell::new(false),
            factor: Cell::new(factor),
        }
    }

    /// Create a shared inactive state.
    #[must_use]
    pub fn shared(factor: f64) -> Rc<Self> {
        Rc::new(Self::new(factor))
    }

    /// Whether scaling is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    /// Configured factor, regardless of the active flag.
    #[must_use]
    pub fn factor(&self) -> f64 {
        self.factor.get()
    }

    pub(crate) fn set_factor(&self, factor: f64) {
        self.factor.set(factor);
    }

    /// The factor actually applied to what is being rendered right now.
    #[must_use]
    pub fn current_scale_factor(&self) -> f64 {
        if self.is_active() {
            self.factor()
        } else {
            1.0
        }
    }

    /// Scale a pixel dimension by the current factor, rounding up.
    ///
    /// Returns `None` when the result does not fit in a `u32`.
    #[must_use]
    pub fn scale(&self, value: u32) -> Option<u32> {
        let scaled = (f64::from(value) * self.current_scale_factor()).ceil();
        if scaled.is_finite() && scaled >= 0.0 && scaled <= f64::from(u32::MAX) {
            Some(scaled as u32)
        } else {
            None
        }
    }

    /// Force the active flag on until the returned guard is dropped.
    ///
    /// The previous value is restored on every exit path, including early
    /// returns and unwinding.
    #[must_use = "the flag is restored as soon as the guard is dropped"]
    pub fn force_active(&self) -> ForcedActive<'_> {
        let previous = self.active.replace(true);
        ForcedActive {
            state: self,
            previous,
        }
    }
}

/// Guard returned by [`ScaleState::force_active`].
#[derive(Debug)]
pub struct ForcedActive<'a> {
    state: &'a ScaleState,
    previous: bool,
}

impl ForcedActive<'_> {
    /// Value the flag had before it was forced.
    #[must_use]
    pub fn previous(&self) -> bool {
        self.previous
    }
}

impl Drop for ForcedActive<'_> {
    fn drop(&mut self) {
        self.state.active.set(self.previous);
    }
}
