//! The active write target slot.
//!
//! Exactly one buffer receives draw commands at a time. The host owns the
//! slot and shares it with the controller; everything that swaps targets
//! goes through `install`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graphics::buffer::{same_buffer, BufferRef};

/// Holder for the buffer currently receiving draw commands.
#[derive(Default)]
pub struct WriteTargetSlot {
    current: RefCell<Option<BufferRef>>,
}

impl WriteTargetSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RefCell::new(None),
        }
    }

    /// Create a slot already holding `buffer`, wrapped for sharing.
    #[must_use]
    pub fn shared_with(buffer: BufferRef) -> Rc<Self> {
        let slot = Self::new();
        slot.install(buffer);
        Rc::new(slot)
    }

    /// The buffer currently installed, if any.
    #[must_use]
    pub fn current(&self) -> Option<BufferRef> {
        self.current.borrow().as_ref().map(Rc::clone)
    }

    /// Install `buffer` as the write target, returning the previous one.
    pub fn install(&self, buffer: BufferRef) -> Option<BufferRef> {
        self.current.borrow_mut().replace(buffer)
    }

    /// Remove the current target.
    pub fn clear(&self) -> Option<BufferRef> {
        self.current.borrow_mut().take()
    }

    /// Whether `buffer` is the installed target.
    #[must_use]
    pub fn is_current(&self, buffer: &BufferRef) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|current| same_buffer(current, buffer))
    }
}

impl std::fmt::Debug for WriteTargetSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.borrow();
        let desc = match current.as_ref() {
            Some(buffer) => match buffer.try_borrow() {
                Ok(b) => format!("{} {}x{}", b.label(), b.width(), b.height()),
                Err(_) => "<busy>".to_string(),
            },
            None => "<none>".to_string(),
        };
        f.debug_struct("WriteTargetSlot")
            .field("current", &desc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::algorithm::ScalingAlgorithm;
    use crate::graphics::buffer::{share, BufferResult, PlatformFlags, RenderBuffer};

    struct Named(&'static str);

    impl RenderBuffer for Named {
        fn width(&self) -> u32 {
            4
        }
        fn height(&self) -> u32 {
            3
        }
        fn resize(&mut self, _w: u32, _h: u32, _p: PlatformFlags) -> BufferResult<()> {
            Ok(())
        }
        fn begin_write(&mut self, _update_viewport: bool) -> BufferResult<()> {
            Ok(())
        }
        fn draw(&mut self, _w: u32, _h: u32, _a: ScalingAlgorithm) -> BufferResult<()> {
            Ok(())
        }
        fn label(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_empty_slot() {
        let slot = WriteTargetSlot::new();
        assert!(slot.current().is_none());
        assert!(slot.clear().is_none());
    }

    #[test]
    fn test_install_returns_previous() {
        let a = share(Named("a"));
        let b = share(Named("b"));
        let slot = WriteTargetSlot::new();
        assert!(slot.install(Rc::clone(&a)).is_none());
        let previous = slot.install(Rc::clone(&b)).unwrap();
        assert!(same_buffer(&previous, &a));
        assert!(slot.is_current(&b));
        assert!(!slot.is_current(&a));
    }

    #[test]
    fn test_shared_with() {
        let a = share(Named("a"));
        let slot = WriteTargetSlot::shared_with(Rc::clone(&a));
        assert!(slot.is_current(&a));
    }

    #[test]
    fn test_debug_output() {
        let slot = WriteTargetSlot::shared_with(share(Named("main")));
        assert!(format!("{:?}", slot).contains("main 4x3"));
        slot.clear();
        assert!(format!("{:?}", slot).contains("<none>"));
    }
}
