//! Scaling controller.
//!
//! Owns the internal render buffer and runs the swap protocol around the
//! host's world pass:
//!
//! 1. `set_should_scale(true)`: remember the installed write target, then
//!    install and bind the internal buffer.
//! 2. The host renders; every draw lands in the internal buffer.
//! 3. `set_should_scale(false)`: reinstall and bind the remembered target,
//!    then resample the internal buffer onto it at the window's size.
//!
//! Everything runs on the render thread. The controller is not reentrant:
//! a collaborator must not call back into it from inside a buffer or
//! window callback.

use std::rc::Rc;

use crate::config::{is_valid_scale_factor, ScaleConfig};
use crate::graphics::buffer::{BufferError, BufferFactory, BufferRef, BufferSpec, PlatformFlags};
use crate::graphics::profiler::{self, Profiler};
use crate::graphics::{ScaleState, ScalingAlgorithm, Window, WriteTargetSlot};
use crate::store::ConfigStore;

/// Errors from controller operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScalingError {
    /// The window cannot report its framebuffer size yet.
    #[error("window framebuffer size is not available yet")]
    WindowUninitialized,

    /// Scaling was requested while no write target was installed.
    #[error("no write target is installed to displace")]
    NoWriteTarget,

    #[error("invalid scale factor: {0} (must be finite and greater than 0)")]
    InvalidScaleFactor(f64),

    /// A buffer was already borrowed, i.e. the controller was reentered.
    #[error("render buffer is already in use")]
    BufferBusy,

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Result type for controller operations.
pub type ScalingResult<T> = Result<T, ScalingError>;

/// Host collaborators handed to the controller at construction.
pub struct HostServices {
    /// Output window.
    pub window: Rc<dyn Window>,
    /// Allocates the internal buffer.
    pub factory: Box<dyn BufferFactory>,
    /// Slot holding the buffer that receives draw commands.
    pub target: Rc<WriteTargetSlot>,
    /// Persists configuration changes.
    pub store: Box<dyn ConfigStore>,
    /// Receives section markers around transitions.
    pub profiler: Box<dyn Profiler>,
}

/// Runs the render-target swap protocol and owns the scaling configuration.
pub struct ScalingController {
    host: HostServices,
    config: ScaleConfig,
    state: Rc<ScaleState>,
    internal: Option<BufferRef>,
    /// Target replaced by the internal buffer. Held strongly so it can
    /// always be restored, even if the host drops its own handle meanwhile.
    displaced: Option<BufferRef>,
    auxiliary: Vec<BufferRef>,
    platform: PlatformFlags,
}

impl ScalingController {
    /// Build a controller with its own scale state.
    pub fn new(host: HostServices, config: ScaleConfig) -> ScalingResult<Self> {
        let state = ScaleState::shared(config.scale_factor);
        Self::with_state(host, config, state)
    }

    /// Build a controller that drives an existing shared state, for hosts
    /// whose window reads the state (see [`crate::graphics::ScaledWindow`]).
    pub fn with_state(
        host: HostServices,
        config: ScaleConfig,
        state: Rc<ScaleState>,
    ) -> ScalingResult<Self> {
        if !is_valid_scale_factor(config.scale_factor) {
            return Err(ScalingError::InvalidScaleFactor(config.scale_factor));
        }
        state.set_active(false);
        state.set_factor(config.scale_factor);
        Ok(Self {
            host,
            config,
            state,
            internal: None,
            displaced: None,
            auxiliary: Vec::new(),
            platform: PlatformFlags::CURRENT,
        })
    }

    /// Override the platform flags passed to buffer create/resize.
    #[must_use]
    pub fn with_platform(mut self, platform: PlatformFlags) -> Self {
        self.platform = platform;
        self
    }

    // ---------------------------------------------------------------------
    // Swap protocol
    // ---------------------------------------------------------------------

    /// Turn scaling on or off for the following draw calls.
    ///
    /// Turning it on at factor 1.0, or requesting the current state, does
    /// nothing. Turning it off is always honored while active so a factor
    /// change mid-frame cannot strand the displaced target.
    pub fn set_should_scale(&mut self, active: bool) -> ScalingResult<()> {
        if active == self.state.is_active() {
            return Ok(());
        }
        if active && self.config.is_identity() {
            return Ok(());
        }

        let displaced = if active {
            self.window_size()?;
            Some(
                self.host
                    .target
                    .current()
                    .ok_or(ScalingError::NoWriteTarget)?,
            )
        } else {
            None
        };

        let internal = match &self.internal {
            Some(buffer) => Rc::clone(buffer),
            None => self.allocate_internal()?,
        };

        self.state.set_active(active);
        self.host.profiler.swap(if active {
            profiler::START_SCALING
        } else {
            profiler::FINISH_SCALING
        });

        let result = match displaced {
            Some(displaced) => self.swap_in(&internal, displaced),
            None => self.swap_out(&internal),
        };

        self.host.profiler.swap(profiler::LEVEL);
        result
    }

    /// Install and bind the internal buffer. On failure the displaced
    /// target goes back into the slot and the flag is cleared, so an error
    /// leaves the controller inactive.
    fn swap_in(&mut self, internal: &BufferRef, displaced: BufferRef) -> ScalingResult<()> {
        self.host.target.install(Rc::clone(internal));

        let bound = internal
            .try_borrow_mut()
            .map_err(|_| ScalingError::BufferBusy)
            .and_then(|mut buffer| {
                buffer.begin_write(true)?;
                log::debug!(
                    "scaling on: writing to {} {}x{}",
                    buffer.label(),
                    buffer.width(),
                    buffer.height()
                );
                Ok(())
            });

        match bound {
            Ok(()) => {
                self.displaced = Some(displaced);
                Ok(())
            }
            Err(err) => {
                log::warn!("failed to bind scaling buffer: {}", err);
                self.host.target.install(displaced);
                self.state.set_active(false);
                Err(err)
            }
        }
    }

    fn swap_out(&mut self, internal: &BufferRef) -> ScalingResult<()> {
        // Present whenever the flag was set through swap_in.
        let Some(displaced) = self.displaced.take() else {
            return Err(ScalingError::NoWriteTarget);
        };

        self.host.target.install(Rc::clone(&displaced));
        displaced
            .try_borrow_mut()
            .map_err(|_| ScalingError::BufferBusy)?
            .begin_write(true)?;

        let (width, height) = self.window_size()?;
        let algorithm = self.current_scaling_algorithm();
        internal
            .try_borrow_mut()
            .map_err(|_| ScalingError::BufferBusy)?
            .draw(width, height, algorithm)?;
        log::debug!(
            "scaling off: resampled onto {}x{} with {}",
            width,
            height,
            algorithm
        );
        Ok(())
    }

    fn allocate_internal(&mut self) -> ScalingResult<BufferRef> {
        let state = Rc::clone(&self.state);
        let _forced = state.force_active();

        let (width, height) = self.window_size()?;
        let spec = BufferSpec {
            width,
            height,
            use_depth: true,
            platform: self.platform,
        };
        let buffer = self.host.factory.create(spec)?;
        log::debug!("allocated scaling buffer {}x{}", width, height);
        self.internal = Some(Rc::clone(&buffer));
        Ok(buffer)
    }

    // ---------------------------------------------------------------------
    // Sizing
    // ---------------------------------------------------------------------

    /// Window size changed (resize, fullscreen toggle, DPI change).
    pub fn on_resolution_changed(&mut self) -> ScalingResult<()> {
        self.update_framebuffer_size()
    }

    /// Resize the internal buffer (if allocated and the factor is not 1.0)
    /// and every auxiliary buffer to the window's size.
    ///
    /// All buffers are attempted; the first failure is returned.
    pub fn update_framebuffer_size(&mut self) -> ScalingResult<()> {
        let mut first_error = None;

        if let Some(internal) = self.internal.clone() {
            if !self.config.is_identity() {
                if let Err(err) = self.resize(&internal) {
                    first_error.get_or_insert(err);
                }
            }
        }

        for buffer in self.auxiliary.clone() {
            if let Err(err) = self.resize(&buffer) {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resize `buffer` to the window's size with the active flag forced on.
    ///
    /// The flag is back to its previous value when this returns, whether
    /// the resize succeeded or not.
    pub fn resize(&mut self, buffer: &BufferRef) -> ScalingResult<()> {
        let state = Rc::clone(&self.state);
        let _forced = state.force_active();

        let (width, height) = self.window_size()?;
        let mut buffer = buffer
            .try_borrow_mut()
            .map_err(|_| ScalingError::BufferBusy)?;
        buffer.resize(width, height, self.platform)?;
        log::debug!("resized {} to {}x{}", buffer.label(), width, height);
        Ok(())
    }

    /// Track another window-sized buffer. It is resized on every size
    /// update whether or not scaling is in use.
    pub fn register_auxiliary_buffer(&mut self, buffer: BufferRef) {
        self.auxiliary.push(buffer);
    }

    fn window_size(&self) -> ScalingResult<(u32, u32)> {
        self.host
            .window
            .framebuffer_size()
            .ok_or(ScalingError::WindowUninitialized)
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    pub fn scale_factor(&self) -> f64 {
        self.config.scale_factor
    }

    /// Change the scale factor. Equal values are ignored.
    pub fn set_scale_factor(&mut self, factor: f64) -> ScalingResult<()> {
        if !is_valid_scale_factor(factor) {
            return Err(ScalingError::InvalidScaleFactor(factor));
        }
        if factor == self.config.scale_factor {
            return Ok(());
        }
        self.config.scale_factor = factor;
        self.state.set_factor(factor);
        self.commit()
    }

    pub fn upscale_algorithm(&self) -> ScalingAlgorithm {
        self.config.upscale_algorithm
    }

    pub fn set_upscale_algorithm(&mut self, algorithm: ScalingAlgorithm) -> ScalingResult<()> {
        if algorithm == self.config.upscale_algorithm {
            return Ok(());
        }
        self.config.upscale_algorithm = algorithm;
        self.commit()
    }

    pub fn next_upscale_algorithm(&mut self) -> ScalingResult<()> {
        self.set_upscale_algorithm(self.config.upscale_algorithm.next())
    }

    pub fn downscale_algorithm(&self) -> ScalingAlgorithm {
        self.config.downscale_algorithm
    }

    pub fn set_downscale_algorithm(&mut self, algorithm: ScalingAlgorithm) -> ScalingResult<()> {
        if algorithm == self.config.downscale_algorithm {
            return Ok(());
        }
        self.config.downscale_algorithm = algorithm;
        self.commit()
    }

    pub fn next_downscale_algorithm(&mut self) -> ScalingResult<()> {
        self.set_downscale_algorithm(self.config.downscale_algorithm.next())
    }

    /// Resize for the new configuration, then persist it. A failed save is
    /// logged and does not undo the change.
    fn commit(&mut self) -> ScalingResult<()> {
        let resized = self.update_framebuffer_size();
        if let Err(err) = self.host.store.save(&self.config) {
            log::warn!("failed to save scaling config: {}", err);
        }
        resized
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &ScaleConfig {
        &self.config
    }

    pub fn is_scaling_active(&self) -> bool {
        self.state.is_active()
    }

    /// Factor applied to what is being rendered right now: the configured
    /// factor while active, 1.0 otherwise.
    pub fn current_scale_factor(&self) -> f64 {
        self.state.current_scale_factor()
    }

    /// Algorithm that applies to the configured factor, ignoring whether
    /// scaling is active.
    pub fn current_scaling_algorithm(&self) -> ScalingAlgorithm {
        self.config.algorithm()
    }

    /// Shared state handle for windows and buffers that react to scaling.
    pub fn scale_state(&self) -> Rc<ScaleState> {
        Rc::clone(&self.state)
    }

    pub fn internal_buffer(&self) -> Option<&BufferRef> {
        self.internal.as_ref()
    }

    pub fn displaced_buffer(&self) -> Option<&BufferRef> {
        self.displaced.as_ref()
    }

    pub fn auxiliary_buffers(&self) -> &[BufferRef] {
        &self.auxiliary
    }

    pub fn write_target(&self) -> &Rc<WriteTargetSlot> {
        &self.host.target
    }
}

impl Drop for ScalingController {
    fn drop(&mut self) {
        if let Some(displaced) = self.displaced.take() {
            log::warn!("scaling controller dropped while active; restoring write target");
            self.host.target.install(displaced);
            self.state.set_active(false);
        }
    }
}

impl std::fmt::Debug for ScalingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalingController")
            .field("config", &self.config)
            .field("active", &self.state.is_active())
            .field("allocated", &self.internal.is_some())
            .field("auxiliary", &self.auxiliary.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::buffer::{share, BufferResult, RenderBuffer};
    use crate::graphics::{FixedWindow, NullProfiler};
    use crate::store::{MemoryStore, SaveHistory};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Counts {
        created: u32,
        resized: Vec<(String, u32, u32, bool)>,
        drawn: Vec<(u32, u32, ScalingAlgorithm)>,
    }

    struct Probe {
        name: String,
        size: (u32, u32),
        counts: Rc<RefCell<Counts>>,
        state: Option<Rc<ScaleState>>,
        fail_resize: bool,
    }

    impl RenderBuffer for Probe {
        fn width(&self) -> u32 {
            self.size.0
        }
        fn height(&self) -> u32 {
            self.size.1
        }
        fn resize(&mut self, w: u32, h: u32, _p: PlatformFlags) -> BufferResult<()> {
            let flag = self.state.as_ref().is_some_and(|s| s.is_active());
            self.counts
                .borrow_mut()
                .resized
                .push((self.name.clone(), w, h, flag));
            if self.fail_resize {
                return Err(BufferError::Backend("resize refused".into()));
            }
            self.size = (w, h);
            Ok(())
        }
        fn begin_write(&mut self, _update_viewport: bool) -> BufferResult<()> {
            Ok(())
        }
        fn draw(&mut self, w: u32, h: u32, a: ScalingAlgorithm) -> BufferResult<()> {
            self.counts.borrow_mut().drawn.push((w, h, a));
            Ok(())
        }
    }

    struct ProbeFactory(Rc<RefCell<Counts>>);

    impl BufferFactory for ProbeFactory {
        fn create(&mut self, spec: BufferSpec) -> BufferResult<BufferRef> {
            self.0.borrow_mut().created += 1;
            Ok(share(Probe {
                name: "internal".into(),
                size: (spec.width, spec.height),
                counts: Rc::clone(&self.0),
                state: None,
                fail_resize: false,
            }))
        }
    }

    struct Fixture {
        controller: ScalingController,
        counts: Rc<RefCell<Counts>>,
        window: Rc<FixedWindow>,
        output: BufferRef,
        saves: SaveHistory,
    }

    fn fixture(factor: f64) -> Fixture {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let window = Rc::new(FixedWindow::new(800, 600));
        let output = share(Probe {
            name: "output".into(),
            size: (800, 600),
            counts: Rc::clone(&counts),
            state: None,
            fail_resize: false,
        });
        let store = MemoryStore::new(ScaleConfig::default());
        let saves = store.history();
        let host = HostServices {
            window: window.clone(),
            factory: Box::new(ProbeFactory(Rc::clone(&counts))),
            target: WriteTargetSlot::shared_with(Rc::clone(&output)),
            store: Box::new(store),
            profiler: Box::new(NullProfiler),
        };
        let config = ScaleConfig {
            scale_factor: factor,
            ..ScaleConfig::default()
        };
        Fixture {
            controller: ScalingController::new(host, config).unwrap(),
            counts,
            window,
            output,
            saves,
        }
    }

    #[test]
    fn test_new_rejects_bad_factor() {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let host = HostServices {
            window: Rc::new(FixedWindow::new(1, 1)),
            factory: Box::new(ProbeFactory(counts)),
            target: Rc::new(WriteTargetSlot::new()),
            store: Box::new(MemoryStore::default()),
            profiler: Box::new(NullProfiler),
        };
        let config = ScaleConfig {
            scale_factor: 0.0,
            ..ScaleConfig::default()
        };
        assert!(matches!(
            ScalingController::new(host, config),
            Err(ScalingError::InvalidScaleFactor(_))
        ));
    }

    #[test]
    fn test_identity_factor_is_noop() {
        let mut f = fixture(1.0);
        f.controller.set_should_scale(true).unwrap();
        assert!(!f.controller.is_scaling_active());
        assert!(f.controller.internal_buffer().is_none());
        assert_eq!(f.counts.borrow().created, 0);
        assert!(f.controller.write_target().is_current(&f.output));
    }

    #[test]
    fn test_round_trip_restores_output() {
        let mut f = fixture(2.0);
        f.controller.set_should_scale(true).unwrap();
        assert!(f.controller.is_scaling_active());
        let internal = Rc::clone(f.controller.internal_buffer().unwrap());
        assert!(f.controller.write_target().is_current(&internal));
        assert!(f.controller.displaced_buffer().is_some());

        f.controller.set_should_scale(false).unwrap();
        assert!(!f.controller.is_scaling_active());
        assert!(f.controller.write_target().is_current(&f.output));
        assert!(f.controller.displaced_buffer().is_none());
        assert_eq!(
            f.counts.borrow().drawn,
            vec![(800, 600, ScalingAlgorithm::Nearest)]
        );
    }

    #[test]
    fn test_buffer_allocated_once() {
        let mut f = fixture(0.5);
        for _ in 0..3 {
            f.controller.set_should_scale(true).unwrap();
            f.controller.set_should_scale(false).unwrap();
        }
        assert_eq!(f.counts.borrow().created, 1);
        assert_eq!(f.counts.borrow().drawn.len(), 3);
    }

    #[test]
    fn test_uninitialized_window() {
        let mut f = fixture(2.0);
        let window = Rc::new(FixedWindow::uninitialized());
        f.controller.host.window = window;
        assert_eq!(
            f.controller.set_should_scale(true),
            Err(ScalingError::WindowUninitialized)
        );
        assert!(!f.controller.is_scaling_active());
        assert_eq!(f.counts.borrow().created, 0);
    }

    #[test]
    fn test_no_write_target() {
        let mut f = fixture(2.0);
        f.controller.write_target().clear();
        assert_eq!(
            f.controller.set_should_scale(true),
            Err(ScalingError::NoWriteTarget)
        );
        assert!(!f.controller.is_scaling_active());
    }

    #[test]
    fn test_setter_same_value_is_noop() {
        let mut f = fixture(2.0);
        f.controller.set_should_scale(true).unwrap();
        f.controller.set_should_scale(false).unwrap();
        f.counts.borrow_mut().resized.clear();

        f.controller.set_scale_factor(2.0).unwrap();
        f.controller.set_upscale_algorithm(ScalingAlgorithm::Nearest).unwrap();
        f.controller.set_downscale_algorithm(ScalingAlgorithm::Linear).unwrap();
        assert!(f.counts.borrow().resized.is_empty());
        assert!(f.saves.borrow().is_empty());
    }

    #[test]
    fn test_setter_resizes_and_persists() {
        let mut f = fixture(2.0);
        f.controller.set_should_scale(true).unwrap();
        f.controller.set_should_scale(false).unwrap();

        f.controller.set_scale_factor(0.5).unwrap();
        assert_eq!(f.saves.borrow().len(), 1);
        assert_eq!(f.saves.borrow()[0].scale_factor, 0.5);
        assert_eq!(
            f.counts.borrow().resized,
            vec![("internal".to_string(), 800, 600, false)]
        );
    }

    #[test]
    fn test_invalid_factor_rejected() {
        let mut f = fixture(2.0);
        assert_eq!(
            f.controller.set_scale_factor(-1.0),
            Err(ScalingError::InvalidScaleFactor(-1.0))
        );
        assert_eq!(f.controller.scale_factor(), 2.0);
        assert!(f.saves.borrow().is_empty());
    }

    #[test]
    fn test_next_algorithms_cycle() {
        let mut f = fixture(2.0);
        f.controller.next_upscale_algorithm().unwrap();
        assert_eq!(f.controller.upscale_algorithm(), ScalingAlgorithm::Linear);
        f.controller.next_upscale_algorithm().unwrap();
        assert_eq!(f.controller.upscale_algorithm(), ScalingAlgorithm::Nearest);
        f.controller.next_downscale_algorithm().unwrap();
        assert_eq!(f.controller.downscale_algorithm(), ScalingAlgorithm::Nearest);
        assert_eq!(f.saves.borrow().len(), 3);
    }

    #[test]
    fn test_resize_failure_restores_flag() {
        let mut f = fixture(2.0);
        let failing = share(Probe {
            name: "aux".into(),
            size: (1, 1),
            counts: Rc::clone(&f.counts),
            state: Some(f.controller.scale_state()),
            fail_resize: true,
        });
        assert!(f.controller.resize(&failing).is_err());
        assert!(!f.controller.is_scaling_active());
        assert_eq!(
            f.counts.borrow().resized,
            vec![("aux".to_string(), 800, 600, true)]
        );
    }

    #[test]
    fn test_resolution_change_without_allocation() {
        let mut f = fixture(2.0);
        let aux = share(Probe {
            name: "aux".into(),
            size: (800, 600),
            counts: Rc::clone(&f.counts),
            state: None,
            fail_resize: false,
        });
        f.controller.register_auxiliary_buffer(aux);
        f.window.set_size(1024, 768);
        f.controller.on_resolution_changed().unwrap();
        assert_eq!(
            f.counts.borrow().resized,
            vec![("aux".to_string(), 1024, 768, false)]
        );
        assert!(f.controller.internal_buffer().is_none());
    }

    #[test]
    fn test_busy_buffer_reported() {
        let mut f = fixture(2.0);
        let _held = f.output.borrow_mut();
        assert_eq!(
            f.controller.resize(&Rc::clone(&f.output)),
            Err(ScalingError::BufferBusy)
        );
        assert!(!f.controller.is_scaling_active());
    }

    #[test]
    fn test_drop_while_active_restores_target() {
        let mut f = fixture(2.0);
        f.controller.set_should_scale(true).unwrap();
        let slot = Rc::clone(f.controller.write_target());
        let state = f.controller.scale_state();
        drop(f.controller);
        assert!(slot.is_current(&f.output));
        assert!(!state.is_active());
    }

    #[test]
    fn test_debug_format() {
        let f = fixture(2.0);
        let text = format!("{:?}", f.controller);
        assert!(text.contains("active: false"));
        assert!(text.contains("allocated: false"));
    }
}
