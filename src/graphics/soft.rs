//! Software render buffers.
//!
//! A CPU implementation of the render buffer contract. `SoftDevice` plays
//! the role of the graphics context: it remembers which pixel storage is
//! bound for writing and the current viewport. Resampling goes through
//! `fast_image_resize`.
//!
//! Used by the headless `rescontrol` host and by the end-to-end tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fast_image_resize::{
    images::{Image, ImageRef},
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
};
use image::RgbaImage;

use crate::graphics::algorithm::ScalingAlgorithm;
use crate::graphics::buffer::{
    check_dimensions, BufferError, BufferFactory, BufferRef, BufferResult, BufferSpec,
    PlatformFlags, RenderBuffer,
};

const BYTES_PER_PIXEL: usize = 4;

/// RGBA8 pixel storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftPixels {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl SoftPixels {
    /// Opaque black storage. Fails instead of allocating an oversized or
    /// overflowing byte count.
    fn new(width: u32, height: u32) -> BufferResult<Self> {
        check_dimensions(width, height)?;
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or(BufferError::InvalidDimensions { width, height })?;
        let mut data = vec![0u8; len];
        for pixel in data.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel[3] = 255;
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Read one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let o = self.offset(x, y);
        Some([
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        ])
    }

    fn fill_with(&mut self, mut f: impl FnMut(u32, u32) -> [u8; 4]) {
        for y in 0..self.height {
            for x in 0..self.width {
                let o = self.offset(x, y);
                self.data[o..o + BYTES_PER_PIXEL].copy_from_slice(&f(x, y));
            }
        }
    }

    /// Copy a `width` x `height` RGBA block to the top-left corner,
    /// clipped to this storage.
    fn blit(&mut self, src: &[u8], width: u32, height: u32) {
        let rows = height.min(self.height) as usize;
        let row_bytes = width.min(self.width) as usize * BYTES_PER_PIXEL;
        let src_stride = width as usize * BYTES_PER_PIXEL;
        let dst_stride = self.width as usize * BYTES_PER_PIXEL;
        for row in 0..rows {
            let s = row * src_stride;
            let d = row * dst_stride;
            self.data[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
        }
    }
}

/// Resample `src` to `dst_width` x `dst_height`.
fn resample(
    src: &SoftPixels,
    dst_width: u32,
    dst_height: u32,
    algorithm: ScalingAlgorithm,
) -> BufferResult<Vec<u8>> {
    if src.width == dst_width && src.height == dst_height {
        return Ok(src.data.clone());
    }

    let src_image = ImageRef::new(src.width, src.height, &src.data, PixelType::U8x4)
        .map_err(|e| BufferError::Backend(format!("source image: {}", e)))?;
    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let alg = match algorithm {
        ScalingAlgorithm::Nearest => ResizeAlg::Nearest,
        ScalingAlgorithm::Linear => ResizeAlg::Convolution(FilterType::Bilinear),
    };
    let options = ResizeOptions::new().resize_alg(alg);

    Resizer::new()
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| BufferError::Backend(format!("resample: {}", e)))?;

    Ok(dst_image.buffer().to_vec())
}

/// Software graphics context.
#[derive(Debug, Default)]
pub struct SoftDevice {
    bound: RefCell<Option<Rc<RefCell<SoftPixels>>>>,
    viewport: Cell<(u32, u32)>,
    draws: Cell<u64>,
}

impl SoftDevice {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn bind(&self, pixels: Rc<RefCell<SoftPixels>>) {
        *self.bound.borrow_mut() = Some(pixels);
    }

    fn bound(&self) -> Option<Rc<RefCell<SoftPixels>>> {
        self.bound.borrow().as_ref().map(Rc::clone)
    }

    /// Current viewport size.
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport.get()
    }

    /// Number of resampling draws issued so far.
    pub fn draw_count(&self) -> u64 {
        self.draws.get()
    }

    /// Paint every pixel of the bound target. This is how the host's
    /// world renderer writes in the headless setup.
    pub fn paint_bound(&self, f: impl FnMut(u32, u32) -> [u8; 4]) -> BufferResult<()> {
        let bound = self.bound().ok_or(BufferError::NoBoundTarget)?;
        let mut pixels = bound
            .try_borrow_mut()
            .map_err(|_| BufferError::Backend("bound target is busy".to_string()))?;
        pixels.fill_with(f);
        Ok(())
    }

    /// Size of the bound target, if any.
    pub fn bound_size(&self) -> Option<(u32, u32)> {
        let bound = self.bound()?;
        let pixels = bound.borrow();
        Some((pixels.width, pixels.height))
    }
}

/// CPU render buffer bound to a [`SoftDevice`].
#[derive(Debug)]
pub struct SoftBuffer {
    device: Rc<SoftDevice>,
    pixels: Rc<RefCell<SoftPixels>>,
    has_depth: bool,
    label: String,
}

impl SoftBuffer {
    /// Allocate a buffer on `device`.
    pub fn new(device: &Rc<SoftDevice>, spec: BufferSpec, label: &str) -> BufferResult<Self> {
        spec.validate()?;
        Ok(Self {
            device: Rc::clone(device),
            pixels: Rc::new(RefCell::new(SoftPixels::new(spec.width, spec.height)?)),
            has_depth: spec.use_depth,
            label: label.to_string(),
        })
    }

    /// Allocate and wrap in a shared handle, keeping the concrete type.
    pub fn shared(
        device: &Rc<SoftDevice>,
        spec: BufferSpec,
        label: &str,
    ) -> BufferResult<Rc<RefCell<SoftBuffer>>> {
        Ok(Rc::new(RefCell::new(Self::new(device, spec, label)?)))
    }

    pub fn has_depth(&self) -> bool {
        self.has_depth
    }

    /// Read one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixels.borrow().pixel(x, y)
    }

    /// Snapshot of the pixel storage.
    pub fn snapshot(&self) -> SoftPixels {
        self.pixels.borrow().clone()
    }

    /// Whether this buffer's storage is bound on its device.
    pub fn is_bound(&self) -> bool {
        self.device
            .bound()
            .is_some_and(|bound| Rc::ptr_eq(&bound, &self.pixels))
    }

    /// Copy the contents into an `image` buffer.
    pub fn to_image(&self) -> BufferResult<RgbaImage> {
        let pixels = self.pixels.borrow();
        RgbaImage::from_raw(pixels.width, pixels.height, pixels.data.clone()).ok_or(
            BufferError::InvalidDimensions {
                width: pixels.width,
                height: pixels.height,
            },
        )
    }
}

impl RenderBuffer for SoftBuffer {
    fn width(&self) -> u32 {
        self.pixels.borrow().width
    }

    fn height(&self) -> u32 {
        self.pixels.borrow().height
    }

    fn resize(&mut self, width: u32, height: u32, _platform: PlatformFlags) -> BufferResult<()> {
        let pixels = SoftPixels::new(width, height)?;
        // In place, so a bound buffer stays bound.
        *self.pixels.borrow_mut() = pixels;
        log::debug!("soft buffer {} resized to {}x{}", self.label, width, height);
        Ok(())
    }

    fn begin_write(&mut self, update_viewport: bool) -> BufferResult<()> {
        self.device.bind(Rc::clone(&self.pixels));
        if update_viewport {
            let pixels = self.pixels.borrow();
            self.device.viewport.set((pixels.width, pixels.height));
        }
        Ok(())
    }

    fn draw(&mut self, width: u32, height: u32, algorithm: ScalingAlgorithm) -> BufferResult<()> {
        check_dimensions(width, height)?;
        let bound = self.device.bound().ok_or(BufferError::NoBoundTarget)?;
        if Rc::ptr_eq(&bound, &self.pixels) {
            return Err(BufferError::FeedbackLoop);
        }

        let resampled = resample(&self.pixels.borrow(), width, height, algorithm)?;
        bound.borrow_mut().blit(&resampled, width, height);
        self.device.draws.set(self.device.draws.get() + 1);
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Factory producing [`SoftBuffer`]s on one device.
#[derive(Debug)]
pub struct SoftFactory {
    device: Rc<SoftDevice>,
    created: u32,
}

impl SoftFactory {
    pub fn new(device: Rc<SoftDevice>) -> Self {
        Self { device, created: 0 }
    }

    /// Number of buffers created so far.
    pub fn created(&self) -> u32 {
        self.created
    }
}

impl BufferFactory for SoftFactory {
    fn create(&mut self, spec: BufferSpec) -> BufferResult<BufferRef> {
        let label = format!("scaled-{}", self.created);
        let buffer: BufferRef = SoftBuffer::shared(&self.device, spec, &label)?;
        self.created += 1;
        Ok(buffer)
    }
}
