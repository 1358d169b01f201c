//! OpenGL render buffers and SDL2 window glue.
//!
//! Only compiled with the `sdl` feature. A GL context must be current and
//! `gl::load_with` must have been called by the host before any buffer is
//! created.

use std::rc::Rc;

use crate::graphics::algorithm::ScalingAlgorithm;
use crate::graphics::buffer::{
    check_dimensions, BufferError, BufferFactory, BufferRef, BufferResult, BufferSpec,
    PlatformFlags, RenderBuffer,
};
use crate::graphics::window::Window;

/// Human readable name for a `glGetError` code.
#[must_use]
pub const fn error_name(code: u32) -> &'static str {
    match code {
        0x0000 => "GL_NO_ERROR",
        0x0500 => "GL_INVALID_ENUM",
        0x0501 => "GL_INVALID_VALUE",
        0x0502 => "GL_INVALID_OPERATION",
        0x0505 => "GL_OUT_OF_MEMORY",
        0x0506 => "GL_INVALID_FRAMEBUFFER_OPERATION",
        _ => "unknown GL error",
    }
}

fn check_gl_error(context: &str) -> BufferResult<()> {
    let code = unsafe { gl::GetError() };
    if code == gl::NO_ERROR {
        Ok(())
    } else {
        Err(BufferError::Backend(format!(
            "{}: {} (0x{:04x})",
            context,
            error_name(code),
            code
        )))
    }
}

fn to_gl_size(width: u32, height: u32) -> BufferResult<(i32, i32)> {
    check_dimensions(width, height)?;
    match (i32::try_from(width), i32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(BufferError::InvalidDimensions { width, height }),
    }
}

/// Framebuffer object with a color texture and optional depth attachment.
#[derive(Debug)]
pub struct GlFramebuffer {
    fbo: u32,
    color_texture: u32,
    depth_renderbuffer: u32,
    width: u32,
    height: u32,
    use_depth: bool,
    label: String,
}

impl GlFramebuffer {
    pub fn new(spec: BufferSpec, label: &str) -> BufferResult<Self> {
        spec.validate()?;
        let mut framebuffer = Self {
            fbo: 0,
            color_texture: 0,
            depth_renderbuffer: 0,
            width: spec.width,
            height: spec.height,
            use_depth: spec.use_depth,
            label: label.to_string(),
        };
        framebuffer.allocate(spec.platform)?;
        Ok(framebuffer)
    }

    /// GL name of the framebuffer object.
    pub fn fbo(&self) -> u32 {
        self.fbo
    }

    /// GL name of the color texture.
    pub fn color_texture(&self) -> u32 {
        self.color_texture
    }

    fn allocate(&mut self, platform: PlatformFlags) -> BufferResult<()> {
        let (w, h) = to_gl_size(self.width, self.height)?;

        let status = unsafe {
            gl::GenFramebuffers(1, &mut self.fbo);
            gl::GenTextures(1, &mut self.color_texture);

            gl::BindTexture(gl::TEXTURE_2D, self.color_texture);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::NEAREST as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::NEAREST as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as i32);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                gl::RGBA8 as i32,
                w,
                h,
                0,
                gl::RGBA,
                gl::UNSIGNED_BYTE,
                std::ptr::null(),
            );

            gl::BindFramebuffer(gl::FRAMEBUFFER, self.fbo);
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0,
                gl::TEXTURE_2D,
                self.color_texture,
                0,
            );

            if self.use_depth {
                gl::GenRenderbuffers(1, &mut self.depth_renderbuffer);
                gl::BindRenderbuffer(gl::RENDERBUFFER, self.depth_renderbuffer);
                gl::RenderbufferStorage(gl::RENDERBUFFER, gl::DEPTH_COMPONENT24, w, h);
                gl::FramebufferRenderbuffer(
                    gl::FRAMEBUFFER,
                    gl::DEPTH_ATTACHMENT,
                    gl::RENDERBUFFER,
                    self.depth_renderbuffer,
                );
                gl::BindRenderbuffer(gl::RENDERBUFFER, 0);
            }

            let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            gl::BindTexture(gl::TEXTURE_2D, 0);
            status
        };

        if status != gl::FRAMEBUFFER_COMPLETE {
            self.release();
            return Err(BufferError::Backend(format!(
                "framebuffer {} incomplete (0x{:04x})",
                self.label, status
            )));
        }

        if platform.check_errors {
            check_gl_error("framebuffer allocation")?;
        }
        Ok(())
    }

    fn release(&mut self) {
        unsafe {
            if self.depth_renderbuffer != 0 {
                gl::DeleteRenderbuffers(1, &self.depth_renderbuffer);
            }
            if self.color_texture != 0 {
                gl::DeleteTextures(1, &self.color_texture);
            }
            if self.fbo != 0 {
                gl::DeleteFramebuffers(1, &self.fbo);
            }
        }
        self.depth_renderbuffer = 0;
        self.color_texture = 0;
        self.fbo = 0;
    }
}

impl Drop for GlFramebuffer {
    fn drop(&mut self) {
        self.release();
    }
}

impl RenderBuffer for GlFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32, platform: PlatformFlags) -> BufferResult<()> {
        to_gl_size(width, height)?;
        self.release();
        self.width = width;
        self.height = height;
        self.allocate(platform)
    }

    fn begin_write(&mut self, update_viewport: bool) -> BufferResult<()> {
        let (w, h) = to_gl_size(self.width, self.height)?;
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, self.fbo);
            if update_viewport {
                gl::Viewport(0, 0, w, h);
            }
        }
        Ok(())
    }

    fn draw(&mut self, width: u32, height: u32, algorithm: ScalingAlgorithm) -> BufferResult<()> {
        let (src_w, src_h) = to_gl_size(self.width, self.height)?;
        let (dst_w, dst_h) = to_gl_size(width, height)?;

        let mut draw_binding = 0;
        unsafe {
            gl::GetIntegerv(gl::DRAW_FRAMEBUFFER_BINDING, &mut draw_binding);
        }
        if draw_binding as u32 == self.fbo {
            return Err(BufferError::FeedbackLoop);
        }

        unsafe {
            gl::BindFramebuffer(gl::READ_FRAMEBUFFER, self.fbo);
            gl::BlitFramebuffer(
                0,
                0,
                src_w,
                src_h,
                0,
                0,
                dst_w,
                dst_h,
                gl::COLOR_BUFFER_BIT,
                algorithm.gl_filter(),
            );
            gl::BindFramebuffer(gl::READ_FRAMEBUFFER, draw_binding as u32);
        }
        check_gl_error("framebuffer blit")
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// The window's default framebuffer (GL name 0).
#[derive(Debug)]
pub struct GlDefaultFramebuffer {
    width: u32,
    height: u32,
}

impl GlDefaultFramebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl RenderBuffer for GlDefaultFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32, _platform: PlatformFlags) -> BufferResult<()> {
        to_gl_size(width, height)?;
        // Storage belongs to the window system.
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn begin_write(&mut self, update_viewport: bool) -> BufferResult<()> {
        let (w, h) = to_gl_size(self.width, self.height)?;
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            if update_viewport {
                gl::Viewport(0, 0, w, h);
            }
        }
        Ok(())
    }

    fn draw(&mut self, _width: u32, _height: u32, _algorithm: ScalingAlgorithm) -> BufferResult<()> {
        Err(BufferError::Backend(
            "the default framebuffer cannot be used as a blit source".to_string(),
        ))
    }

    fn label(&self) -> &str {
        "default"
    }
}

/// Creates [`GlFramebuffer`]s.
#[derive(Debug, Default)]
pub struct GlFactory {
    created: u32,
}

impl GlFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BufferFactory for GlFactory {
    fn create(&mut self, spec: BufferSpec) -> BufferResult<BufferRef> {
        let label = format!("scaled-{}", self.created);
        let buffer: BufferRef = Rc::new(std::cell::RefCell::new(GlFramebuffer::new(spec, &label)?));
        self.created += 1;
        Ok(buffer)
    }
}

/// SDL2 window reporting its drawable (pixel) size.
pub struct SdlWindow {
    window: sdl2::video::Window,
}

impl SdlWindow {
    pub fn new(window: sdl2::video::Window) -> Self {
        Self { window }
    }

    pub fn sdl_window(&self) -> &sdl2::video::Window {
        &self.window
    }
}

impl Window for SdlWindow {
    fn framebuffer_size(&self) -> Option<(u32, u32)> {
        let (width, height) = self.window.drawable_size();
        if width == 0 || height == 0 {
            None
        } else {
            Some((width, height))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names() {
        assert_eq!(error_name(0x0502), "GL_INVALID_OPERATION");
        assert_eq!(error_name(0x0505), "GL_OUT_OF_MEMORY");
        assert_eq!(error_name(0x1234), "unknown GL error");
    }

    #[test]
    fn test_to_gl_size() {
        assert_eq!(to_gl_size(800, 600), Ok((800, 600)));
        assert!(to_gl_size(0, 600).is_err());
        assert!(to_gl_size(u32::MAX, 1).is_err());
    }

    #[test]
    fn test_default_framebuffer_resize_records_size() {
        let mut fb = GlDefaultFramebuffer::new(640, 480);
        fb.resize(1280, 720, PlatformFlags::CURRENT).unwrap();
        assert_eq!((fb.width(), fb.height()), (1280, 720));
        assert!(fb
            .draw(10, 10, ScalingAlgorithm::Nearest)
            .is_err());
    }
}
