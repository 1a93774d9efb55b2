use anyhow::{bail, Result};
use glow::HasContext;
use std::num::NonZeroU32;

/// The graphics side of a swapchain image binding: one framebuffer per runtime-owned image.
pub trait Graphics {
    /// Handed to the render callback for the acquired image
    type Framebuffer;

    /// Version of the graphics API the context was created with
    fn api_version(&self) -> xr::Version;

    /// Wrap a runtime-owned color texture in a framebuffer with a matching depth buffer
    fn create_framebuffer(
        &self,
        color: u32,
        width: u32,
        height: u32,
        samples: u32,
    ) -> Result<Self::Framebuffer>;

    fn destroy_framebuffer(&self, framebuffer: Self::Framebuffer);

    /// Return rendering to the default framebuffer
    fn unbind_framebuffer(&self);
}

/// An OpenGL framebuffer drawing into one swapchain image
pub struct GlFramebuffer {
    pub framebuffer: glow::NativeFramebuffer,
    pub depth: glow::NativeRenderbuffer,
    pub width: u32,
    pub height: u32,
    freed: bool,
}

impl GlFramebuffer {
    /// Bind for drawing and set the viewport to cover the whole image
    pub fn bind(&self, gl: &glow::Context) {
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.framebuffer));
            gl.viewport(0, 0, self.width as i32, self.height as i32);
        }
    }
}

impl Drop for GlFramebuffer {
    fn drop(&mut self) {
        if !self.freed && !std::thread::panicking() {
            panic!("GlFramebuffer dropped before it was freed");
        }
    }
}

/// `Graphics` on top of a `glow` context
pub struct GlowGraphics {
    gl: glow::Context,
}

impl GlowGraphics {
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

impl Graphics for GlowGraphics {
    type Framebuffer = GlFramebuffer;

    fn api_version(&self) -> xr::Version {
        let version = self.gl.version();
        xr::Version::new(version.major as u16, version.minor as u16, 0)
    }

    fn create_framebuffer(
        &self,
        color: u32,
        width: u32,
        height: u32,
        samples: u32,
    ) -> Result<GlFramebuffer> {
        let color = match NonZeroU32::new(color) {
            Some(name) => glow::NativeTexture(name),
            None => bail!("Swapchain image has no texture name"),
        };
        let multisampled = samples > 1;
        let texture_target = if multisampled {
            glow::TEXTURE_2D_MULTISAMPLE
        } else {
            glow::TEXTURE_2D
        };

        let gl = &self.gl;
        unsafe {
            let framebuffer = gl.create_framebuffer().map_err(anyhow::Error::msg)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            // Color attachment
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                texture_target,
                Some(color),
                0,
            );

            // Depth attachment
            let depth = match gl.create_renderbuffer() {
                Ok(depth) => depth,
                Err(e) => {
                    gl.bind_framebuffer(glow::FRAMEBUFFER, None);
                    gl.delete_framebuffer(framebuffer);
                    bail!(e);
                }
            };
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
            if multisampled {
                gl.renderbuffer_storage_multisample(
                    glow::RENDERBUFFER,
                    samples as i32,
                    glow::DEPTH_COMPONENT24,
                    width as i32,
                    height as i32,
                );
            } else {
                gl.renderbuffer_storage(
                    glow::RENDERBUFFER,
                    glow::DEPTH_COMPONENT24,
                    width as i32,
                    height as i32,
                );
            }
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth),
            );

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_renderbuffer(depth);
                gl.delete_framebuffer(framebuffer);
                bail!("Framebuffer incomplete (status 0x{:X})", status);
            }

            Ok(GlFramebuffer {
                framebuffer,
                depth,
                width,
                height,
                freed: false,
            })
        }
    }

    fn destroy_framebuffer(&self, mut framebuffer: GlFramebuffer) {
        unsafe {
            self.gl.delete_framebuffer(framebuffer.framebuffer);
            self.gl.delete_renderbuffer(framebuffer.depth);
        }
        framebuffer.freed = true;
    }

    fn unbind_framebuffer(&self) {
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }
}
