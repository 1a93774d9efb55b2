//! Native handles of the OpenGL context current on the calling thread, in the form the runtime
//! needs to bind a session to it.

#[cfg(target_os = "linux")]
pub fn current_session_create_info() -> Option<xr::opengl::SessionCreateInfo> {
    use log::debug;
    use std::os::raw::c_int;
    use x11::{glx, xlib};

    unsafe {
        let display = glx::glXGetCurrentDisplay();
        let context = glx::glXGetCurrentContext();
        let drawable = glx::glXGetCurrentDrawable();
        if display.is_null() || context.is_null() || drawable == 0 {
            debug!("No GLX context is current");
            return None;
        }

        // Recover the framebuffer config and visual the context was created from
        let mut fb_config_id: c_int = 0;
        if glx::glXQueryContext(display, context, glx::GLX_FBCONFIG_ID, &mut fb_config_id) != 0 {
            return None;
        }

        let screen = xlib::XDefaultScreen(display);
        let attrs = [glx::GLX_FBCONFIG_ID, fb_config_id, 0];
        let mut count = 0;
        let fb_configs = glx::glXChooseFBConfig(display, screen, attrs.as_ptr(), &mut count);
        if fb_configs.is_null() || count == 0 {
            return None;
        }
        let fb_config = *fb_configs;
        xlib::XFree(fb_configs as *mut _);

        let visual_info = glx::glXGetVisualFromFBConfig(display, fb_config);
        if visual_info.is_null() {
            return None;
        }
        let visualid = (*visual_info).visualid;
        xlib::XFree(visual_info as *mut _);

        Some(xr::opengl::SessionCreateInfo::Xlib {
            x_display: display as *mut _,
            visualid: visualid as u32,
            glx_fb_config: fb_config as *mut _,
            glx_drawable: drawable,
            glx_context: context as *mut _,
        })
    }
}

#[cfg(target_os = "windows")]
pub fn current_session_create_info() -> Option<xr::opengl::SessionCreateInfo> {
    use windows::Win32::Graphics::OpenGL::{wglGetCurrentContext, wglGetCurrentDC};

    let (h_dc, h_glrc) = unsafe { (wglGetCurrentDC(), wglGetCurrentContext()) };
    if h_dc.is_invalid() || h_glrc.is_invalid() {
        return None;
    }

    Some(xr::opengl::SessionCreateInfo::Windows {
        h_dc: h_dc.0 as _,
        h_glrc: h_glrc.0 as _,
    })
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
pub fn current_session_create_info() -> Option<xr::opengl::SessionCreateInfo> {
    None
}
