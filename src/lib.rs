//! OpenXR session and frame loop for OpenGL renderers. The bridge creates the instance and
//! session, follows the runtime's session state machine through `update()`, owns one swapchain
//! and one framebuffer per image for each eye, and hands each eye to a render callback during
//! `render()`.
extern crate openxr as xr;
mod bridge;
pub mod capability;
mod config;
mod error;
mod graphics;
mod openxr_runtime;
mod platform;
pub mod projection;
pub mod runtime;
#[cfg(test)]
mod mock;
pub use bridge::{Eye, EyeFrame, PumpStatus, XrBridge};
pub use config::{BridgeConfig, ClippingPlanes, KHR_OPENGL_ENABLE};
pub use error::{BridgeError, ContractViolation, ExitReason, Result};
pub use graphics::{GlFramebuffer, GlowGraphics, Graphics};
pub use openxr_runtime::OpenXrRuntime;
pub use runtime::XrRuntime;
