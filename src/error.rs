use crate::capability::CapabilityKind;
use log::error;
use thiserror::Error;

/// Why the runtime ended the session for good
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The runtime is shutting the application down (`XR_SESSION_STATE_EXITING`)
    Exiting,
    /// The session is about to be lost (`XR_SESSION_STATE_LOSS_PENDING`)
    LossPending,
}

/// Misuse of the bridge by its caller. These are detected and rejected, never ignored.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("this method cannot be called from inside the render callback")]
    Reentrant,
    #[error("this object has not been initialized yet")]
    NotInitialized,
    #[error("this object has already been initialized")]
    AlreadyInitialized,
    #[error("initialization failed; the object can only be freed")]
    InitFailed,
    #[error("this object has already been freed")]
    AlreadyFreed,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{kind} {name:?} is not available")]
    CapabilityUnavailable { kind: CapabilityKind, name: String },
    #[error("OpenXR call failed while {operation}: {result}")]
    Runtime {
        operation: &'static str,
        result: xr::sys::Result,
    },
    #[error("failed to load the OpenXR loader: {0}")]
    Loader(String),
    #[error("runtime reported {count} views for the stereo configuration, expected 2")]
    ViewCountMismatch { count: usize },
    #[error("OpenGL {found} is older than the runtime minimum of {required}")]
    GraphicsVersionUnsupported {
        found: xr::Version,
        required: xr::Version,
    },
    #[error("failed to bind swapchain image {image} to a framebuffer: {reason}")]
    Framebuffer { image: u32, reason: String },
    #[error("runtime returned swapchain image index {index}, but only {count} images exist")]
    ImageIndexOutOfRange { index: u32, count: usize },
    #[error("invalid clipping planes (near = {near}, far = {far})")]
    InvalidClippingPlanes { near: f32, far: f32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("the OpenXR instance is about to be lost; recovery is not supported")]
    InstanceLost,
    #[error("the session has terminated ({0:?})")]
    Terminated(ExitReason),
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Attaches the name of the failed operation to a raw OpenXR result
pub(crate) trait XrResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T> XrResultExt<T> for xr::Result<T> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|result| {
            error!("OpenXR error while {}: {}", operation, result);
            BridgeError::Runtime { operation, result }
        })
    }
}
