//! The slice of the OpenXR API that the bridge drives.
//!
//! `XrBridge` only ever talks to the runtime through this trait, which keeps the session state
//! machine independent of the loader. `OpenXrRuntime` is the real implementation.

/// Application metadata handed to the runtime on instance creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
}

/// Diagnostic information about the loaded runtime
#[derive(Debug, Clone)]
pub struct RuntimeProperties {
    pub runtime_name: String,
    pub runtime_version: xr::Version,
}

/// Diagnostic information about the headset
#[derive(Debug, Clone)]
pub struct SystemProperties {
    pub system_name: String,
    pub vendor_id: u32,
}

/// Graphics API versions the runtime can work with
#[derive(Debug, Clone, Copy)]
pub struct GraphicsRequirements {
    pub min_api_version_supported: xr::Version,
    pub max_api_version_supported: xr::Version,
}

/// Recommended render target for one view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    pub recommended_width: u32,
    pub recommended_height: u32,
    pub recommended_sample_count: u32,
}

/// Parameters of one eye swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainSpec {
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
}

/// Result of waiting for the compositor
#[derive(Debug, Clone, Copy)]
pub struct FrameState {
    pub predicted_display_time: xr::Time,
    pub should_render: bool,
}

/// One eye's located pose and field of view
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub pose: xr::Posef,
    pub fov: xr::Fovf,
}

/// One eye's entry in a projection layer; the whole image of `swapchain` is submitted
pub struct ProjectionView<'a, S> {
    pub pose: xr::Posef,
    pub fov: xr::Fovf,
    pub swapchain: &'a S,
    pub width: u32,
    pub height: u32,
}

/// A stereo projection layer, resolved against `space`
pub struct ProjectionLayer<'a, Sp, S> {
    pub space: &'a Sp,
    pub views: &'a [ProjectionView<'a, S>],
}

/// Events the bridge reacts to. Anything else the runtime sends arrives as `Other`.
#[derive(Debug, Clone, Copy)]
pub enum RuntimeEvent {
    EventsLost {
        count: u32,
    },
    InstanceLossPending {
        loss_time: xr::Time,
    },
    ReferenceSpaceChangePending {
        session: xr::sys::Session,
        space_type: xr::ReferenceSpaceType,
    },
    SessionStateChanged {
        session: xr::sys::Session,
        state: xr::SessionState,
        time: xr::Time,
    },
    Other,
}

/// The OpenXR calls issued by the bridge, in roughly the order it issues them. Every fallible call
/// returns the runtime's raw result code; the bridge decides what is fatal.
pub trait XrRuntime {
    /// A runtime-owned ring of images for one eye
    type Swapchain;
    /// A tracking reference space
    type Space;

    fn available_api_layers(&mut self) -> xr::Result<Vec<String>>;
    fn available_extensions(&mut self) -> xr::Result<Vec<String>>;
    fn create_instance(
        &mut self,
        app: &AppInfo,
        extensions: &[String],
        layers: &[String],
    ) -> xr::Result<()>;
    /// Make sure the extension entry points the bridge needs are loaded
    fn load_graphics_functions(&mut self) -> xr::Result<()>;
    fn instance_properties(&mut self) -> xr::Result<RuntimeProperties>;
    /// Resolve the head-mounted display
    fn resolve_system(&mut self) -> xr::Result<()>;
    fn system_properties(&mut self) -> xr::Result<SystemProperties>;
    fn graphics_requirements(&mut self) -> xr::Result<GraphicsRequirements>;
    /// Create the session, binding whichever graphics context is current
    fn create_session(&mut self) -> xr::Result<()>;
    /// Raw handle of the owned session, used to filter events
    fn session_handle(&self) -> Option<xr::sys::Session>;

    /// Next queued event, or `None` once the queue is drained
    fn poll_event(&mut self) -> xr::Result<Option<RuntimeEvent>>;

    fn begin_session(&mut self) -> xr::Result<()>;
    fn end_session(&mut self) -> xr::Result<()>;
    fn request_exit(&mut self) -> xr::Result<()>;
    fn view_configuration_views(&mut self) -> xr::Result<Vec<ViewConfig>>;
    fn swapchain_formats(&mut self) -> xr::Result<Vec<u32>>;
    fn create_swapchain(&mut self, spec: &SwapchainSpec) -> xr::Result<Self::Swapchain>;
    /// Native texture names of every image in the swapchain
    fn enumerate_swapchain_images(&mut self, swapchain: &Self::Swapchain) -> xr::Result<Vec<u32>>;
    fn destroy_swapchain(&mut self, swapchain: Self::Swapchain) -> xr::Result<()>;
    fn create_reference_space(
        &mut self,
        space_type: xr::ReferenceSpaceType,
        pose: xr::Posef,
    ) -> xr::Result<Self::Space>;
    fn destroy_space(&mut self, space: Self::Space) -> xr::Result<()>;

    fn wait_frame(&mut self) -> xr::Result<FrameState>;
    fn begin_frame(&mut self) -> xr::Result<()>;
    fn locate_views(&mut self, space: &Self::Space, display_time: xr::Time)
        -> xr::Result<Vec<View>>;
    fn acquire_image(&mut self, swapchain: &mut Self::Swapchain) -> xr::Result<u32>;
    fn wait_image(&mut self, swapchain: &mut Self::Swapchain, timeout: xr::Duration)
        -> xr::Result<()>;
    fn release_image(&mut self, swapchain: &mut Self::Swapchain) -> xr::Result<()>;
    /// Submit the frame. `None` submits no layers at all.
    fn end_frame(
        &mut self,
        display_time: xr::Time,
        blend_mode: xr::EnvironmentBlendMode,
        layer: Option<ProjectionLayer<'_, Self::Space, Self::Swapchain>>,
    ) -> xr::Result<()>;

    /// Destroy the session if one exists
    fn destroy_session(&mut self);
    /// Destroy the instance if one exists
    fn destroy_instance(&mut self);
}
