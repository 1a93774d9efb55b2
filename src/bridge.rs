use crate::capability::{self, CapabilityKind};
use crate::config::{BridgeConfig, ClippingPlanes};
use crate::error::{BridgeError, ContractViolation, ExitReason, Result, XrResultExt};
use crate::graphics::Graphics;
use crate::projection::{projection_from_fov, view_from_pose};
use crate::runtime::{
    AppInfo, GraphicsRequirements, ProjectionLayer, ProjectionView, RuntimeEvent, SwapchainSpec,
    View, XrRuntime,
};
use log::{debug, error, info, warn};
use nalgebra::Matrix4;
use std::cell::{Cell, RefCell};

/// Longest application or engine name the runtime accepts, excluding the terminator
const MAX_NAME_BYTES: usize = 127;
/// Stereo only
const VIEW_COUNT: usize = 2;
const BLEND_MODE: xr::EnvironmentBlendMode = xr::EnvironmentBlendMode::OPAQUE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    /// View index reported by the runtime for this eye
    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

/// Everything the render callback needs to draw one eye
pub struct EyeFrame<'a, F> {
    pub eye: Eye,
    /// Framebuffer wrapping the acquired swapchain image
    pub framebuffer: &'a F,
    pub projection: Matrix4<f32>,
    /// Camera-to-world transform of the eye (translation * rotation)
    pub view: Matrix4<f32>,
    pub width: u32,
    pub height: u32,
}

impl<F> EyeFrame<'_, F> {
    /// World-to-camera transform, the inverse of `view`
    pub fn world_to_eye(&self) -> Matrix4<f32> {
        self.view.try_inverse().unwrap_or_else(Matrix4::identity)
    }
}

/// Outcome of draining the event queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// Keep calling `render()`
    Continue,
    /// The runtime is done with this session. Stop rendering and `free()` the bridge.
    Exit(ExitReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Uninitialized,
    Ready,
    Failed,
    Terminated(ExitReason),
    Lost,
    Freed,
}

struct EyeSwapchain<S, F> {
    swapchain: S,
    spec: SwapchainSpec,
    framebuffers: Vec<F>,
}

/// Everything that only exists while a session is running
struct SessionResources<S, Sp, F> {
    eyes: Vec<EyeSwapchain<S, F>>,
    space: Option<Sp>,
}

impl<S, Sp, F> Default for SessionResources<S, Sp, F> {
    fn default() -> Self {
        Self {
            eyes: Vec::new(),
            space: None,
        }
    }
}

impl<S, Sp, F> SessionResources<S, Sp, F> {
    fn is_complete(&self) -> bool {
        self.eyes.len() == VIEW_COUNT && self.space.is_some()
    }
}

type Resources<R, G> = SessionResources<
    <R as XrRuntime>::Swapchain,
    <R as XrRuntime>::Space,
    <G as Graphics>::Framebuffer,
>;

/// Drives an OpenXR session that renders through OpenGL.
///
/// Call `init()` once, then `update()` and `render()` once per tick, and `free()` before the
/// OpenGL context goes away. All methods take `&self` so that a render callback may hold a
/// reference to the bridge; calling `update()`, `render()`, `request_exit()`, `init()` or
/// `free()` from inside the callback is rejected with `ContractViolation::Reentrant`.
///
/// The bridge is not thread safe.
pub struct XrBridge<R: XrRuntime, G: Graphics> {
    runtime: RefCell<R>,
    graphics: G,
    config: BridgeConfig,
    clipping: Cell<ClippingPlanes>,
    status: Cell<Status>,
    rendering: Cell<bool>,
    session_state: Cell<xr::SessionState>,
    session_running: Cell<bool>,
    resources: RefCell<Resources<R, G>>,
}

impl<R: XrRuntime, G: Graphics> XrBridge<R, G> {
    pub fn new(runtime: R, graphics: G, config: BridgeConfig) -> Self {
        Self {
            runtime: RefCell::new(runtime),
            graphics,
            clipping: Cell::new(config.clipping),
            config,
            status: Cell::new(Status::Uninitialized),
            rendering: Cell::new(false),
            session_state: Cell::new(xr::SessionState::UNKNOWN),
            session_running: Cell::new(false),
            resources: RefCell::new(SessionResources::default()),
        }
    }

    /// Connect to the runtime and create a session bound to the OpenGL context current on this
    /// thread. On failure the bridge can only be freed.
    pub fn init(&self, application_name: &str) -> Result<()> {
        if self.rendering.get() {
            return Err(violation(ContractViolation::Reentrant));
        }
        match self.status.get() {
            Status::Uninitialized => (),
            Status::Freed => return Err(violation(ContractViolation::AlreadyFreed)),
            _ => return Err(violation(ContractViolation::AlreadyInitialized)),
        }

        match self.bootstrap(application_name) {
            Ok(()) => {
                self.status.set(Status::Ready);
                Ok(())
            }
            Err(e) => {
                error!("Initialization failed: {}", e);
                self.status.set(Status::Failed);
                Err(e)
            }
        }
    }

    fn bootstrap(&self, application_name: &str) -> Result<()> {
        let app = AppInfo {
            application_name: truncate_name("Application", application_name),
            application_version: self.config.application_version,
            engine_name: truncate_name("Engine", &self.config.engine_name),
            engine_version: self.config.engine_version,
        };

        let mut runtime = self.runtime.borrow_mut();

        debug!("Querying API layers and extensions");
        let available_layers = runtime
            .available_api_layers()
            .during("enumerating API layers")?;
        let layers = capability::resolve(
            CapabilityKind::ApiLayer,
            &self.config.required_layers,
            &available_layers,
        )?;
        let available_extensions = runtime
            .available_extensions()
            .during("enumerating extensions")?;
        let extensions = capability::resolve(
            CapabilityKind::Extension,
            &self.config.required_extensions,
            &available_extensions,
        )?;

        debug!("Creating instance for {:?}", app.application_name);
        runtime
            .create_instance(&app, &extensions, &layers)
            .during("creating the instance")?;

        debug!("Loading graphics functions");
        runtime
            .load_graphics_functions()
            .during("loading graphics functions")?;

        let props = runtime
            .instance_properties()
            .during("querying instance properties")?;
        info!(
            "Loaded OpenXR runtime: {} {}",
            props.runtime_name, props.runtime_version
        );

        debug!("Locating a head-mounted display");
        runtime
            .resolve_system()
            .during("locating a head-mounted display")?;
        let system = runtime
            .system_properties()
            .during("querying system properties")?;
        info!(
            "Using system {:?} (vendor 0x{:X})",
            system.system_name, system.vendor_id
        );

        let requirements = runtime
            .graphics_requirements()
            .during("querying OpenGL requirements")?;
        self.check_graphics_version(&requirements)?;

        debug!("Creating session");
        runtime.create_session().during("creating the session")?;
        Ok(())
    }

    fn check_graphics_version(&self, requirements: &GraphicsRequirements) -> Result<()> {
        let found = self.graphics.api_version();
        let min = requirements.min_api_version_supported;
        let max = requirements.max_api_version_supported;
        info!(
            "OpenGL {}.{}, runtime supports {} to {}",
            found.major(),
            found.minor(),
            min,
            max
        );

        if (found.major(), found.minor()) < (min.major(), min.minor()) {
            if self.config.enforce_graphics_requirements {
                error!("OpenGL {} is older than the runtime minimum {}", found, min);
                return Err(BridgeError::GraphicsVersionUnsupported {
                    found,
                    required: min,
                });
            }
            warn!(
                "OpenGL {} is older than the runtime minimum {}, continuing anyway",
                found, min
            );
        }

        if found.major() > max.major() {
            warn!(
                "OpenGL {} is newer than the runtime has been tested with ({})",
                found, max
            );
        }
        Ok(())
    }

    /// Drain the runtime's event queue, beginning and ending the session as the runtime asks.
    /// Call once per tick, before `render()`.
    pub fn update(&self) -> Result<PumpStatus> {
        self.check_usable()?;

        loop {
            let event = self.runtime.borrow_mut().poll_event().during("polling events")?;
            let event = match event {
                Some(event) => event,
                None => return Ok(PumpStatus::Continue),
            };

            match event {
                RuntimeEvent::EventsLost { count } => {
                    warn!("Runtime lost {} events", count);
                }
                RuntimeEvent::InstanceLossPending { loss_time } => {
                    error!("Instance will be lost at {:?}", loss_time);
                    self.lose_instance();
                    return Err(BridgeError::InstanceLost);
                }
                RuntimeEvent::ReferenceSpaceChangePending {
                    session,
                    space_type,
                } => {
                    if !self.owns(session) {
                        continue;
                    }
                    debug!("Reference space {:?} is changing", space_type);
                    let ours = space_type == self.config.reference_space;
                    if ours && self.config.recreate_space_on_change {
                        self.recreate_space()?;
                    }
                }
                RuntimeEvent::SessionStateChanged { session, state, .. } => {
                    if !self.owns(session) {
                        debug!("Ignoring state change of a foreign session");
                        continue;
                    }
                    debug!("Session state changed to {:?}", state);
                    self.session_state.set(state);
                    match state {
                        xr::SessionState::READY => self.begin_session()?,
                        xr::SessionState::STOPPING => self.end_session()?,
                        xr::SessionState::LOSS_PENDING => {
                            return Ok(self.terminate(ExitReason::LossPending))
                        }
                        xr::SessionState::EXITING => {
                            return Ok(self.terminate(ExitReason::Exiting))
                        }
                        _ => (),
                    }
                }
                RuntimeEvent::Other => (),
            }
        }
    }

    fn owns(&self, session: xr::sys::Session) -> bool {
        self.runtime.borrow().session_handle() == Some(session)
    }

    fn terminate(&self, reason: ExitReason) -> PumpStatus {
        info!("Session terminated ({:?})", reason);
        self.status.set(Status::Terminated(reason));
        PumpStatus::Exit(reason)
    }

    fn lose_instance(&self) {
        if let Err(e) = self.release_resources() {
            warn!("Failed to release session resources: {}", e);
        }
        self.session_running.set(false);
        let mut runtime = self.runtime.borrow_mut();
        runtime.destroy_session();
        runtime.destroy_instance();
        self.status.set(Status::Lost);
    }

    fn recreate_space(&self) -> Result<()> {
        let mut runtime = self.runtime.borrow_mut();
        let mut resources = self.resources.borrow_mut();
        if resources.space.is_none() {
            return Ok(());
        }
        debug!("Recreating reference space");
        // The old space stays in place until its replacement exists
        let space = runtime
            .create_reference_space(self.config.reference_space, xr::Posef::IDENTITY)
            .during("creating the reference space")?;
        if let Some(old) = resources.space.replace(space) {
            runtime
                .destroy_space(old)
                .during("destroying the reference space")?;
        }
        Ok(())
    }

    fn begin_session(&self) -> Result<()> {
        info!("Beginning session");
        self.runtime
            .borrow_mut()
            .begin_session()
            .during("beginning the session")?;
        self.session_running.set(true);

        if let Err(e) = self.create_resources() {
            if let Err(cleanup) = self.release_resources() {
                warn!("Failed to release partial session resources: {}", cleanup);
            }
            return Err(e);
        }
        Ok(())
    }

    fn create_resources(&self) -> Result<()> {
        let mut runtime = self.runtime.borrow_mut();
        let mut resources = self.resources.borrow_mut();

        let views = runtime
            .view_configuration_views()
            .during("enumerating view configurations")?;
        if views.len() != VIEW_COUNT {
            error!("Expected {} views, runtime reported {}", VIEW_COUNT, views.len());
            return Err(BridgeError::ViewCountMismatch { count: views.len() });
        }

        let formats = runtime
            .swapchain_formats()
            .during("enumerating swapchain formats")?;
        let format = self.pick_format(&formats)?;

        for (index, view) in views.iter().enumerate() {
            let spec = SwapchainSpec {
                format,
                width: view.recommended_width,
                height: view.recommended_height,
                sample_count: view.recommended_sample_count,
            };
            debug!(
                "Eye {} swapchain: {}x{}, {} samples",
                index, spec.width, spec.height, spec.sample_count
            );
            let swapchain = runtime
                .create_swapchain(&spec)
                .during("creating a swapchain")?;

            let mut eye = EyeSwapchain {
                swapchain,
                spec,
                framebuffers: Vec::new(),
            };
            let bound = self.bind_images(&mut *runtime, &mut eye);
            resources.eyes.push(eye);
            bound?;
        }

        resources.space = Some(
            runtime
                .create_reference_space(self.config.reference_space, xr::Posef::IDENTITY)
                .during("creating the reference space")?,
        );
        Ok(())
    }

    fn pick_format(&self, formats: &[u32]) -> Result<u32> {
        let wanted = self.config.swapchain_format;
        if formats.contains(&wanted) {
            return Ok(wanted);
        }
        match formats.first() {
            Some(&fallback) => {
                warn!(
                    "Swapchain format 0x{:X} is not supported, using 0x{:X}",
                    wanted, fallback
                );
                Ok(fallback)
            }
            None => Err(BridgeError::InvalidConfig(
                "runtime advertises no swapchain formats".into(),
            )),
        }
    }

    fn bind_images(
        &self,
        runtime: &mut R,
        eye: &mut EyeSwapchain<R::Swapchain, G::Framebuffer>,
    ) -> Result<()> {
        let images = runtime
            .enumerate_swapchain_images(&eye.swapchain)
            .during("enumerating swapchain images")?;
        for (image, color) in images.into_iter().enumerate() {
            let framebuffer = self
                .graphics
                .create_framebuffer(
                    color,
                    eye.spec.width,
                    eye.spec.height,
                    eye.spec.sample_count,
                )
                .map_err(|e| {
                    error!("Failed to create framebuffer for image {}: {:#}", image, e);
                    BridgeError::Framebuffer {
                        image: image as u32,
                        reason: format!("{:#}", e),
                    }
                })?;
            eye.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    /// Destroy framebuffers, then swapchains, then the reference space. Keeps going past
    /// failures and reports the first one.
    fn release_resources(&self) -> Result<()> {
        let mut runtime = self.runtime.borrow_mut();
        let resources = std::mem::take(&mut *self.resources.borrow_mut());
        let mut first_error = None;

        let mut swapchains = Vec::with_capacity(resources.eyes.len());
        for eye in resources.eyes {
            for framebuffer in eye.framebuffers {
                self.graphics.destroy_framebuffer(framebuffer);
            }
            swapchains.push(eye.swapchain);
        }
        for swapchain in swapchains {
            if let Err(e) = runtime
                .destroy_swapchain(swapchain)
                .during("destroying a swapchain")
            {
                first_error.get_or_insert(e);
            }
        }

        if let Some(space) = resources.space {
            if let Err(e) = runtime
                .destroy_space(space)
                .during("destroying the reference space")
            {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Safe to call any number of times
    fn end_session(&self) -> Result<()> {
        let released = self.release_resources();
        if self.session_running.replace(false) {
            info!("Ending session");
            self.runtime
                .borrow_mut()
                .end_session()
                .during("ending the session")?;
        }
        released
    }

    /// Run one frame of the frame protocol, calling `callback` for the left eye then the right.
    /// Returns whether a projection layer was submitted. Does nothing while no session is
    /// running.
    ///
    /// The callback must not panic: a panic leaves the bridge marked as rendering, and every
    /// later call is rejected.
    pub fn render<F>(&self, mut callback: F) -> Result<bool>
    where
        F: FnMut(EyeFrame<'_, G::Framebuffer>),
    {
        self.check_usable()?;
        if !self.session_running.get() {
            return Ok(false);
        }

        self.rendering.set(true);
        let result = self.render_frame(&mut callback);
        self.rendering.set(false);
        result
    }

    fn render_frame<F>(&self, callback: &mut F) -> Result<bool>
    where
        F: FnMut(EyeFrame<'_, G::Framebuffer>),
    {
        let frame_state = self
            .runtime
            .borrow_mut()
            .wait_frame()
            .during("waiting for a frame")?;
        self.runtime
            .borrow_mut()
            .begin_frame()
            .during("beginning a frame")?;
        let display_time = frame_state.predicted_display_time;

        let active = matches!(
            self.session_state.get(),
            xr::SessionState::SYNCHRONIZED | xr::SessionState::VISIBLE | xr::SessionState::FOCUSED
        );
        let complete = self.resources.borrow().is_complete();
        if active && frame_state.should_render && !complete {
            warn!("Session resources are incomplete, submitting an empty frame");
        }
        let draw = active && frame_state.should_render && complete;

        let result = if draw {
            self.draw_eyes(callback, display_time)
                .and_then(|views| self.submit(display_time, Some(views.as_slice())))
        } else {
            self.submit(display_time, None)
        };

        if result.is_err() {
            // A begun frame has to be ended, with or without content
            if let Err(e) = self
                .runtime
                .borrow_mut()
                .end_frame(display_time, BLEND_MODE, None)
            {
                warn!("Failed to abandon the frame: {}", e);
            }
        }
        result
    }

    fn draw_eyes<F>(&self, callback: &mut F, display_time: xr::Time) -> Result<Vec<View>>
    where
        F: FnMut(EyeFrame<'_, G::Framebuffer>),
    {
        let views = {
            let resources = self.resources.borrow();
            let space = resources
                .space
                .as_ref()
                .ok_or(BridgeError::Runtime {
                    operation: "locating views",
                    result: xr::sys::Result::ERROR_HANDLE_INVALID,
                })?;
            let located = self
                .runtime
                .borrow_mut()
                .locate_views(space, display_time)
                .during("locating views")?;
            located
        };
        if views.len() != VIEW_COUNT {
            error!("Located {} views, expected {}", views.len(), VIEW_COUNT);
            return Err(BridgeError::ViewCountMismatch { count: views.len() });
        }

        for (&eye, located) in Eye::BOTH.iter().zip(&views) {
            let image = self.acquire(eye)?;

            let clipping = self.clipping.get();
            {
                let resources = self.resources.borrow();
                let swapchain = &resources.eyes[eye.index()];
                callback(EyeFrame {
                    eye,
                    framebuffer: &swapchain.framebuffers[image],
                    projection: projection_from_fov(&located.fov, clipping.near, clipping.far),
                    view: view_from_pose(&located.pose),
                    width: swapchain.spec.width,
                    height: swapchain.spec.height,
                });
            }

            let mut resources = self.resources.borrow_mut();
            self.runtime
                .borrow_mut()
                .release_image(&mut resources.eyes[eye.index()].swapchain)
                .during("releasing a swapchain image")?;
        }

        self.graphics.unbind_framebuffer();
        Ok(views)
    }

    /// Acquire the runtime's next image for `eye` and wait until it can be drawn into
    fn acquire(&self, eye: Eye) -> Result<usize> {
        let mut runtime = self.runtime.borrow_mut();
        let mut resources = self.resources.borrow_mut();
        let swapchain = &mut resources.eyes[eye.index()];

        let image = runtime
            .acquire_image(&mut swapchain.swapchain)
            .during("acquiring a swapchain image")?;
        let count = swapchain.framebuffers.len();
        let waited = if image as usize >= count {
            error!("Runtime returned image {} of {}", image, count);
            Err(BridgeError::ImageIndexOutOfRange { index: image, count })
        } else {
            runtime
                .wait_image(&mut swapchain.swapchain, xr::Duration::INFINITE)
                .during("waiting for a swapchain image")
        };

        if let Err(e) = waited {
            // An acquired image goes back to the ring even when it is never drawn
            if let Err(release) = runtime.release_image(&mut swapchain.swapchain) {
                warn!("Failed to release swapchain image {}: {:?}", image, release);
            }
            return Err(e);
        }
        Ok(image as usize)
    }

    fn submit(&self, display_time: xr::Time, views: Option<&[View]>) -> Result<bool> {
        let resources = self.resources.borrow();
        let mut runtime = self.runtime.borrow_mut();

        let (views, space) = match (views, resources.space.as_ref()) {
            (Some(views), Some(space)) => (views, space),
            _ => {
                runtime
                    .end_frame(display_time, BLEND_MODE, None)
                    .during("ending a frame")?;
                return Ok(false);
            }
        };

        let projection_views = views
            .iter()
            .zip(&resources.eyes)
            .map(|(view, eye)| ProjectionView {
                pose: view.pose,
                fov: view.fov,
                swapchain: &eye.swapchain,
                width: eye.spec.width,
                height: eye.spec.height,
            })
            .collect::<Vec<_>>();

        runtime
            .end_frame(
                display_time,
                BLEND_MODE,
                Some(ProjectionLayer {
                    space,
                    views: &projection_views,
                }),
            )
            .during("ending a frame")?;
        Ok(true)
    }

    /// Ask the runtime to wind the session down. It answers with STOPPING and then EXITING
    /// through `update()`. Returns false if no session is running, in which case there is
    /// nothing to wait for.
    pub fn request_exit(&self) -> Result<bool> {
        self.check_usable()?;
        if !self.session_running.get() {
            return Ok(false);
        }
        info!("Requesting session exit");
        self.runtime
            .borrow_mut()
            .request_exit()
            .during("requesting exit")?;
        Ok(true)
    }

    /// Release every runtime object. Must be called before the OpenGL context is destroyed.
    pub fn free(&self) -> Result<()> {
        if self.rendering.get() {
            return Err(violation(ContractViolation::Reentrant));
        }
        match self.status.get() {
            Status::Uninitialized => return Err(violation(ContractViolation::NotInitialized)),
            Status::Freed => return Err(violation(ContractViolation::AlreadyFreed)),
            _ => (),
        }

        let ended = self.end_session();
        let mut runtime = self.runtime.borrow_mut();
        runtime.destroy_session();
        runtime.destroy_instance();
        self.status.set(Status::Freed);
        ended
    }

    /// Set the near and far clipping distances used for the next eye rendered. May be called
    /// from the render callback.
    pub fn set_clipping_planes(&self, near: f32, far: f32) -> Result<()> {
        self.clipping.set(ClippingPlanes::new(near, far)?);
        Ok(())
    }

    pub fn clipping_planes(&self) -> ClippingPlanes {
        self.clipping.get()
    }

    pub fn session_state(&self) -> xr::SessionState {
        self.session_state.get()
    }

    pub fn is_session_running(&self) -> bool {
        self.session_running.get()
    }

    pub fn swapchain_count(&self) -> usize {
        self.resources.borrow().eyes.len()
    }

    /// Pixel size of each eye's swapchain
    pub fn swapchain_extents(&self) -> Vec<(u32, u32)> {
        self.resources
            .borrow()
            .eyes
            .iter()
            .map(|eye| (eye.spec.width, eye.spec.height))
            .collect()
    }

    pub fn has_reference_space(&self) -> bool {
        self.resources.borrow().space.is_some()
    }

    pub fn graphics(&self) -> &G {
        &self.graphics
    }

    fn check_usable(&self) -> Result<()> {
        if self.rendering.get() {
            return Err(violation(ContractViolation::Reentrant));
        }
        match self.status.get() {
            Status::Ready => Ok(()),
            Status::Uninitialized => Err(violation(ContractViolation::NotInitialized)),
            Status::Failed => Err(violation(ContractViolation::InitFailed)),
            Status::Freed => Err(violation(ContractViolation::AlreadyFreed)),
            Status::Terminated(reason) => Err(BridgeError::Terminated(reason)),
            Status::Lost => Err(BridgeError::InstanceLost),
        }
    }
}

impl<R: XrRuntime, G: Graphics> Drop for XrBridge<R, G> {
    fn drop(&mut self) {
        if self.rendering.get() {
            // A render callback panicked; the frame protocol is in an unknown state
            error!("XrBridge dropped mid-frame, leaking its runtime objects");
            std::mem::forget(std::mem::take(self.resources.get_mut()));
            return;
        }
        match self.status.get() {
            Status::Uninitialized | Status::Freed => (),
            _ => {
                warn!("XrBridge dropped without free()");
                if let Err(e) = self.free() {
                    warn!("Release on drop failed: {}", e);
                }
            }
        }
    }
}

fn violation(violation: ContractViolation) -> BridgeError {
    error!("Contract violation: {}", violation);
    violation.into()
}

fn truncate_name(what: &str, name: &str) -> String {
    if name.len() <= MAX_NAME_BYTES {
        return name.to_string();
    }
    let mut end = MAX_NAME_BYTES;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    warn!(
        "{} name is longer than {} bytes and was truncated",
        what, MAX_NAME_BYTES
    );
    name[..end].to_string()
}
