//! Scripted stand-ins for the runtime and the graphics API. Both halves share one `MockState`, so
//! a test can queue events, inject failures and read back the full call log.

use crate::config::KHR_OPENGL_ENABLE;
use crate::graphics::Graphics;
use crate::runtime::{
    AppInfo, FrameState, GraphicsRequirements, ProjectionLayer, RuntimeEvent, RuntimeProperties,
    SwapchainSpec, SystemProperties, View, ViewConfig, XrRuntime,
};
use anyhow::bail;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

pub const OWN_SESSION: u64 = 0x5e55;
pub const FOREIGN_SESSION: u64 = 0xf0e;

/// A projection layer as it reached `end_frame`
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedLayer {
    pub space: u64,
    pub swapchains: Vec<u64>,
    pub extents: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AvailableApiLayers,
    AvailableExtensions,
    CreateInstance {
        app: AppInfo,
        extensions: Vec<String>,
        layers: Vec<String>,
    },
    LoadGraphicsFunctions,
    InstanceProperties,
    ResolveSystem,
    SystemProperties,
    GraphicsRequirements,
    CreateSession,
    BeginSession,
    EndSession,
    RequestExit,
    ViewConfigurationViews,
    SwapchainFormats,
    CreateSwapchain(SwapchainSpec),
    EnumerateSwapchainImages(u64),
    DestroySwapchain(u64),
    CreateReferenceSpace(xr::ReferenceSpaceType),
    DestroySpace(u64),
    WaitFrame,
    BeginFrame,
    LocateViews(u64),
    AcquireImage(u64),
    WaitImage(u64),
    ReleaseImage(u64),
    EndFrame(Option<SubmittedLayer>),
    DestroySession,
    DestroyInstance,
    CreateFramebuffer { color: u32, width: u32, height: u32, samples: u32 },
    DestroyFramebuffer(u32),
    UnbindFramebuffer,
}

pub struct MockState {
    pub calls: Vec<Call>,
    pub events: VecDeque<RuntimeEvent>,
    pub api_layers: Vec<String>,
    pub extensions: Vec<String>,
    pub view_count: usize,
    pub view_config: ViewConfig,
    pub formats: Vec<u32>,
    pub images_per_swapchain: u32,
    pub should_render: bool,
    /// Indices handed out by `acquire_image`; 0 once exhausted
    pub acquire_indices: VecDeque<u32>,
    pub gl_version: xr::Version,
    pub requirements: GraphicsRequirements,
    /// Method name and result code of a call that should fail
    pub fail: Option<(&'static str, xr::sys::Result)>,
    /// Fail the n-th framebuffer creation (0-based)
    pub fail_framebuffer_at: Option<usize>,
    pub(crate) framebuffers_created: usize,
    pub live_swapchains: HashSet<u64>,
    pub live_spaces: HashSet<u64>,
    pub live_framebuffers: usize,
    pub instance_alive: bool,
    pub session_alive: bool,
    pub(crate) next_id: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            events: VecDeque::new(),
            api_layers: vec!["XR_APILAYER_LUNARG_core_validation".to_string()],
            extensions: vec![
                KHR_OPENGL_ENABLE.to_string(),
                "XR_EXT_debug_utils".to_string(),
            ],
            view_count: 2,
            view_config: ViewConfig {
                recommended_width: 1440,
                recommended_height: 1600,
                recommended_sample_count: 1,
            },
            formats: vec![glow::SRGB8_ALPHA8, glow::RGBA16F],
            images_per_swapchain: 3,
            should_render: true,
            acquire_indices: VecDeque::new(),
            gl_version: xr::Version::new(4, 4, 0),
            requirements: GraphicsRequirements {
                min_api_version_supported: xr::Version::new(4, 0, 0),
                max_api_version_supported: xr::Version::new(4, 6, 0),
            },
            fail: None,
            fail_framebuffer_at: None,
            framebuffers_created: 0,
            live_swapchains: HashSet::new(),
            live_spaces: HashSet::new(),
            live_framebuffers: 0,
            instance_alive: false,
            session_alive: false,
            next_id: 1,
        }
    }
}

impl MockState {
    fn record(&mut self, method: &'static str, call: Call) -> xr::Result<()> {
        self.calls.push(call);
        match self.fail {
            Some((failing, result)) if failing == method => Err(result),
            _ => Ok(()),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Positions of calls matching `pred` in the log
    pub fn positions(&self, pred: impl Fn(&Call) -> bool) -> Vec<usize> {
        self.calls
            .iter()
            .enumerate()
            .filter(|(_, call)| pred(call))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    pub fn end_frames(&self) -> Vec<Option<SubmittedLayer>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::EndFrame(layer) => Some(layer.clone()),
                _ => None,
            })
            .collect()
    }
}

pub type Shared = Rc<RefCell<MockState>>;

pub struct MockSwapchain {
    pub id: u64,
}

pub struct MockSpace {
    pub id: u64,
}

pub struct MockRuntime {
    state: Shared,
}

#[derive(Debug)]
pub struct MockFramebuffer {
    pub color: u32,
    pub width: u32,
    pub height: u32,
}

pub struct MockGraphics {
    state: Shared,
}

pub fn mock_with(state: MockState) -> (MockRuntime, MockGraphics, Shared) {
    let state = Rc::new(RefCell::new(state));
    (
        MockRuntime {
            state: state.clone(),
        },
        MockGraphics {
            state: state.clone(),
        },
        state,
    )
}

pub fn session(raw: u64) -> xr::sys::Session {
    xr::sys::Session::from_raw(raw)
}

pub fn state_changed(state: xr::SessionState) -> RuntimeEvent {
    RuntimeEvent::SessionStateChanged {
        session: session(OWN_SESSION),
        state,
        time: xr::Time::from_nanos(0),
    }
}

pub fn foreign_state_changed(state: xr::SessionState) -> RuntimeEvent {
    RuntimeEvent::SessionStateChanged {
        session: session(FOREIGN_SESSION),
        state,
        time: xr::Time::from_nanos(0),
    }
}

impl XrRuntime for MockRuntime {
    type Swapchain = MockSwapchain;
    type Space = MockSpace;

    fn available_api_layers(&mut self) -> xr::Result<Vec<String>> {
        let mut state = self.state.borrow_mut();
        state.record("available_api_layers", Call::AvailableApiLayers)?;
        Ok(state.api_layers.clone())
    }

    fn available_extensions(&mut self) -> xr::Result<Vec<String>> {
        let mut state = self.state.borrow_mut();
        state.record("available_extensions", Call::AvailableExtensions)?;
        Ok(state.extensions.clone())
    }

    fn create_instance(
        &mut self,
        app: &AppInfo,
        extensions: &[String],
        layers: &[String],
    ) -> xr::Result<()> {
        let mut state = self.state.borrow_mut();
        state.record(
            "create_instance",
            Call::CreateInstance {
                app: app.clone(),
                extensions: extensions.to_vec(),
                layers: layers.to_vec(),
            },
        )?;
        state.instance_alive = true;
        Ok(())
    }

    fn load_graphics_functions(&mut self) -> xr::Result<()> {
        self.state
            .borrow_mut()
            .record("load_graphics_functions", Call::LoadGraphicsFunctions)
    }

    fn instance_properties(&mut self) -> xr::Result<RuntimeProperties> {
        self.state
            .borrow_mut()
            .record("instance_properties", Call::InstanceProperties)?;
        Ok(RuntimeProperties {
            runtime_name: "Mock Runtime".to_string(),
            runtime_version: xr::Version::new(1, 0, 0),
        })
    }

    fn resolve_system(&mut self) -> xr::Result<()> {
        self.state
            .borrow_mut()
            .record("resolve_system", Call::ResolveSystem)
    }

    fn system_properties(&mut self) -> xr::Result<SystemProperties> {
        self.state
            .borrow_mut()
            .record("system_properties", Call::SystemProperties)?;
        Ok(SystemProperties {
            system_name: "Mock HMD".to_string(),
            vendor_id: 0x1234,
        })
    }

    fn graphics_requirements(&mut self) -> xr::Result<GraphicsRequirements> {
        let mut state = self.state.borrow_mut();
        state.record("graphics_requirements", Call::GraphicsRequirements)?;
        Ok(state.requirements)
    }

    fn create_session(&mut self) -> xr::Result<()> {
        let mut state = self.state.borrow_mut();
        state.record("create_session", Call::CreateSession)?;
        state.session_alive = true;
        Ok(())
    }

    fn session_handle(&self) -> Option<xr::sys::Session> {
        if self.state.borrow().session_alive {
            Some(session(OWN_SESSION))
        } else {
            None
        }
    }

    fn poll_event(&mut self) -> xr::Result<Option<RuntimeEvent>> {
        Ok(self.state.borrow_mut().events.pop_front())
    }

    fn begin_session(&mut self) -> xr::Result<()> {
        self.state
            .borrow_mut()
            .record("begin_session", Call::BeginSession)
    }

    fn end_session(&mut self) -> xr::Result<()> {
        self.state
            .borrow_mut()
            .record("end_session", Call::EndSession)
    }

    fn request_exit(&mut self) -> xr::Result<()> {
        self.state
            .borrow_mut()
            .record("request_exit", Call::RequestExit)
    }

    fn view_configuration_views(&mut self) -> xr::Result<Vec<ViewConfig>> {
        let mut state = self.state.borrow_mut();
        state.record("view_configuration_views", Call::ViewConfigurationViews)?;
        Ok(vec![state.view_config; state.view_count])
    }

    fn swapchain_formats(&mut self) -> xr::Result<Vec<u32>> {
        let mut state = self.state.borrow_mut();
        state.record("swapchain_formats", Call::SwapchainFormats)?;
        Ok(state.formats.clone())
    }

    fn create_swapchain(&mut self, spec: &SwapchainSpec) -> xr::Result<MockSwapchain> {
        let mut state = self.state.borrow_mut();
        state.record("create_swapchain", Call::CreateSwapchain(*spec))?;
        let id = state.next_id();
        state.live_swapchains.insert(id);
        Ok(MockSwapchain { id })
    }

    fn enumerate_swapchain_images(&mut self, swapchain: &MockSwapchain) -> xr::Result<Vec<u32>> {
        let mut state = self.state.borrow_mut();
        state.record(
            "enumerate_swapchain_images",
            Call::EnumerateSwapchainImages(swapchain.id),
        )?;
        // Texture names unique per swapchain
        let base = swapchain.id as u32 * 100;
        Ok((0..state.images_per_swapchain).map(|i| base + i).collect())
    }

    fn destroy_swapchain(&mut self, swapchain: MockSwapchain) -> xr::Result<()> {
        let mut state = self.state.borrow_mut();
        state.live_swapchains.remove(&swapchain.id);
        state.record("destroy_swapchain", Call::DestroySwapchain(swapchain.id))
    }

    fn create_reference_space(
        &mut self,
        space_type: xr::ReferenceSpaceType,
        _pose: xr::Posef,
    ) -> xr::Result<MockSpace> {
        let mut state = self.state.borrow_mut();
        state.record(
            "create_reference_space",
            Call::CreateReferenceSpace(space_type),
        )?;
        let id = state.next_id();
        state.live_spaces.insert(id);
        Ok(MockSpace { id })
    }

    fn destroy_space(&mut self, space: MockSpace) -> xr::Result<()> {
        let mut state = self.state.borrow_mut();
        state.live_spaces.remove(&space.id);
        state.record("destroy_space", Call::DestroySpace(space.id))
    }

    fn wait_frame(&mut self) -> xr::Result<FrameState> {
        let mut state = self.state.borrow_mut();
        state.record("wait_frame", Call::WaitFrame)?;
        Ok(FrameState {
            predicted_display_time: xr::Time::from_nanos(1_000_000),
            should_render: state.should_render,
        })
    }

    fn begin_frame(&mut self) -> xr::Result<()> {
        self.state
            .borrow_mut()
            .record("begin_frame", Call::BeginFrame)
    }

    fn locate_views(&mut self, space: &MockSpace, _display_time: xr::Time) -> xr::Result<Vec<View>> {
        let mut state = self.state.borrow_mut();
        state.record("locate_views", Call::LocateViews(space.id))?;
        Ok((0..state.view_count)
            .map(|i| View {
                pose: xr::Posef {
                    orientation: xr::Quaternionf {
                        x: 0.0,
                        y: 0.0,
                        z: 0.0,
                        w: 1.0,
                    },
                    position: xr::Vector3f {
                        x: if i == 0 { -0.032 } else { 0.032 },
                        y: 1.6,
                        z: 0.0,
                    },
                },
                fov: xr::Fovf {
                    angle_left: -0.8,
                    angle_right: 0.8,
                    angle_up: 0.8,
                    angle_down: -0.8,
                },
            })
            .collect())
    }

    fn acquire_image(&mut self, swapchain: &mut MockSwapchain) -> xr::Result<u32> {
        let mut state = self.state.borrow_mut();
        state.record("acquire_image", Call::AcquireImage(swapchain.id))?;
        Ok(state.acquire_indices.pop_front().unwrap_or(0))
    }

    fn wait_image(&mut self, swapchain: &mut MockSwapchain, timeout: xr::Duration) -> xr::Result<()> {
        assert_eq!(timeout, xr::Duration::INFINITE);
        self.state
            .borrow_mut()
            .record("wait_image", Call::WaitImage(swapchain.id))
    }

    fn release_image(&mut self, swapchain: &mut MockSwapchain) -> xr::Result<()> {
        self.state
            .borrow_mut()
            .record("release_image", Call::ReleaseImage(swapchain.id))
    }

    fn end_frame(
        &mut self,
        _display_time: xr::Time,
        blend_mode: xr::EnvironmentBlendMode,
        layer: Option<ProjectionLayer<'_, MockSpace, MockSwapchain>>,
    ) -> xr::Result<()> {
        assert_eq!(blend_mode, xr::EnvironmentBlendMode::OPAQUE);
        let layer = layer.map(|layer| SubmittedLayer {
            space: layer.space.id,
            swapchains: layer.views.iter().map(|view| view.swapchain.id).collect(),
            extents: layer
                .views
                .iter()
                .map(|view| (view.width, view.height))
                .collect(),
        });
        self.state
            .borrow_mut()
            .record("end_frame", Call::EndFrame(layer))
    }

    fn destroy_session(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.session_alive {
            state.session_alive = false;
            state.calls.push(Call::DestroySession);
        }
    }

    fn destroy_instance(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.instance_alive {
            state.instance_alive = false;
            state.calls.push(Call::DestroyInstance);
        }
    }
}

impl Graphics for MockGraphics {
    type Framebuffer = MockFramebuffer;

    fn api_version(&self) -> xr::Version {
        self.state.borrow().gl_version
    }

    fn create_framebuffer(
        &self,
        color: u32,
        width: u32,
        height: u32,
        samples: u32,
    ) -> anyhow::Result<MockFramebuffer> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::CreateFramebuffer {
            color,
            width,
            height,
            samples,
        });
        let n = state.framebuffers_created;
        state.framebuffers_created += 1;
        if state.fail_framebuffer_at == Some(n) {
            bail!("Framebuffer incomplete (status 0x8CD6)");
        }
        state.live_framebuffers += 1;
        Ok(MockFramebuffer {
            color,
            width,
            height,
        })
    }

    fn destroy_framebuffer(&self, framebuffer: MockFramebuffer) {
        let mut state = self.state.borrow_mut();
        state.live_framebuffers -= 1;
        state.calls.push(Call::DestroyFramebuffer(framebuffer.color));
    }

    fn unbind_framebuffer(&self) {
        self.state.borrow_mut().calls.push(Call::UnbindFramebuffer);
    }
}
