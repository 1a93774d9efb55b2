use crate::error::BridgeError;
use crate::platform;
use crate::runtime::{
    AppInfo, FrameState, GraphicsRequirements, ProjectionLayer, RuntimeEvent, RuntimeProperties,
    SwapchainSpec, SystemProperties, View, ViewConfig, XrRuntime,
};
use log::{error, info};

const VIEW_TYPE: xr::ViewConfigurationType = xr::ViewConfigurationType::PRIMARY_STEREO;

// The `openxr` crate tracks well-known extensions as flags on `ExtensionSet` and everything else by
// name in `other`; translate both ways.
macro_rules! known_extensions {
    ($($name:literal => $field:ident,)*) => {
        fn extension_names(set: &xr::ExtensionSet) -> Vec<String> {
            let mut names = Vec::new();
            $(
                if set.$field {
                    names.push($name.to_string());
                }
            )*
            names.extend(set.other.iter().cloned());
            names
        }

        fn extension_set(names: &[String]) -> xr::ExtensionSet {
            let mut set = xr::ExtensionSet::default();
            for name in names {
                match name.as_str() {
                    $($name => set.$field = true,)*
                    other => set.other.push(other.to_string()),
                }
            }
            set
        }
    };
}

known_extensions! {
    "XR_KHR_opengl_enable" => khr_opengl_enable,
    "XR_KHR_composition_layer_depth" => khr_composition_layer_depth,
    "XR_KHR_visibility_mask" => khr_visibility_mask,
    "XR_EXT_debug_utils" => ext_debug_utils,
    "XR_EXT_hand_tracking" => ext_hand_tracking,
}

/// `XrRuntime` backed by the system OpenXR loader, rendering through OpenGL
pub struct OpenXrRuntime {
    entry: xr::Entry,
    instance: Option<xr::Instance>,
    system: Option<xr::SystemId>,
    session: Option<xr::Session<xr::OpenGL>>,
    frame_wait: Option<xr::FrameWaiter>,
    frame_stream: Option<xr::FrameStream<xr::OpenGL>>,
    event_storage: xr::EventDataBuffer,
}

impl OpenXrRuntime {
    /// Load the OpenXR loader from its platform-specific location
    pub fn load() -> Result<Self, BridgeError> {
        let entry = unsafe { xr::Entry::load() }
            .map_err(|e| BridgeError::Loader(format!("{:?}", e)))?;
        Ok(Self::from_entry(entry))
    }

    pub fn from_entry(entry: xr::Entry) -> Self {
        Self {
            entry,
            instance: None,
            system: None,
            session: None,
            frame_wait: None,
            frame_stream: None,
            event_storage: xr::EventDataBuffer::new(),
        }
    }

    fn instance(&self) -> xr::Result<&xr::Instance> {
        self.instance
            .as_ref()
            .ok_or(xr::sys::Result::ERROR_HANDLE_INVALID)
    }

    fn system(&self) -> xr::Result<xr::SystemId> {
        self.system.ok_or(xr::sys::Result::ERROR_SYSTEM_INVALID)
    }

    fn session(&self) -> xr::Result<&xr::Session<xr::OpenGL>> {
        self.session
            .as_ref()
            .ok_or(xr::sys::Result::ERROR_HANDLE_INVALID)
    }
}

impl XrRuntime for OpenXrRuntime {
    type Swapchain = xr::Swapchain<xr::OpenGL>;
    type Space = xr::Space;

    fn available_api_layers(&mut self) -> xr::Result<Vec<String>> {
        Ok(self
            .entry
            .enumerate_layers()?
            .into_iter()
            .map(|layer| layer.layer_name)
            .collect())
    }

    fn available_extensions(&mut self) -> xr::Result<Vec<String>> {
        Ok(extension_names(&self.entry.enumerate_extensions()?))
    }

    fn create_instance(
        &mut self,
        app: &AppInfo,
        extensions: &[String],
        layers: &[String],
    ) -> xr::Result<()> {
        let layers = layers.iter().map(String::as_str).collect::<Vec<_>>();
        let instance = self.entry.create_instance(
            &xr::ApplicationInfo {
                application_name: &app.application_name,
                application_version: app.application_version,
                engine_name: &app.engine_name,
                engine_version: app.engine_version,
                api_version: xr::Version::new(1, 0, 0),
            },
            &extension_set(extensions),
            &layers,
        )?;
        self.instance = Some(instance);
        Ok(())
    }

    fn load_graphics_functions(&mut self) -> xr::Result<()> {
        // Extension function tables are loaded with the instance; make sure the OpenGL one made it
        match self.instance()?.exts().khr_opengl_enable {
            Some(_) => Ok(()),
            None => Err(xr::sys::Result::ERROR_FUNCTION_UNSUPPORTED),
        }
    }

    fn instance_properties(&mut self) -> xr::Result<RuntimeProperties> {
        let props = self.instance()?.properties()?;
        Ok(RuntimeProperties {
            runtime_name: props.runtime_name,
            runtime_version: props.runtime_version,
        })
    }

    fn resolve_system(&mut self) -> xr::Result<()> {
        let system = self
            .instance()?
            .system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)?;
        self.system = Some(system);
        Ok(())
    }

    fn system_properties(&mut self) -> xr::Result<SystemProperties> {
        let props = self.instance()?.system_properties(self.system()?)?;
        Ok(SystemProperties {
            system_name: props.system_name,
            vendor_id: props.vendor_id,
        })
    }

    fn graphics_requirements(&mut self) -> xr::Result<GraphicsRequirements> {
        let reqs = self
            .instance()?
            .graphics_requirements::<xr::OpenGL>(self.system()?)?;
        Ok(GraphicsRequirements {
            min_api_version_supported: reqs.min_api_version_supported,
            max_api_version_supported: reqs.max_api_version_supported,
        })
    }

    fn create_session(&mut self) -> xr::Result<()> {
        let system = self.system()?;
        let create_info = platform::current_session_create_info().ok_or_else(|| {
            error!("No native OpenGL context is current on this thread");
            xr::sys::Result::ERROR_GRAPHICS_DEVICE_INVALID
        })?;

        // The handles belong to the context current on this thread; the caller keeps it alive
        // until the bridge is freed.
        let (session, frame_wait, frame_stream) = unsafe {
            self.instance()?
                .create_session::<xr::OpenGL>(system, &create_info)
        }?;

        self.session = Some(session);
        self.frame_wait = Some(frame_wait);
        self.frame_stream = Some(frame_stream);
        Ok(())
    }

    fn session_handle(&self) -> Option<xr::sys::Session> {
        self.session.as_ref().map(|session| session.as_raw())
    }

    fn poll_event(&mut self) -> xr::Result<Option<RuntimeEvent>> {
        let instance = self
            .instance
            .as_ref()
            .ok_or(xr::sys::Result::ERROR_HANDLE_INVALID)?;

        use xr::Event::*;
        let event = instance
            .poll_event(&mut self.event_storage)?
            .map(|event| match event {
                EventsLost(e) => RuntimeEvent::EventsLost {
                    count: e.lost_event_count(),
                },
                InstanceLossPending(e) => RuntimeEvent::InstanceLossPending {
                    loss_time: e.loss_time(),
                },
                ReferenceSpaceChangePending(e) => RuntimeEvent::ReferenceSpaceChangePending {
                    session: e.session(),
                    space_type: e.reference_space_type(),
                },
                SessionStateChanged(e) => RuntimeEvent::SessionStateChanged {
                    session: e.session(),
                    state: e.state(),
                    time: e.time(),
                },
                _ => RuntimeEvent::Other,
            });
        Ok(event)
    }

    fn begin_session(&mut self) -> xr::Result<()> {
        self.session()?.begin(VIEW_TYPE)?;
        Ok(())
    }

    fn end_session(&mut self) -> xr::Result<()> {
        self.session()?.end()?;
        Ok(())
    }

    fn request_exit(&mut self) -> xr::Result<()> {
        self.session()?.request_exit()
    }

    fn view_configuration_views(&mut self) -> xr::Result<Vec<ViewConfig>> {
        let views = self
            .instance()?
            .enumerate_view_configuration_views(self.system()?, VIEW_TYPE)?;
        Ok(views
            .into_iter()
            .map(|view| ViewConfig {
                recommended_width: view.recommended_image_rect_width,
                recommended_height: view.recommended_image_rect_height,
                recommended_sample_count: view.recommended_swapchain_sample_count,
            })
            .collect())
    }

    fn swapchain_formats(&mut self) -> xr::Result<Vec<u32>> {
        self.session()?.enumerate_swapchain_formats()
    }

    fn create_swapchain(&mut self, spec: &SwapchainSpec) -> xr::Result<Self::Swapchain> {
        self.session()?.create_swapchain(&xr::SwapchainCreateInfo {
            create_flags: xr::SwapchainCreateFlags::EMPTY,
            usage_flags: xr::SwapchainUsageFlags::COLOR_ATTACHMENT
                | xr::SwapchainUsageFlags::SAMPLED,
            format: spec.format,
            sample_count: spec.sample_count,
            width: spec.width,
            height: spec.height,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
        })
    }

    fn enumerate_swapchain_images(&mut self, swapchain: &Self::Swapchain) -> xr::Result<Vec<u32>> {
        swapchain.enumerate_images()
    }

    fn destroy_swapchain(&mut self, swapchain: Self::Swapchain) -> xr::Result<()> {
        drop(swapchain);
        Ok(())
    }

    fn create_reference_space(
        &mut self,
        space_type: xr::ReferenceSpaceType,
        pose: xr::Posef,
    ) -> xr::Result<Self::Space> {
        self.session()?.create_reference_space(space_type, pose)
    }

    fn destroy_space(&mut self, space: Self::Space) -> xr::Result<()> {
        drop(space);
        Ok(())
    }

    fn wait_frame(&mut self) -> xr::Result<FrameState> {
        let frame_wait = self
            .frame_wait
            .as_mut()
            .ok_or(xr::sys::Result::ERROR_HANDLE_INVALID)?;
        let state = frame_wait.wait()?;
        Ok(FrameState {
            predicted_display_time: state.predicted_display_time,
            should_render: state.should_render,
        })
    }

    fn begin_frame(&mut self) -> xr::Result<()> {
        self.frame_stream
            .as_mut()
            .ok_or(xr::sys::Result::ERROR_HANDLE_INVALID)?
            .begin()
    }

    fn locate_views(
        &mut self,
        space: &Self::Space,
        display_time: xr::Time,
    ) -> xr::Result<Vec<View>> {
        let (_, views) = self
            .session()?
            .locate_views(VIEW_TYPE, display_time, space)?;
        Ok(views
            .into_iter()
            .map(|view| View {
                pose: view.pose,
                fov: view.fov,
            })
            .collect())
    }

    fn acquire_image(&mut self, swapchain: &mut Self::Swapchain) -> xr::Result<u32> {
        swapchain.acquire_image()
    }

    fn wait_image(
        &mut self,
        swapchain: &mut Self::Swapchain,
        timeout: xr::Duration,
    ) -> xr::Result<()> {
        swapchain.wait_image(timeout)
    }

    fn release_image(&mut self, swapchain: &mut Self::Swapchain) -> xr::Result<()> {
        swapchain.release_image()
    }

    fn end_frame(
        &mut self,
        display_time: xr::Time,
        blend_mode: xr::EnvironmentBlendMode,
        layer: Option<ProjectionLayer<'_, Self::Space, Self::Swapchain>>,
    ) -> xr::Result<()> {
        let frame_stream = self
            .frame_stream
            .as_mut()
            .ok_or(xr::sys::Result::ERROR_HANDLE_INVALID)?;

        let layer = match layer {
            Some(layer) => layer,
            None => return frame_stream.end(display_time, blend_mode, &[]),
        };

        let views = layer
            .views
            .iter()
            .map(|view| {
                let rect = xr::Rect2Di {
                    offset: xr::Offset2Di { x: 0, y: 0 },
                    extent: xr::Extent2Di {
                        width: view.width as _,
                        height: view.height as _,
                    },
                };
                xr::CompositionLayerProjectionView::new()
                    .pose(view.pose)
                    .fov(view.fov)
                    .sub_image(
                        xr::SwapchainSubImage::new()
                            .swapchain(view.swapchain)
                            .image_array_index(0)
                            .image_rect(rect),
                    )
            })
            .collect::<Vec<_>>();

        frame_stream.end(
            display_time,
            blend_mode,
            &[&xr::CompositionLayerProjection::new()
                .space(layer.space)
                .views(&views)],
        )
    }

    fn destroy_session(&mut self) {
        if self.session.is_some() {
            info!("Destroying OpenXR session");
        }
        self.frame_stream = None;
        self.frame_wait = None;
        self.session = None;
    }

    fn destroy_instance(&mut self) {
        if self.instance.is_some() {
            info!("Destroying OpenXR instance");
        }
        self.system = None;
        self.instance = None;
    }
}
