use crate::error::{BridgeError, Result};

/// Extension every OpenGL-backed session needs
pub const KHR_OPENGL_ENABLE: &str = "XR_KHR_opengl_enable";

/// Near and far clipping distances, in meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippingPlanes {
    pub near: f32,
    pub far: f32,
}

impl ClippingPlanes {
    /// Validate and build a pair of clipping planes. Both must be finite and `0 < near < far`.
    pub fn new(near: f32, far: f32) -> Result<Self> {
        let valid = near.is_finite() && far.is_finite() && near > 0.0 && near < far;
        if valid {
            Ok(Self { near, far })
        } else {
            Err(BridgeError::InvalidClippingPlanes { near, far })
        }
    }
}

impl Default for ClippingPlanes {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 65536.0,
        }
    }
}

/// Settings for an `XrBridge`. The application name is given to `init()` instead.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    /// Extensions that must be present, or bootstrap fails
    pub required_extensions: Vec<String>,
    /// API layers that must be present, or bootstrap fails
    pub required_layers: Vec<String>,
    /// Origin used to resolve head and eye poses. LOCAL is the seated origin.
    pub reference_space: xr::ReferenceSpaceType,
    /// OpenGL internal format requested for the eye swapchains
    pub swapchain_format: u32,
    pub clipping: ClippingPlanes,
    /// Refuse to create a session when the OpenGL version is below the runtime's minimum
    pub enforce_graphics_requirements: bool,
    /// Rebuild the reference space when the runtime announces its origin is moving
    pub recreate_space_on_change: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            application_version: 1,
            engine_name: String::new(),
            engine_version: 0,
            required_extensions: vec![KHR_OPENGL_ENABLE.to_string()],
            required_layers: Vec::new(),
            reference_space: xr::ReferenceSpaceType::LOCAL,
            swapchain_format: glow::RGBA16F,
            clipping: ClippingPlanes::default(),
            enforce_graphics_requirements: true,
            recreate_space_on_change: false,
        }
    }
}

impl BridgeConfig {
    /// Default configuration, overridden by any `XRBRIDGE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Default configuration, overridden by whatever `lookup` returns for each `XRBRIDGE_*` key
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let mut config = Self::default();

        if let Some(layers) = lookup("XRBRIDGE_API_LAYERS") {
            config.required_layers.extend(parse_name_list(&layers));
        }

        if let Some(extensions) = lookup("XRBRIDGE_EXTENSIONS") {
            config.required_extensions.extend(parse_name_list(&extensions));
        }

        if let Some(space) = lookup("XRBRIDGE_REFERENCE_SPACE") {
            config.reference_space = parse_reference_space(&space)?;
        }

        let near = lookup("XRBRIDGE_NEAR")
            .map(|v| parse_distance("XRBRIDGE_NEAR", &v))
            .transpose()?
            .unwrap_or(config.clipping.near);
        let far = lookup("XRBRIDGE_FAR")
            .map(|v| parse_distance("XRBRIDGE_FAR", &v))
            .transpose()?
            .unwrap_or(config.clipping.far);
        config.clipping = ClippingPlanes::new(near, far)?;

        Ok(config)
    }
}

fn parse_name_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_reference_space(name: &str) -> Result<xr::ReferenceSpaceType> {
    match name.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(xr::ReferenceSpaceType::LOCAL),
        "stage" => Ok(xr::ReferenceSpaceType::STAGE),
        "view" => Ok(xr::ReferenceSpaceType::VIEW),
        other => Err(BridgeError::InvalidConfig(format!(
            "unknown reference space {:?} (expected local, stage or view)",
            other
        ))),
    }
}

fn parse_distance(key: &str, value: &str) -> Result<f32> {
    value
        .trim()
        .parse::<f32>()
        .map_err(|e| BridgeError::InvalidConfig(format!("{} = {:?}: {}", key, value, e)))
}
