use crate::error::{BridgeError, Result};
use log::{debug, error};
use std::fmt;

/// What sort of runtime capability is being asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    ApiLayer,
    Extension,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CapabilityKind::ApiLayer => write!(f, "API layer"),
            CapabilityKind::Extension => write!(f, "extension"),
        }
    }
}

/// Whether `name` appears verbatim in the runtime's advertised list
pub fn is_supported(available: &[String], name: &str) -> bool {
    available.iter().any(|candidate| candidate == name)
}

/// Check every requested name against what the runtime advertises. Returns the list to enable, in
/// request order, or the first name that is missing.
pub fn resolve(
    kind: CapabilityKind,
    requested: &[String],
    available: &[String],
) -> Result<Vec<String>> {
    let mut enabled = Vec::with_capacity(requested.len());
    for name in requested {
        if !is_supported(available, name) {
            error!("{} {:?} is not available", kind, name);
            return Err(BridgeError::CapabilityUnavailable {
                kind,
                name: name.clone(),
            });
        }
        if !enabled.contains(name) {
            debug!("Enabling {} {}", kind, name);
            enabled.push(name.clone());
        }
    }
    Ok(enabled)
}
